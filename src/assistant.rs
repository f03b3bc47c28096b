//! Remote assistant endpoint client
//!
//! The endpoint takes `{"input": "<text>"}` and answers with a JSON object
//! carrying the reply in `responseText`.

use std::time::Duration;

use serde::Serialize;

use crate::config::AssistantConfig;
use crate::{Error, Result};

/// Reply used when the endpoint answers without a usable `responseText`
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't understand the response.";

#[derive(Serialize)]
struct AskRequest<'a> {
    input: &'a str,
}

/// Client for the assistant endpoint
#[derive(Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AssistantClient {
    /// Create a client posting to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::Config("assistant endpoint must not be empty".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.timeout)
    }

    /// Endpoint this client posts to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send user input and return the assistant's reply
    ///
    /// The body is read regardless of status code, since the endpoint reports
    /// its own errors through `responseText`. A missing, empty, or non-string
    /// `responseText` yields [`FALLBACK_REPLY`].
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not JSON
    pub async fn ask(&self, input: &str) -> Result<String> {
        tracing::debug!(endpoint = %self.endpoint, input_len = input.len(), "sending input");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { input })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "assistant endpoint returned error status");
        }

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;

        let reply = reply_text(&value).map_or_else(
            || {
                tracing::warn!("response has no responseText, using fallback");
                FALLBACK_REPLY.to_string()
            },
            ToString::to_string,
        );

        tracing::debug!(reply_len = reply.len(), "assistant replied");
        Ok(reply)
    }
}

/// Extract a non-empty `responseText` string
fn reply_text(value: &serde_json::Value) -> Option<&str> {
    value
        .get("responseText")
        .and_then(serde_json::Value::as_str)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_response_text() {
        assert_eq!(reply_text(&json!({"responseText": "hi"})), Some("hi"));
    }

    #[test]
    fn missing_or_wrong_type_has_no_reply() {
        assert_eq!(reply_text(&json!({"text": "hi"})), None);
        assert_eq!(reply_text(&json!({"responseText": 42})), None);
        assert_eq!(reply_text(&json!({"responseText": ""})), None);
        assert_eq!(reply_text(&json!(["responseText"])), None);
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(AskRequest { input: "hello" }).unwrap();
        assert_eq!(body, json!({"input": "hello"}));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(AssistantClient::new("  ", Duration::from_secs(1)).is_err());
    }
}
