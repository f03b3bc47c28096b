//! Speech-to-text (STT) via the `OpenAI` transcription API

use crate::{Error, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV audio to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl SpeechToText {
    /// Create a new Whisper transcriber
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            url: TRANSCRIPTION_URL.to_string(),
        })
    }

    /// Point the transcriber at a different endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Transcribe WAV audio, hinting the spoken language
    ///
    /// `language` is a locale such as "en-US"; only the primary subtag is
    /// sent, which is what the API accepts.
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), language, "starting Whisper transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(primary) = primary_language(language) {
            form = form.text("language", primary.to_string());
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::debug!(transcript_len = result.text.len(), "transcription complete");
        Ok(result.text)
    }
}

/// Primary language subtag of a locale ("en-US" -> "en")
fn primary_language(locale: &str) -> Option<&str> {
    locale
        .split(['-', '_'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
