//! Cloud text-to-speech driver
//!
//! Synthesizes each chunk with the `OpenAI` speech API and plays the returned
//! MP3 through the default output device.

use async_trait::async_trait;

use super::driver::{PlaybackGate, SpeechDriver, is_cancelled};
use super::voices::Voice;
use crate::voice::AudioPlayback;
use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Voices offered by the `OpenAI` speech API
const OPENAI_VOICES: &[&str] = &[
    "alloy", "ash", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer",
];

/// Speaks through the `OpenAI` speech API
pub struct OpenAiDriver {
    client: reqwest::Client,
    api_key: String,
    model: String,
    speed: f32,
    url: String,
    gate: PlaybackGate,
}

impl OpenAiDriver {
    /// Create a new `OpenAI` speech driver
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            speed,
            url: SPEECH_URL.to_string(),
            gate: PlaybackGate::new(),
        })
    }

    /// Point the driver at a different speech endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechDriver for OpenAiDriver {
    fn name(&self) -> &str {
        "openai"
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(OPENAI_VOICES.iter().map(|name| Voice::new(*name, "en")).collect())
    }

    async fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<()> {
        let cancelled = self.gate.watch();
        let voice = voice.map_or(OPENAI_VOICES[0], |v| v.name.as_str());
        let audio = self.synthesize(text, voice).await?;

        // Synthesis may overlap; playback may not
        let playing = self.gate.enter().await;
        if is_cancelled(&cancelled) {
            tracing::debug!("chunk cancelled before playback");
            return Ok(());
        }

        // The gate stays held until the blocking thread is done with the device
        tokio::task::spawn_blocking(move || {
            let result = AudioPlayback::new()
                .and_then(|playback| playback.play_mp3(&audio, || is_cancelled(&cancelled)));
            drop(playing);
            result
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }

    async fn cancel(&self) -> Result<()> {
        self.gate.cancel();
        Ok(())
    }
}
