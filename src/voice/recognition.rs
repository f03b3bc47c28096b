//! Speech recognition
//!
//! One recognition session listens for a single utterance and yields its
//! best transcript.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::segment::{SegmentDetector, SegmentState};
use super::stt::SpeechToText;
use crate::config::Config;
use crate::{Error, Result};

/// How often the capture buffer is drained into the segment detector
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Turns one spoken utterance into text
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for one utterance and return its transcript
    async fn recognize(&self) -> Result<String>;
}

/// Records from the microphone and transcribes with Whisper
pub struct WhisperRecognizer {
    stt: SpeechToText,
    language: String,
    max_listen: Duration,
}

impl WhisperRecognizer {
    /// Create a recognizer for `language` (e.g. "en-US")
    #[must_use]
    pub fn new(stt: SpeechToText, language: impl Into<String>, max_listen: Duration) -> Self {
        Self {
            stt,
            language: language.into(),
            max_listen,
        }
    }

    /// Build a recognizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` API key is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_keys.openai.clone().ok_or_else(|| {
            Error::Config("OPENAI_API_KEY required for speech recognition".to_string())
        })?;
        let stt = SpeechToText::new(api_key, config.recognition.stt_model.clone())?;
        Ok(Self::new(
            stt,
            &config.recognition.language,
            config.recognition.max_listen,
        ))
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    async fn recognize(&self) -> Result<String> {
        let max_listen = self.max_listen;
        let abandon = AbandonOnDrop::default();
        let abandoned = Arc::clone(&abandon.0);
        let samples =
            tokio::task::spawn_blocking(move || record_utterance(max_listen, &abandoned))
                .await
                .map_err(|e| Error::Audio(format!("capture task failed: {e}")))??;

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let transcript = self.stt.transcribe(&wav, &self.language).await?;
        let transcript = transcript.trim();

        if transcript.is_empty() {
            return Err(Error::Recognition("no-speech".to_string()));
        }
        Ok(transcript.to_string())
    }
}

/// Tells the capture thread to give up when the session future is dropped
#[derive(Default)]
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Capture from the default microphone until one utterance is complete
///
/// Runs on a blocking thread because the capture stream is not `Send`.
fn record_utterance(max_listen: Duration, abandoned: &AtomicBool) -> Result<Vec<f32>> {
    let mut capture = AudioCapture::new()?;
    let mut detector = SegmentDetector::new();
    capture.start()?;

    let started = Instant::now();
    let outcome = loop {
        std::thread::sleep(POLL_INTERVAL);

        if abandoned.load(Ordering::Relaxed) {
            tracing::debug!("recognition session abandoned");
            break Err(Error::Recognition("aborted".to_string()));
        }

        if detector.process(&capture.take_buffer()) == SegmentState::Complete {
            break Ok(detector.take_buffer());
        }

        if started.elapsed() >= max_listen {
            // Whatever was said so far is still worth transcribing
            break if detector.heard_speech() {
                Ok(detector.take_buffer())
            } else {
                Err(Error::Recognition("no-speech".to_string()))
            };
        }
    };

    capture.stop();
    outcome
}
