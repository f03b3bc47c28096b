//! Configuration management for talkback
//!
//! Precedence: CLI flags > environment > `config.toml` > defaults. CLI flags
//! are applied by the binary on top of the [`Config`] built here.

pub mod file;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::speech::{DEFAULT_MAX_CHUNK_LEN, DEFAULT_PREFERRED_LANG, DEFAULT_PREFERRED_VOICE};
use crate::{Error, Result};

use self::file::TalkbackConfigFile;

/// Default assistant endpoint
pub const DEFAULT_ENDPOINT: &str = "https://adhd-assistant.onrender.com";

/// Default system speech command
pub const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng";

/// Talkback configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote assistant endpoint
    pub assistant: AssistantConfig,

    /// Speech output
    pub speech: SpeechConfig,

    /// Speech recognition
    pub recognition: RecognitionConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Remote assistant endpoint configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// URL receiving `{"input": ...}` POSTs
    pub endpoint: String,

    /// Request timeout
    pub timeout: Duration,
}

/// Which speech driver speaks the replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverKind {
    /// Local speech command (espeak-ng compatible)
    #[default]
    System,
    /// `OpenAI` speech API played through the default output device
    OpenAi,
    /// Discards all speech
    Silent,
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" | "espeak" | "espeak-ng" => Ok(Self::System),
            "openai" => Ok(Self::OpenAi),
            "silent" | "none" => Ok(Self::Silent),
            other => Err(Error::Config(format!("unknown speech driver: {other}"))),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::OpenAi => "openai",
            Self::Silent => "silent",
        })
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speak replies aloud
    pub enabled: bool,

    /// Driver backend
    pub driver: DriverKind,

    /// Command used by the system driver
    pub command: String,

    /// Maximum characters per spoken chunk
    pub max_chunk_len: usize,

    /// Voice name preferred above all others
    pub preferred_voice: String,

    /// Language prefix used when the preferred voice is missing
    pub preferred_lang: String,

    /// Delay before re-querying an empty voice list
    pub voice_retry: Duration,

    /// TTS model for the `OpenAI` driver
    pub tts_model: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            driver: DriverKind::default(),
            command: DEFAULT_SPEECH_COMMAND.to_string(),
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            preferred_voice: DEFAULT_PREFERRED_VOICE.to_string(),
            preferred_lang: DEFAULT_PREFERRED_LANG.to_string(),
            voice_retry: Duration::from_millis(1000),
            tts_model: "tts-1".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Recognition locale
    pub language: String,

    /// STT model
    pub stt_model: String,

    /// Longest listening session
    pub max_listen: Duration,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            stt_model: "whisper-1".to_string(),
            max_listen: Duration::from_secs(15),
        }
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is invalid
    pub fn resolve<F>(fc: TalkbackConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let speech_defaults = SpeechConfig::default();
        let recognition_defaults = RecognitionConfig::default();

        // Assistant (env > toml > default)
        let assistant = AssistantConfig {
            endpoint: env("TALKBACK_ENDPOINT")
                .or(fc.assistant.endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: Duration::from_secs(
                env("TALKBACK_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.assistant.timeout_secs)
                    .unwrap_or(60),
            ),
        };

        let driver = match env("TALKBACK_SPEECH_DRIVER").or(fc.speech.driver) {
            Some(s) => s.parse()?,
            None => speech_defaults.driver,
        };

        let speech_disabled = env("TALKBACK_DISABLE_SPEECH")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let speech = SpeechConfig {
            enabled: !speech_disabled && fc.speech.enabled.unwrap_or(true),
            driver,
            command: fc.speech.command.unwrap_or(speech_defaults.command),
            max_chunk_len: fc.speech.max_chunk_len.unwrap_or(speech_defaults.max_chunk_len),
            preferred_voice: env("TALKBACK_VOICE")
                .or(fc.speech.preferred_voice)
                .unwrap_or(speech_defaults.preferred_voice),
            preferred_lang: fc.speech.preferred_lang.unwrap_or(speech_defaults.preferred_lang),
            voice_retry: fc
                .speech
                .voice_retry_ms
                .map_or(speech_defaults.voice_retry, Duration::from_millis),
            tts_model: fc.speech.tts_model.unwrap_or(speech_defaults.tts_model),
            tts_speed: fc.speech.tts_speed.unwrap_or(speech_defaults.tts_speed),
        };

        let recognition = RecognitionConfig {
            language: fc
                .recognition
                .language
                .unwrap_or(recognition_defaults.language),
            stt_model: fc
                .recognition
                .stt_model
                .unwrap_or(recognition_defaults.stt_model),
            max_listen: fc
                .recognition
                .max_listen_secs
                .map_or(recognition_defaults.max_listen, Duration::from_secs),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
        };

        let config = Self {
            assistant,
            speech,
            recognition,
            api_keys,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the client unusable
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.assistant.endpoint.trim().is_empty() {
            return Err(Error::Config("assistant endpoint must not be empty".to_string()));
        }
        if self.speech.max_chunk_len == 0 {
            return Err(Error::Config("speech.max_chunk_len must be positive".to_string()));
        }
        if !(0.25..=4.0).contains(&self.speech.tts_speed) {
            return Err(Error::Config(format!(
                "speech.tts_speed must be between 0.25 and 4.0, got {}",
                self.speech.tts_speed
            )));
        }
        Ok(())
    }
}
