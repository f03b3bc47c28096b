//! TOML configuration file loading
//!
//! Supports `~/.config/talkback/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TalkbackConfigFile {
    /// Remote assistant endpoint
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Speech output
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Speech recognition
    #[serde(default)]
    pub recognition: RecognitionFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Assistant endpoint configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantFileConfig {
    /// URL receiving `{"input": ...}` POSTs
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechFileConfig {
    /// Speak replies aloud
    pub enabled: Option<bool>,

    /// Driver backend ("system", "openai", "silent")
    pub driver: Option<String>,

    /// Command used by the system driver (e.g. "espeak-ng")
    pub command: Option<String>,

    /// Maximum characters per spoken chunk
    pub max_chunk_len: Option<usize>,

    /// Voice name preferred above all others
    pub preferred_voice: Option<String>,

    /// Language prefix used when the preferred voice is missing
    pub preferred_lang: Option<String>,

    /// Delay before re-querying an empty voice list, in milliseconds
    pub voice_retry_ms: Option<u64>,

    /// TTS model for the `OpenAI` driver (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS speed multiplier for the `OpenAI` driver
    pub tts_speed: Option<f32>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecognitionFileConfig {
    /// Recognition locale (e.g. "en-US")
    pub language: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Longest listening session in seconds
    pub max_listen_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TalkbackConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> TalkbackConfigFile {
    config_file_path().map_or_else(TalkbackConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or invalid files fall back to defaults with a warning.
pub fn load_config_from(path: &Path) -> TalkbackConfigFile {
    if !path.exists() {
        return TalkbackConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TalkbackConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TalkbackConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/talkback/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("talkback").join("config.toml"))
}
