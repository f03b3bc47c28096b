//! Error types for talkback

use thiserror::Error;

/// Result type alias for talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in talkback
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Speech recognition session error (no speech, timeout)
    #[error("{0}")]
    Recognition(String),

    /// Assistant endpoint error
    #[error("assistant error: {0}")]
    Assistant(String),

    /// Speaker task is no longer running
    #[error("speaker stopped")]
    SpeakerStopped,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
