//! Talkback - voice-enabled chat client for a remote assistant
//!
//! - Sends typed or spoken input to an assistant endpoint
//! - Renders the conversation in the terminal
//! - Speaks replies aloud, chunked and strictly in order
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Conversation                  │
//! │   keyboard  │  recognition  │  chat view      │
//! └───────┬───────────────────────────┬──────────┘
//!         │ POST {"input"}            │ reply text
//! ┌───────▼──────────┐      ┌─────────▼──────────┐
//! │ Assistant client │      │   Speaker task      │
//! └──────────────────┘      │ queue → chunks →    │
//!                           │ driver (one chunk)  │
//!                           └────────────────────┘
//! ```

pub mod assistant;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod speech;
pub mod voice;

pub use assistant::{AssistantClient, FALLBACK_REPLY};
pub use chat::{ChatExit, run_chat};
pub use config::Config;
pub use conversation::{ChatView, Conversation, Message, Role, TerminalView};
pub use error::{Error, Result};
pub use speech::{PlaybackQueue, Speaker, SpeakerHandle, SpeechDriver, Voice, VoiceSelector};
pub use voice::{SpeechRecognizer, WhisperRecognizer};
