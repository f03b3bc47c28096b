//! Speech output
//!
//! Replies are queued as utterances, split into word-aligned chunks, and
//! spoken one chunk at a time through a [`SpeechDriver`].

mod chunking;
mod driver;
mod queue;
mod speaker;
mod synth;
mod voices;

use std::sync::Arc;

pub use chunking::{DEFAULT_MAX_CHUNK_LEN, split_into_chunks};
pub use driver::{SilentDriver, SpeechDriver, SystemDriver, parse_voice_list};
pub use queue::{Dispatch, PlaybackQueue, PlaybackState, Ticket};
pub use speaker::{Speaker, SpeakerHandle};
pub use synth::OpenAiDriver;
pub use voices::{DEFAULT_PREFERRED_LANG, DEFAULT_PREFERRED_VOICE, Voice, VoiceSelector};

use crate::config::{Config, DriverKind};
use crate::{Error, Result};

/// Build the speech driver selected in the configuration
///
/// # Errors
///
/// Returns error if the driver needs credentials that are missing
pub fn driver_from_config(config: &Config) -> Result<Arc<dyn SpeechDriver>> {
    let speech = &config.speech;
    Ok(match speech.driver {
        DriverKind::System => Arc::new(SystemDriver::new(&speech.command)),
        DriverKind::OpenAi => {
            let api_key = config.api_keys.openai.clone().ok_or_else(|| {
                Error::Config("OPENAI_API_KEY required for the openai speech driver".to_string())
            })?;
            Arc::new(OpenAiDriver::new(
                api_key,
                speech.tts_model.clone(),
                speech.tts_speed,
            )?)
        }
        DriverKind::Silent => Arc::new(SilentDriver),
    })
}
