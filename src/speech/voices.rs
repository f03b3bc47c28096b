//! Voice descriptors and automatic voice selection

use std::fmt;

use serde::{Deserialize, Serialize};

/// Voice name preferred above all others when present
pub const DEFAULT_PREFERRED_VOICE: &str = "Google US English";

/// Language prefix used when the preferred voice is missing
pub const DEFAULT_PREFERRED_LANG: &str = "en";

/// A synthetic speech persona offered by a speech driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Display name, also used by the driver to address the voice
    pub name: String,

    /// BCP 47 language tag (e.g. "en-GB")
    pub lang: String,
}

impl Voice {
    /// Create a voice descriptor
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.lang)
    }
}

/// Picks a voice from whatever the driver reports
///
/// Priority: exact name match, then first voice whose language tag starts
/// with the preferred prefix, then the first voice of any kind.
#[derive(Debug, Clone)]
pub struct VoiceSelector {
    preferred_name: String,
    preferred_lang: String,
}

impl Default for VoiceSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PREFERRED_VOICE, DEFAULT_PREFERRED_LANG)
    }
}

impl VoiceSelector {
    /// Create a selector with a preferred voice name and language prefix
    pub fn new(preferred_name: impl Into<String>, preferred_lang: impl Into<String>) -> Self {
        Self {
            preferred_name: preferred_name.into(),
            preferred_lang: preferred_lang.into(),
        }
    }

    /// Select the best voice, or `None` when the list is empty
    #[must_use]
    pub fn select<'a>(&self, voices: &'a [Voice]) -> Option<&'a Voice> {
        voices
            .iter()
            .find(|v| v.name == self.preferred_name)
            .or_else(|| {
                voices
                    .iter()
                    .find(|v| v.lang.starts_with(&self.preferred_lang))
            })
            .or_else(|| voices.first())
    }
}
