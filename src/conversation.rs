//! Conversation flow
//!
//! Takes user input (typed or transcribed), shows both sides of the
//! exchange, and hands replies to the speaker.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::assistant::AssistantClient;
use crate::speech::SpeakerHandle;
use crate::voice::SpeechRecognizer;
use crate::{Error, Result};

/// Placeholder shown while waiting for the assistant
pub const THINKING: &str = "Thinking...";

/// Shown when a recognition session starts
pub const LISTENING: &str = "Listening...";

/// Shown when the assistant endpoint cannot be reached
pub const UNREACHABLE: &str = "Error: Could not reach the server.";

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The person at the keyboard or microphone
    User,
    /// The remote assistant (and local status messages)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One rendered chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    /// Create a message
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Renders chat messages
pub trait ChatView: Send + Sync {
    /// Append a message to the view
    fn show(&self, message: &Message);
}

/// Prints messages to stdout, one per line, prefixed by role
#[derive(Debug, Default)]
pub struct TerminalView;

impl ChatView for TerminalView {
    fn show(&self, message: &Message) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}> {}", message.role, message.text);
        let _ = stdout.flush();
    }
}

/// One chat session with the assistant
pub struct Conversation {
    client: AssistantClient,
    view: Arc<dyn ChatView>,
    speaker: Option<SpeakerHandle>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

impl Conversation {
    /// Create a conversation rendering into `view`
    pub fn new(client: AssistantClient, view: Arc<dyn ChatView>) -> Self {
        Self {
            client,
            view,
            speaker: None,
            recognizer: None,
        }
    }

    /// Speak replies through `speaker`
    #[must_use]
    pub fn with_speaker(mut self, speaker: SpeakerHandle) -> Self {
        self.speaker = Some(speaker);
        self
    }

    /// Accept spoken input through `recognizer`
    #[must_use]
    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Speaker handle, if speech output is enabled
    #[must_use]
    pub const fn speaker(&self) -> Option<&SpeakerHandle> {
        self.speaker.as_ref()
    }

    /// Send user input to the assistant and show (and speak) the reply
    ///
    /// Input is trimmed; blank input is ignored. Failures are shown in the
    /// chat and never abort the session. Returns the reply when one arrived.
    pub async fn submit(&self, text: &str) -> Option<String> {
        let input = text.trim();
        if input.is_empty() {
            return None;
        }

        self.show(Role::User, input);
        self.show(Role::Assistant, THINKING);

        match self.client.ask(input).await {
            Ok(reply) => {
                self.show(Role::Assistant, &reply);
                self.speak(&reply);
                Some(reply)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    endpoint = self.client.endpoint(),
                    "assistant request failed"
                );
                self.show(Role::Assistant, UNREACHABLE);
                None
            }
        }
    }

    /// Run one recognition session and submit the transcript
    ///
    /// Recognition errors are shown in the chat and end the session.
    pub async fn listen(&self) -> Option<String> {
        self.show(Role::Assistant, LISTENING);

        let result = match &self.recognizer {
            Some(recognizer) => recognizer.recognize().await,
            None => Err(Error::Recognition("speech recognition unavailable".to_string())),
        };

        match result {
            Ok(transcript) => self.submit(&transcript).await,
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition failed");
                let notice = format!(
                    "Speech recognition error: {e}. Please check your microphone settings."
                );
                self.show(Role::Assistant, &notice);
                None
            }
        }
    }

    /// Discard queued speech without cutting off the current chunk
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub fn clear_speech(&self) -> Result<()> {
        self.speaker.as_ref().map_or(Ok(()), SpeakerHandle::clear)
    }

    /// Show a local status line on the assistant side of the chat
    pub fn notice(&self, text: &str) {
        self.show(Role::Assistant, text);
    }

    fn speak(&self, reply: &str) {
        if let Some(speaker) = &self.speaker {
            if let Err(e) = speaker.speak(reply) {
                tracing::warn!(error = %e, "failed to queue reply for speech");
            }
        }
    }

    fn show(&self, role: Role, text: &str) {
        self.view.show(&Message::new(role, text));
    }
}
