//! Playback queue state machine
//!
//! Holds pending utterances and hands their chunks to the speech driver one
//! at a time. The queue never touches audio itself: every transition returns
//! the next [`Dispatch`] (if any) and the caller is responsible for playing it
//! and reporting completion with [`PlaybackQueue::complete`].

use std::collections::VecDeque;

use super::chunking::split_into_chunks;
use super::voices::Voice;

/// Identifies one dispatched chunk so late completions can be recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// A chunk ready to be handed to the speech driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Ticket to report back on completion
    pub ticket: Ticket,

    /// Chunk text
    pub text: String,

    /// Voice selected at dispatch time (`None` = driver default)
    pub voice: Option<Voice>,
}

/// State of the playback queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No chunk is outstanding
    Idle,
    /// A chunk has been dispatched and has not completed yet
    Speaking(Ticket),
}

/// FIFO of utterances, played one chunk at a time
#[derive(Debug)]
pub struct PlaybackQueue {
    pending: VecDeque<String>,
    /// Chunks of the active utterance not yet dispatched
    remaining: VecDeque<String>,
    state: PlaybackState,
    voice: Option<Voice>,
    max_chunk_len: usize,
    next_ticket: u64,
}

impl PlaybackQueue {
    /// Create an empty queue splitting utterances at `max_chunk_len` characters
    #[must_use]
    pub const fn new(max_chunk_len: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            remaining: VecDeque::new(),
            state: PlaybackState::Idle,
            voice: None,
            max_chunk_len,
            next_ticket: 0,
        }
    }

    /// Append an utterance and advance
    ///
    /// Returns the chunk to play now, or `None` if something is already
    /// playing (the utterance waits its turn).
    pub fn enqueue(&mut self, text: impl Into<String>) -> Option<Dispatch> {
        let text = text.into();
        tracing::trace!(text_len = text.len(), pending = self.pending.len(), "utterance queued");
        self.pending.push_back(text);
        self.advance()
    }

    /// Dispatch the next chunk if nothing is outstanding
    ///
    /// Remaining chunks of the active utterance go first; after that the next
    /// pending utterance is split. Utterances with no words are skipped.
    pub fn advance(&mut self) -> Option<Dispatch> {
        if self.is_speaking() {
            return None;
        }

        while self.remaining.is_empty() {
            let text = self.pending.pop_front()?;
            self.remaining = split_into_chunks(&text, self.max_chunk_len).into();
            tracing::debug!(chunks = self.remaining.len(), "utterance split");
        }

        let text = self.remaining.pop_front()?;
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.state = PlaybackState::Speaking(ticket);

        Some(Dispatch {
            ticket,
            text,
            voice: self.voice.clone(),
        })
    }

    /// Record that a dispatched chunk finished (normally or with an error)
    ///
    /// A ticket that does not match the outstanding chunk is ignored, so audio
    /// dispatched before a [`clear`](Self::clear) cannot advance the queue.
    pub fn complete(&mut self, ticket: Ticket) -> Option<Dispatch> {
        if self.state != PlaybackState::Speaking(ticket) {
            tracing::debug!(?ticket, "ignoring stale completion");
            return None;
        }

        self.state = PlaybackState::Idle;
        self.advance()
    }

    /// Drop all pending utterances and return to idle
    ///
    /// Audio already handed to the driver keeps playing.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.remaining.clear();
        self.state = PlaybackState::Idle;
    }

    /// Change the voice used for chunks dispatched from now on
    pub fn set_voice(&mut self, voice: Option<Voice>) {
        self.voice = voice;
    }

    /// Currently selected voice
    #[must_use]
    pub const fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether a chunk is outstanding
    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        matches!(self.state, PlaybackState::Speaking(_))
    }

    /// Number of utterances waiting behind the active one
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is playing and nothing is left to play
    #[must_use]
    pub fn is_drained(&self) -> bool {
        !self.is_speaking() && self.pending.is_empty() && self.remaining.is_empty()
    }
}
