//! Speaker task
//!
//! Owns the [`PlaybackQueue`] and the speech driver. All queue transitions
//! happen inside a single tokio task that handles one event at a time:
//! commands from [`SpeakerHandle`]s and completion reports from the chunk
//! currently being spoken.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use super::driver::SpeechDriver;
use super::queue::{Dispatch, PlaybackQueue, Ticket};
use super::voices::{Voice, VoiceSelector};
use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Requests sent from handles to the speaker task
enum Command {
    Speak(String),
    Clear,
    Stop(oneshot::Sender<()>),
    SetVoice(Option<Voice>),
    RefreshVoices,
    Voices(oneshot::Sender<Vec<Voice>>),
    SelectedVoice(oneshot::Sender<Option<Voice>>),
    WaitDrained(oneshot::Sender<()>),
}

/// Completion report for one dispatched chunk
struct Finished {
    ticket: Ticket,
    result: Result<()>,
}

/// Cloneable handle for queueing speech
///
/// Dropping every handle stops the speaker task.
#[derive(Clone)]
pub struct SpeakerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SpeakerHandle {
    /// Queue text to be spoken after everything already queued
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub fn speak(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::Speak(text.into()))
    }

    /// Discard queued speech; audio already playing finishes
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    /// Discard queued speech and cut off audio already playing
    ///
    /// Resolves once the speaker task has cleared the queue and told the
    /// driver to cancel.
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stop(tx))?;
        rx.await.map_err(|_| Error::SpeakerStopped)
    }

    /// Override the selected voice for chunks dispatched from now on
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub fn set_voice(&self, voice: Option<Voice>) -> Result<()> {
        self.send(Command::SetVoice(voice))
    }

    /// Re-query the driver's voices and re-run automatic selection
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub fn refresh_voices(&self) -> Result<()> {
        self.send(Command::RefreshVoices)
    }

    /// Voices most recently reported by the driver
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub async fn voices(&self) -> Result<Vec<Voice>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Voices(tx))?;
        rx.await.map_err(|_| Error::SpeakerStopped)
    }

    /// Voice used for the next dispatched chunk
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub async fn selected_voice(&self) -> Result<Option<Voice>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SelectedVoice(tx))?;
        rx.await.map_err(|_| Error::SpeakerStopped)
    }

    /// Wait until nothing is playing and nothing is queued
    ///
    /// # Errors
    ///
    /// Returns error if the speaker task has stopped
    pub async fn drained(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WaitDrained(tx))?;
        rx.await.map_err(|_| Error::SpeakerStopped)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::SpeakerStopped)
    }
}

/// Sequences speech through a driver, one chunk at a time
pub struct Speaker {
    queue: PlaybackQueue,
    driver: Arc<dyn SpeechDriver>,
    selector: VoiceSelector,
    voices: Vec<Voice>,
    voice_retry: Duration,
    drain_waiters: Vec<oneshot::Sender<()>>,
    stops: watch::Sender<u64>,
}

impl Speaker {
    /// Create a speaker for `driver` using the speech configuration
    #[must_use]
    pub fn new(driver: Arc<dyn SpeechDriver>, config: &SpeechConfig) -> Self {
        Self {
            queue: PlaybackQueue::new(config.max_chunk_len),
            driver,
            selector: VoiceSelector::new(&config.preferred_voice, &config.preferred_lang),
            voices: Vec::new(),
            voice_retry: config.voice_retry,
            drain_waiters: Vec::new(),
            stops: watch::Sender::new(0),
        }
    }

    /// Start the speaker task on the current tokio runtime
    #[must_use]
    pub fn spawn(self) -> SpeakerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(rx));
        SpeakerHandle { tx }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();

        tracing::debug!(driver = self.driver.name(), "speaker started");

        // Voice lists can arrive late; retry once if the first query is empty
        let mut retry_pending = !self.load_voices().await;
        let retry = tokio::time::sleep(self.voice_retry);
        tokio::pin!(retry);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command, &done_tx).await;
                }
                Some(finished) = done_rx.recv() => {
                    self.handle_finished(finished, &done_tx);
                }
                () = &mut retry, if retry_pending => {
                    retry_pending = false;
                    tracing::debug!("retrying voice list");
                    self.load_voices().await;
                }
            }

            self.notify_if_drained();
        }

        tracing::debug!("speaker stopped");
    }

    async fn handle_command(
        &mut self,
        command: Command,
        done_tx: &mpsc::UnboundedSender<Finished>,
    ) {
        match command {
            Command::Speak(text) => {
                if let Some(dispatch) = self.queue.enqueue(text) {
                    self.dispatch(dispatch, done_tx);
                }
            }
            Command::Clear => {
                tracing::debug!(pending = self.queue.pending_len(), "clearing speech queue");
                self.queue.clear();
            }
            Command::Stop(reply) => {
                tracing::debug!(pending = self.queue.pending_len(), "stopping speech");
                self.queue.clear();
                self.stops.send_modify(|stops| *stops = stops.wrapping_add(1));
                if let Err(e) = self.driver.cancel().await {
                    tracing::warn!(error = %e, "failed to cancel speech");
                }
                let _ = reply.send(());
            }
            Command::SetVoice(voice) => {
                tracing::info!(voice = ?voice.as_ref().map(|v| &v.name), "voice set");
                self.queue.set_voice(voice);
            }
            Command::RefreshVoices => {
                self.load_voices().await;
            }
            Command::Voices(reply) => {
                let _ = reply.send(self.voices.clone());
            }
            Command::SelectedVoice(reply) => {
                let _ = reply.send(self.queue.voice().cloned());
            }
            Command::WaitDrained(reply) => {
                self.drain_waiters.push(reply);
            }
        }
    }

    fn handle_finished(&mut self, finished: Finished, done_tx: &mpsc::UnboundedSender<Finished>) {
        if let Err(e) = finished.result {
            tracing::warn!(error = %e, "speech error, skipping chunk");
        }

        if let Some(dispatch) = self.queue.complete(finished.ticket) {
            self.dispatch(dispatch, done_tx);
        }
    }

    /// Hand one chunk to the driver on its own task
    fn dispatch(&self, dispatch: Dispatch, done_tx: &mpsc::UnboundedSender<Finished>) {
        let driver = Arc::clone(&self.driver);
        let done_tx = done_tx.clone();
        // Subscribed here so a stop cannot slip in before the task first runs
        let mut stopped = self.stops.subscribe();

        tracing::debug!(
            ticket = ?dispatch.ticket,
            chunk_len = dispatch.text.len(),
            voice = ?dispatch.voice.as_ref().map(|v| &v.name),
            "dispatching chunk"
        );

        tokio::spawn(async move {
            let result = tokio::select! {
                result = driver.speak(&dispatch.text, dispatch.voice.as_ref()) => result,
                _ = stopped.changed() => {
                    tracing::debug!(ticket = ?dispatch.ticket, "chunk stopped");
                    Ok(())
                }
            };
            let _ = done_tx.send(Finished {
                ticket: dispatch.ticket,
                result,
            });
        });
    }

    /// Query the driver and re-run voice selection
    ///
    /// Returns whether any voices were available.
    async fn load_voices(&mut self) -> bool {
        match self.driver.voices().await {
            Ok(voices) => self.voices = voices,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list voices");
                self.voices.clear();
            }
        }

        if let Some(voice) = self.selector.select(&self.voices) {
            tracing::info!(voice = %voice, "selected voice");
            self.queue.set_voice(Some(voice.clone()));
            true
        } else {
            tracing::warn!("no suitable voice found, using driver default");
            false
        }
    }

    fn notify_if_drained(&mut self) {
        if self.queue.is_drained() {
            for waiter in self.drain_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}
