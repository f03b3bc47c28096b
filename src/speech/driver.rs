//! Speech drivers
//!
//! A driver turns one chunk of text into audible speech. The playback queue
//! never calls a driver directly; the speaker task does, one chunk at a time.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};

use super::voices::Voice;
use crate::{Error, Result};

/// Text-to-speech backend
#[async_trait]
pub trait SpeechDriver: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// List the voices this backend can speak with
    ///
    /// May legitimately return an empty list while the backend warms up.
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Speak `text`, resolving once the audio has finished playing
    ///
    /// `voice` of `None` means the backend default.
    async fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<()>;

    /// Stop any audio currently playing
    async fn cancel(&self) -> Result<()>;
}

/// One-at-a-time playback with generation-counted cancellation
///
/// Audio from overlapping `speak` calls never mixes: a chunk holds the gate
/// for as long as it plays. Every `cancel` bumps the generation, and a chunk
/// watching from before the bump stops, whether it is already playing or
/// still waiting for the gate.
pub struct PlaybackGate {
    playing: Arc<Mutex<()>>,
    generation: watch::Sender<u64>,
}

impl PlaybackGate {
    pub fn new() -> Self {
        Self {
            playing: Arc::new(Mutex::new(())),
            generation: watch::Sender::new(0),
        }
    }

    /// Observe cancels issued from now on
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Wait until no other chunk is playing
    pub async fn enter(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.playing).lock_owned().await
    }

    pub fn cancel(&self) {
        self.generation.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// Whether a cancel was issued since `watch` was taken
pub fn is_cancelled(watch: &watch::Receiver<u64>) -> bool {
    watch.has_changed().unwrap_or(true)
}

/// Speaks through a local espeak-ng compatible command
pub struct SystemDriver {
    command: String,
    gate: PlaybackGate,
}

impl SystemDriver {
    /// Create a driver invoking `command` (e.g. "espeak-ng")
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            gate: PlaybackGate::new(),
        }
    }
}

#[async_trait]
impl SpeechDriver for SystemDriver {
    fn name(&self) -> &str {
        &self.command
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new(&self.command)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Tts(format!("failed to run {}: {e}", self.command)))?;

        if !output.status.success() {
            return Err(Error::Tts(format!(
                "{} --voices exited with {}",
                self.command, output.status
            )));
        }

        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<()> {
        let mut cancelled = self.gate.watch();
        let _playing = self.gate.enter().await;
        if is_cancelled(&cancelled) {
            tracing::debug!("chunk cancelled before playback");
            return Ok(());
        }

        let mut command = Command::new(&self.command);
        if let Some(voice) = voice {
            command.arg("-v").arg(&voice.name);
        }
        command
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::trace!(
            command = %self.command,
            voice = ?voice.map(|v| &v.name),
            "spawning speech command"
        );
        let mut child = command
            .spawn()
            .map_err(|e| Error::Tts(format!("failed to run {}: {e}", self.command)))?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(Error::Tts(format!("{} exited with {status}", self.command)))
                }
            }
            _ = cancelled.changed() => {
                child.kill().await?;
                tracing::debug!("speech command cancelled");
                Ok(())
            }
        }
    }

    async fn cancel(&self) -> Result<()> {
        self.gate.cancel();
        Ok(())
    }
}

/// Parse `espeak-ng --voices` output
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-gb           --/M      English_(Great_Britain) gmw/en
/// ```
///
/// The voice file column is what `-v` accepts, so it becomes the voice name.
#[must_use]
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let lang = columns.next()?;
            let _age_gender = columns.next()?;
            let _display_name = columns.next()?;
            let file = columns.next()?;
            let name = file.rsplit('/').next().unwrap_or(file);
            Some(Voice::new(name, lang))
        })
        .collect()
}

/// Discards speech, completing every chunk immediately
#[derive(Debug, Default)]
pub struct SilentDriver;

#[async_trait]
impl SpeechDriver for SilentDriver {
    fn name(&self) -> &str {
        "silent"
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(Vec::new())
    }

    async fn speak(&self, text: &str, _voice: Option<&Voice>) -> Result<()> {
        tracing::debug!(chunk_len = text.len(), "discarding speech");
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        Ok(())
    }
}
