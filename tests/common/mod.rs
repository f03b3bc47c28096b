//! Shared test utilities

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::Semaphore;

use talkback::config::SpeechConfig;
use talkback::speech::{SpeechDriver, Voice};
use talkback::voice::SpeechRecognizer;
use talkback::{ChatView, Error, Message, Result};

/// A chunk handed to the scripted driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spoken {
    pub text: String,
    pub voice: Option<String>,
}

/// In-memory speech driver that records every chunk
///
/// In gated mode each chunk blocks until the test releases it, which lets
/// tests control exactly when completions arrive.
pub struct ScriptedDriver {
    started: Mutex<Vec<Spoken>>,
    finished: Mutex<Vec<String>>,
    voice_lists: Mutex<Vec<Vec<Voice>>>,
    gate: Option<Semaphore>,
    fail_on: Option<String>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancels: AtomicUsize,
}

impl ScriptedDriver {
    /// Driver that completes every chunk immediately
    pub fn new() -> Self {
        Self {
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            voice_lists: Mutex::new(Vec::new()),
            gate: None,
            fail_on: None,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    /// Driver whose chunks wait for [`release`](Self::release)
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Report these voices on every query
    pub fn with_voices(self, voices: Vec<Voice>) -> Self {
        self.with_voice_sequence(vec![voices])
    }

    /// Report each list in turn; the last one repeats
    pub fn with_voice_sequence(self, lists: Vec<Vec<Voice>>) -> Self {
        *self.voice_lists.lock().unwrap() = lists;
        self
    }

    /// Fail when asked to speak exactly `text`
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Let `n` waiting chunks finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Chunks in the order they were handed to the driver
    pub fn started(&self) -> Vec<Spoken> {
        self.started.lock().unwrap().clone()
    }

    /// Texts of started chunks
    pub fn started_texts(&self) -> Vec<String> {
        self.started().into_iter().map(|s| s.text).collect()
    }

    /// Texts of chunks that finished playing
    pub fn finished_texts(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    /// Most chunks ever outstanding at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Number of cancel requests received
    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` chunks have started
    pub async fn wait_for_started(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for chunks to start");
    }
}

#[async_trait]
impl SpeechDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        let mut lists = self.voice_lists.lock().unwrap();
        Ok(match lists.len() {
            0 => Vec::new(),
            1 => lists[0].clone(),
            _ => lists.remove(0),
        })
    }

    async fn speak(&self, text: &str, voice: Option<&Voice>) -> Result<()> {
        self.started.lock().unwrap().push(Spoken {
            text: text.to_string(),
            voice: voice.map(|v| v.name.clone()),
        });
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        } else {
            tokio::task::yield_now().await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().unwrap().push(text.to_string());

        if self.fail_on.as_deref() == Some(text) {
            return Err(Error::Tts("scripted failure".to_string()));
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stand-in speech command that logs when each chunk starts and ends
///
/// Each chunk takes about 300ms. `--voices` prints nothing.
#[cfg(unix)]
pub struct LoggingCommand {
    dir: std::path::PathBuf,
}

#[cfg(unix)]
impl LoggingCommand {
    pub fn new(name: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("talkback-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let log = dir.join("log");
        let script = dir.join("speak.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\n\
                 [ \"$1\" = \"--voices\" ] && exit 0\n\
                 for arg; do text=$arg; done\n\
                 echo \"start $text\" >> {log}\n\
                 sleep 0.3\n\
                 echo \"end $text\" >> {log}\n",
                log = log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    /// Path to pass as the speech command
    pub fn command(&self) -> String {
        self.dir.join("speak.sh").display().to_string()
    }

    /// Start and end lines logged so far
    pub fn log(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.join("log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Wait until `line` has been logged
    pub async fn wait_for(&self, line: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.log().iter().any(|l| l == line) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("speech command never logged the line");
    }
}

#[cfg(unix)]
impl Drop for LoggingCommand {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Speech config with a small chunk size and fast voice retry
pub fn speech_config(max_chunk_len: usize) -> SpeechConfig {
    SpeechConfig {
        max_chunk_len,
        voice_retry: Duration::from_millis(50),
        ..SpeechConfig::default()
    }
}

/// Chat view that keeps every message
#[derive(Default)]
pub struct RecordingView {
    messages: Mutex<Vec<Message>>,
}

impl RecordingView {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

impl ChatView for RecordingView {
    fn show(&self, message: &Message) {
        self.messages.lock().unwrap().push(message.clone());
    }
}

/// Recognizer returning a fixed transcript, or a no-speech error
pub struct FixedRecognizer(pub Option<String>);

#[async_trait]
impl SpeechRecognizer for FixedRecognizer {
    async fn recognize(&self) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::Recognition("no-speech".to_string()))
    }
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_endpoint(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test endpoint");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test endpoint failed");
    });
    format!("http://{addr}")
}
