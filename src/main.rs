use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use talkback::chat::{ChatExit, HELP, run_chat};
use talkback::config::DriverKind;
use talkback::speech::{self, Speaker, SpeakerHandle, SpeechDriver, VoiceSelector};
use talkback::{AssistantClient, Config, Conversation, TerminalView, WhisperRecognizer};

/// Talkback - voice-enabled chat client for a remote assistant
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Assistant endpoint URL
    #[arg(long, env = "TALKBACK_ENDPOINT")]
    endpoint: Option<String>,

    /// Don't speak replies
    #[arg(long)]
    no_speech: bool,

    /// Speech driver: system, openai, or silent
    #[arg(long)]
    driver: Option<DriverKind>,

    /// Preferred voice name
    #[arg(long)]
    voice: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and wait for the reply to be spoken
    Ask {
        /// Message text
        text: String,
    },
    /// Speak text locally without contacting the assistant
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// List available voices and the one that would be selected
    Voices,
    /// Listen for one spoken message and send it
    Listen,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,talkback=info",
        1 => "info,talkback=debug",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so the chat on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    // CLI flags take precedence over env and config file
    if let Some(endpoint) = cli.endpoint {
        config.assistant.endpoint = endpoint;
    }
    if cli.no_speech {
        config.speech.enabled = false;
    }
    if let Some(driver) = cli.driver {
        config.speech.driver = driver;
    }
    if let Some(voice) = cli.voice {
        config.speech.preferred_voice = voice;
    }
    config.validate()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Say { text }) => cmd_say(&config, &text).await,
        Some(Command::Voices) => cmd_voices(&config).await,
        Some(Command::Ask { text }) => {
            let conversation = build_conversation(&config)?;
            conversation.submit(&text).await;
            finish(&conversation).await;
            Ok(())
        }
        Some(Command::Listen) => {
            let conversation = build_conversation(&config)?;
            conversation.listen().await;
            finish(&conversation).await;
            Ok(())
        }
        None => chat(&config).await,
    }
}

/// Interactive chat on stdin
async fn chat(config: &Config) -> anyhow::Result<()> {
    let conversation = build_conversation(config)?;
    let stdin = BufReader::new(tokio::io::stdin());

    tracing::info!(endpoint = %config.assistant.endpoint, "talkback ready");
    println!("{HELP}");

    // Ctrl-C exits right away; queued speech is only awaited on a clean exit
    match run_chat(&conversation, stdin, tokio::signal::ctrl_c()).await? {
        ChatExit::Interrupted => {}
        ChatExit::Quit | ChatExit::EndOfInput => finish(&conversation).await,
    }
    Ok(())
}

/// Wire the assistant client, speaker, and recognizer together
fn build_conversation(config: &Config) -> anyhow::Result<Conversation> {
    let client = AssistantClient::from_config(&config.assistant)?;
    let mut conversation = Conversation::new(client, Arc::new(TerminalView));

    if config.speech.enabled {
        conversation = conversation.with_speaker(spawn_speaker(config)?);
    }

    match WhisperRecognizer::from_config(config) {
        Ok(recognizer) => conversation = conversation.with_recognizer(Arc::new(recognizer)),
        Err(e) => tracing::debug!(error = %e, "speech recognition disabled"),
    }

    Ok(conversation)
}

fn spawn_speaker(config: &Config) -> anyhow::Result<SpeakerHandle> {
    let driver = speech::driver_from_config(config)?;
    tracing::debug!(driver = driver.name(), "speech driver ready");
    Ok(Speaker::new(driver, &config.speech).spawn())
}

/// Let queued speech play out before exiting
async fn finish(conversation: &Conversation) {
    if let Some(speaker) = conversation.speaker() {
        if let Err(e) = speaker.drained().await {
            tracing::debug!(error = %e, "speaker already stopped");
        }
    }
}

/// Speak text through the playback queue
async fn cmd_say(config: &Config, text: &str) -> anyhow::Result<()> {
    let speaker = spawn_speaker(config)?;
    speaker.speak(text)?;
    speaker.drained().await?;
    Ok(())
}

/// List driver voices and mark the automatic choice
async fn cmd_voices(config: &Config) -> anyhow::Result<()> {
    let driver = speech::driver_from_config(config)?;
    let voices = driver.voices().await?;
    let selector =
        VoiceSelector::new(&config.speech.preferred_voice, &config.speech.preferred_lang);
    let selected = selector.select(&voices);

    if voices.is_empty() {
        println!("No voices reported by the {} driver", driver.name());
    }
    for voice in &voices {
        let marker = if Some(voice) == selected { "*" } else { " " };
        println!("{marker} {voice}");
    }
    Ok(())
}
