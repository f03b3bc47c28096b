//! Interactive chat loop
//!
//! Reads lines from the user and routes them to the conversation. An
//! interrupt (Ctrl-C in the terminal) is honoured at every await point,
//! including while a request or recognition session is in progress.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::Result;
use crate::conversation::Conversation;

/// Help line printed when the chat starts
pub const HELP: &str = "Type a message and press Enter. Commands: /listen /clear /voices /quit";

/// How a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    /// The user typed `/quit` or `/exit`
    Quit,
    /// Input reached end of file
    EndOfInput,
    /// The interrupt fired; speech was stopped
    Interrupted,
}

/// Run the chat until quit, end of input, or `interrupt` completes
///
/// On interrupt the work in progress is dropped and any speech is cut off
/// before returning.
///
/// # Errors
///
/// Returns error if reading input fails or the speaker task has stopped
pub async fn run_chat<R, I>(
    conversation: &Conversation,
    input: R,
    interrupt: I,
) -> Result<ChatExit>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => return interrupted(conversation).await,
        };
        let Some(line) = line else {
            return Ok(ChatExit::EndOfInput);
        };

        let keep_going = tokio::select! {
            result = handle_line(conversation, line.trim()) => result?,
            _ = &mut interrupt => return interrupted(conversation).await,
        };
        if !keep_going {
            return Ok(ChatExit::Quit);
        }
    }
}

/// Act on one line of input, returning whether to keep going
async fn handle_line(conversation: &Conversation, line: &str) -> Result<bool> {
    match line {
        "/quit" | "/exit" => return Ok(false),
        "/listen" => {
            conversation.listen().await;
        }
        "/clear" => conversation.clear_speech()?,
        "/voices" => show_voices(conversation).await?,
        input => {
            conversation.submit(input).await;
        }
    }
    Ok(true)
}

/// Re-query voices and list them, marking the selected one
async fn show_voices(conversation: &Conversation) -> Result<()> {
    let Some(speaker) = conversation.speaker() else {
        conversation.notice("Speech is disabled.");
        return Ok(());
    };

    speaker.refresh_voices()?;
    let voices = speaker.voices().await?;
    let selected = speaker.selected_voice().await?;

    if voices.is_empty() {
        conversation.notice("No voices available, using the driver default.");
    }
    for voice in &voices {
        let marker = if Some(voice) == selected.as_ref() { "*" } else { " " };
        conversation.notice(&format!("{marker} {voice}"));
    }
    Ok(())
}

async fn interrupted(conversation: &Conversation) -> Result<ChatExit> {
    tracing::debug!("chat interrupted");
    if let Some(speaker) = conversation.speaker() {
        speaker.stop().await?;
    }
    Ok(ChatExit::Interrupted)
}
