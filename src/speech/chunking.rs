//! Text chunking for speech synthesis
//!
//! Speech engines cap the length of a single utterance. This module splits
//! long replies into word-aligned chunks that each fit within a character
//! limit, so every chunk can be handed to the engine on its own.

/// Default chunk size limit in characters
pub const DEFAULT_MAX_CHUNK_LEN: usize = 200;

/// Split `text` into word-aligned chunks of at most `max_len` characters.
///
/// Words are separated by any whitespace and rejoined with a single space.
/// A word longer than `max_len` is emitted as its own oversized chunk rather
/// than being cut mid-word. Every returned chunk is non-empty.
///
/// # Examples
///
/// ```
/// use talkback::speech::split_into_chunks;
///
/// let chunks = split_into_chunks("one two three", 7);
/// assert_eq!(chunks, vec!["one two", "three"]);
/// ```
#[must_use]
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    // Length of `current` in characters, tracked separately from its byte length
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed <= max_len {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
