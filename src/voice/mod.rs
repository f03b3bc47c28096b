//! Voice input and audio I/O
//!
//! Microphone capture, utterance segmentation, and transcription for speech
//! recognition, plus the speaker output used by cloud speech drivers.

mod capture;
mod playback;
mod recognition;
mod segment;
mod stt;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use recognition::{SpeechRecognizer, WhisperRecognizer};
pub use segment::{SegmentDetector, SegmentState};
pub use stt::SpeechToText;
