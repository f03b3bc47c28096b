//! Utterance segmentation
//!
//! Decides when a listening session has heard one complete utterance, using
//! frame energy: speech starts when energy crosses a threshold and ends after
//! a stretch of silence.

use super::capture::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 3 / 10;

/// Silence duration that ends an utterance (0.8 seconds)
const SILENCE_SAMPLES: usize = SAMPLE_RATE as usize * 8 / 10;

/// State of the segment detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// No speech heard yet
    Waiting,
    /// Speech in progress
    Speaking,
    /// Utterance finished; buffer is ready
    Complete,
}

/// Accumulates audio until one utterance has been spoken
#[derive(Debug)]
pub struct SegmentDetector {
    state: SegmentState,
    buffer: Vec<f32>,
    speech_samples: usize,
    silence_samples: usize,
}

impl Default for SegmentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentDetector {
    /// Create a detector waiting for speech
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmentState::Waiting,
            buffer: Vec::new(),
            speech_samples: 0,
            silence_samples: 0,
        }
    }

    /// Feed captured samples, returning the updated state
    pub fn process(&mut self, samples: &[f32]) -> SegmentState {
        if samples.is_empty() {
            return self.state;
        }

        let is_speech = calculate_energy(samples) > ENERGY_THRESHOLD;

        match self.state {
            SegmentState::Waiting => {
                if is_speech {
                    self.state = SegmentState::Speaking;
                    self.buffer.extend_from_slice(samples);
                    self.speech_samples = samples.len();
                    self.silence_samples = 0;
                    tracing::trace!("speech started");
                }
            }
            SegmentState::Speaking => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.speech_samples += samples.len();
                    self.silence_samples = 0;
                } else {
                    self.silence_samples += samples.len();
                }

                if self.silence_samples > SILENCE_SAMPLES {
                    if self.speech_samples >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.buffer.len(), "utterance complete");
                        self.state = SegmentState::Complete;
                    } else {
                        // A click or cough, not an utterance
                        tracing::trace!("speech too short, resetting");
                        self.reset();
                    }
                }
            }
            SegmentState::Complete => {}
        }

        self.state
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmentState {
        self.state
    }

    /// Whether any speech has been heard
    #[must_use]
    pub const fn heard_speech(&self) -> bool {
        !matches!(self.state, SegmentState::Waiting)
    }

    /// Take the accumulated utterance audio and reset
    pub fn take_buffer(&mut self) -> Vec<f32> {
        let buffer = std::mem::take(&mut self.buffer);
        self.reset();
        buffer
    }

    /// Discard everything and wait for speech again
    pub fn reset(&mut self) {
        self.state = SegmentState::Waiting;
        self.buffer.clear();
        self.speech_samples = 0;
        self.silence_samples = 0;
    }
}

/// Root-mean-square energy of a block of samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
