//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays mono audio to the default output device
///
/// Playback blocks the calling thread; async callers run it through
/// `tokio::task::spawn_blocking`.
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device supports the playback rate
    pub fn new() -> Result<Self> {
        let device = default_output()?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| {
                c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            // Prefer mono, fall back to the narrowest multi-channel layout
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Decode MP3 bytes and play them, returning when done or cancelled
    ///
    /// `cancelled` is polled while the audio plays.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(&self, mp3_data: &[u8], cancelled: impl Fn() -> bool) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play_samples(samples, cancelled)
    }

    /// Play mono f32 samples, returning when done or cancelled
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built
    pub fn play_samples(&self, samples: Vec<f32>, cancelled: impl Fn() -> bool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = default_output()?;
        let channels = usize::from(self.config.channels);
        let sample_count = samples.len();

        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let stream_samples = Arc::clone(&samples);
        let stream_position = Arc::clone(&position);

        let stream = device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = stream_position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = stream_samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        pos = (pos + 1).min(stream_samples.len());
                    }
                    stream_position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let timeout = Duration::from_millis(duration_ms + 500);
        let start = Instant::now();

        while position.load(Ordering::Relaxed) < sample_count {
            if cancelled() {
                tracing::debug!("playback cancelled");
                break;
            }
            if start.elapsed() > timeout {
                tracing::warn!(samples = sample_count, "playback timed out");
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));
        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

fn default_output() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) if frame.channels == 2 => {
                samples.extend(frame.data.chunks(2).map(|pair| {
                    let left = f32::from(pair[0]) / 32768.0;
                    let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                    f32::midpoint(left, right)
                }));
            }
            Ok(frame) => {
                samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
