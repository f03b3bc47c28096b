//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Captures mono audio from the default input device
///
/// The underlying stream is not `Send`; create and drive the capture on a
/// single blocking thread.
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device at [`SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if no input device supports the capture rate
    pub fn new() -> Result<Self> {
        let device = default_input()?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| {
                c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing; multi-channel input is averaged down to mono
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = default_input()?;
        let buffer = Arc::clone(&self.buffer);
        let channels = usize::from(self.config.channels).max(1);

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        if channels == 1 {
                            buf.extend_from_slice(data);
                        } else {
                            #[allow(clippy::cast_precision_loss)]
                            buf.extend(
                                data.chunks(channels)
                                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                            );
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio capture stopped");
        }
    }

    /// Take the samples captured since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

fn default_input() -> Result<cpal::Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))
}

/// Convert f32 samples to 16-bit mono WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }

    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(cursor.into_inner())
}
