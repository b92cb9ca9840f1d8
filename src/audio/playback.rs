//! Speaker playback
//!
//! Playback is blocking: `play` returns only after the submitted samples have
//! drained. The output stream is built per call and dropped afterwards, so the
//! device is held for exactly one utterance.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Plays audio on the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "speaker opened"
        );

        Ok(Self { device })
    }

    /// Play mono f32 samples at the given rate, blocking until drained
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output config exists or the stream fails
    pub fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.negotiate_config(sample_rate)?;
        self.play_blocking(samples, sample_rate, &config)
    }

    /// Drive the output stream and poll until the queue drains
    fn play_blocking(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &StreamConfig,
    ) -> Result<()> {
        let channels = config.channels as usize;

        let queue = Arc::new(Mutex::new(samples.to_vec()));
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let queue_cb = Arc::clone(&queue);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let queue = queue_cb.lock().unwrap();
                    let mut pos = position_cb.lock().unwrap();

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < queue.len() {
                            let s = queue[*pos];
                            *pos += 1;
                            s
                        } else {
                            *finished_cb.lock().unwrap() = true;
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "speaker stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Bound the completion poll by the audio duration plus slack
        let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate);
        let deadline = std::time::Instant::now()
            + std::time::Duration::from_millis(duration_ms + 500);

        while !*finished.lock().unwrap() {
            if std::time::Instant::now() > deadline {
                tracing::warn!("playback did not signal completion before deadline");
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Let the device flush its last buffer
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), sample_rate, "playback complete");

        Ok(())
    }

    /// Find an output config at the requested rate, preferring mono
    fn negotiate_config(&self, sample_rate: u32) -> Result<StreamConfig> {
        let at_rate = |channels: u16| {
            self.device.supported_output_configs().ok()?.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        };

        let supported = at_rate(1)
            .or_else(|| at_rate(2))
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })?;

        Ok(supported.with_sample_rate(SampleRate(sample_rate)).config())
    }
}
