//! Speech input: one bounded microphone capture per call
//!
//! Each `listen` call calibrates against ambient noise, waits for speech onset
//! within a hard timeout, records until trailing silence or a hard phrase cap,
//! and submits the captured audio for recognition. Every failure folds into
//! the empty command so the caller's loop can simply continue. The window is
//! also bounded in wall-clock time, so a stalled device cannot wedge the loop.

use std::time::{Duration, Instant};

use crate::audio::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
use crate::speech::SpeechToText;
use crate::{Error, Result};

/// Ambient-noise calibration window
const CALIBRATION: Duration = Duration::from_secs(1);

/// Hard timeout waiting for speech onset
const ONSET_TIMEOUT_SAMPLES: usize = SAMPLE_RATE as usize * 5;

/// Hard cap on captured phrase duration
const PHRASE_LIMIT_SAMPLES: usize = SAMPLE_RATE as usize * 5;

/// Trailing silence that ends a phrase
const TRAILING_SILENCE_SAMPLES: usize = SAMPLE_RATE as usize / 2;

/// Energy threshold floor, for very quiet rooms
const MIN_ENERGY_THRESHOLD: f32 = 0.01;

/// Multiplier applied to the ambient RMS to set the speech threshold
const AMBIENT_RATIO: f32 = 2.0;

/// Poll cadence while the capture stream runs
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wall-clock bound on one whole window (onset wait + phrase + slack); the
/// sample counters stop advancing if the device stops delivering
const WINDOW_DEADLINE: Duration = Duration::from_secs(11);

/// Converts one spoken utterance into a normalized command string
pub struct SpeechInput {
    stt: SpeechToText,
}

impl SpeechInput {
    /// Create a speech input wrapper around a recognition client
    #[must_use]
    pub fn new(stt: SpeechToText) -> Self {
        Self { stt }
    }

    /// Capture and recognize one utterance
    ///
    /// Returns the lowercased, trimmed transcript, or the empty string when
    /// the capture timed out, nothing usable was recognized, or the
    /// recognition service failed.
    pub async fn listen(&self) -> String {
        let samples = match self.capture_utterance().await {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                tracing::info!("listening timed out");
                return String::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "audio capture failed");
                return String::new();
            }
        };

        tracing::info!("recognizing");
        match self.recognize(&samples).await {
            Ok(command) if command.is_empty() => {
                tracing::info!("no usable transcript");
                String::new()
            }
            Ok(command) => {
                tracing::info!(%command, "command recognized");
                command
            }
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                String::new()
            }
        }
    }

    /// Run one scoped capture: calibrate, wait for onset, record the phrase
    ///
    /// Returns `None` when no speech started within the onset timeout.
    async fn capture_utterance(&self) -> Result<Option<Vec<f32>>> {
        let mut capture = AudioCapture::open()?;
        capture.start()?;

        tracing::info!("adjusting for ambient noise");
        tokio::time::sleep(CALIBRATION).await;
        let ambient = rms(&capture.drain());
        let threshold = (ambient * AMBIENT_RATIO).max(MIN_ENERGY_THRESHOLD);

        tracing::info!(threshold, "listening for a command");
        let mut window = ListenWindow::new(threshold);

        let outcome = loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if capture.stream_failed() {
                capture.stop();
                return Err(Error::Audio("input stream failed mid-capture".to_string()));
            }
            let chunk = capture.drain();
            match window.push(&chunk) {
                WindowProgress::Waiting | WindowProgress::Capturing => {}
                WindowProgress::Complete => break Some(window.into_samples()),
                WindowProgress::TimedOut => break None,
            }
        };

        capture.stop();
        Ok(outcome)
    }

    /// Encode the samples and submit them to the recognition backend
    async fn recognize(&self, samples: &[f32]) -> Result<String> {
        let wav = samples_to_wav(samples, SAMPLE_RATE)?;
        let transcript = self.stt.transcribe(&wav).await?;
        Ok(transcript.trim().to_lowercase())
    }
}

/// Progress of a bounded listen window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowProgress {
    /// No speech yet, still within the onset timeout
    Waiting,
    /// Speech started, phrase still accumulating
    Capturing,
    /// Phrase ended (trailing silence or phrase cap reached)
    Complete,
    /// Onset timeout elapsed without speech
    TimedOut,
}

/// Segmentation state machine for one listen window
///
/// Sample-counting logic with a wall-clock backstop, independent of the audio
/// device, fed with the chunks drained from a capture stream.
pub(crate) struct ListenWindow {
    threshold: f32,
    deadline: Instant,
    captured: Vec<f32>,
    silence_samples: usize,
    waited_samples: usize,
    speech_started: bool,
}

impl ListenWindow {
    pub(crate) fn new(threshold: f32) -> Self {
        Self::with_deadline(threshold, Instant::now() + WINDOW_DEADLINE)
    }

    pub(crate) fn with_deadline(threshold: f32, deadline: Instant) -> Self {
        Self {
            threshold,
            deadline,
            captured: Vec::new(),
            silence_samples: 0,
            waited_samples: 0,
            speech_started: false,
        }
    }

    /// Feed the next chunk of samples and report the window's progress
    pub(crate) fn push(&mut self, chunk: &[f32]) -> WindowProgress {
        // The deadline catches a device that stops delivering samples: the
        // counters below only advance with delivered audio
        if Instant::now() >= self.deadline {
            return if self.speech_started {
                WindowProgress::Complete
            } else {
                WindowProgress::TimedOut
            };
        }

        let is_speech = rms(chunk) > self.threshold;

        if !self.speech_started {
            if is_speech {
                self.speech_started = true;
                self.captured.extend_from_slice(chunk);
                return WindowProgress::Capturing;
            }
            self.waited_samples += chunk.len();
            if self.waited_samples >= ONSET_TIMEOUT_SAMPLES {
                return WindowProgress::TimedOut;
            }
            return WindowProgress::Waiting;
        }

        self.captured.extend_from_slice(chunk);
        if is_speech {
            self.silence_samples = 0;
        } else {
            self.silence_samples += chunk.len();
        }

        if self.captured.len() >= PHRASE_LIMIT_SAMPLES
            || self.silence_samples >= TRAILING_SILENCE_SAMPLES
        {
            return WindowProgress::Complete;
        }

        WindowProgress::Capturing
    }

    /// The phrase captured so far
    pub(crate) fn into_samples(self) -> Vec<f32> {
        self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = SAMPLE_RATE as usize / 10; // 100ms

    #[allow(clippy::cast_precision_loss)]
    fn speech_chunk() -> Vec<f32> {
        (0..CHUNK)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    fn silence_chunk() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    #[test]
    fn waits_quietly_before_onset() {
        let mut window = ListenWindow::new(0.03);
        assert_eq!(window.push(&silence_chunk()), WindowProgress::Waiting);
        assert_eq!(window.push(&silence_chunk()), WindowProgress::Waiting);
    }

    #[test]
    fn times_out_without_speech() {
        let mut window = ListenWindow::new(0.03);
        let mut progress = WindowProgress::Waiting;
        // 5s of silence at 100ms per chunk
        for _ in 0..50 {
            progress = window.push(&silence_chunk());
        }
        assert_eq!(progress, WindowProgress::TimedOut);
    }

    #[test]
    fn trailing_silence_completes_the_phrase() {
        let mut window = ListenWindow::new(0.03);

        for _ in 0..5 {
            assert_eq!(window.push(&speech_chunk()), WindowProgress::Capturing);
        }

        let mut progress = WindowProgress::Capturing;
        for _ in 0..5 {
            progress = window.push(&silence_chunk());
        }
        assert_eq!(progress, WindowProgress::Complete);

        // 0.5s speech + 0.5s trailing silence
        let samples = window.into_samples();
        assert_eq!(samples.len(), CHUNK * 10);
    }

    #[test]
    fn phrase_cap_completes_long_utterances() {
        let mut window = ListenWindow::new(0.03);
        let mut progress = WindowProgress::Waiting;
        for _ in 0..55 {
            progress = window.push(&speech_chunk());
            if progress == WindowProgress::Complete {
                break;
            }
        }
        assert_eq!(progress, WindowProgress::Complete);
        assert!(window.into_samples().len() >= PHRASE_LIMIT_SAMPLES);
    }

    #[test]
    fn stalled_stream_times_out_at_the_wall_clock_deadline() {
        // A dead stream delivers empty chunks, which never advance the
        // sample counters; the deadline must still end the window
        let mut window = ListenWindow::with_deadline(0.03, Instant::now());
        assert_eq!(window.push(&[]), WindowProgress::TimedOut);
    }

    #[test]
    fn stall_after_onset_completes_with_what_was_heard() {
        let deadline = Instant::now() + Duration::from_millis(30);
        let mut window = ListenWindow::with_deadline(0.03, deadline);
        assert_eq!(window.push(&speech_chunk()), WindowProgress::Capturing);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(window.push(&[]), WindowProgress::Complete);
        assert_eq!(window.into_samples().len(), CHUNK);
    }

    #[test]
    fn speech_resets_the_silence_counter() {
        let mut window = ListenWindow::new(0.03);
        window.push(&speech_chunk());

        // Short pauses under the silence limit keep the phrase open
        for _ in 0..4 {
            assert_eq!(window.push(&silence_chunk()), WindowProgress::Capturing);
        }
        assert_eq!(window.push(&speech_chunk()), WindowProgress::Capturing);
        for _ in 0..4 {
            assert_eq!(window.push(&silence_chunk()), WindowProgress::Capturing);
        }
    }
}
