//! Audio device access (microphone capture and speaker playback)

pub mod capture;
pub mod playback;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayback;

/// Root-mean-square energy of a block of samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
