//! Speech output: local VITS synthesis played through the speakers
//!
//! The synthesis engine is built once at startup; a missing voice model or a
//! failed engine build is a fatal error for the process. Each `speak` call
//! synthesizes to samples and blocks until playback drains.

use sherpa_rs::tts::{VitsTts, VitsTtsConfig};

use crate::audio::AudioPlayback;
use crate::config::TtsConfig;
use crate::{Error, Result};

/// Converts text into audible speech, blocking until playback completes
pub struct SpeechOutput {
    engine: VitsTts,
    playback: AudioPlayback,
    speaker_id: i32,
}

impl SpeechOutput {
    /// Build the synthesis engine and open the output device
    ///
    /// # Errors
    ///
    /// Returns error if the voice model files are missing, the engine cannot
    /// be built, or no output device is available
    pub fn new(config: &TtsConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(Error::Tts(format!(
                "voice model not found: {}",
                config.model_path.display()
            )));
        }
        if !config.tokens_path.exists() {
            return Err(Error::Tts(format!(
                "voice tokens file not found: {}",
                config.tokens_path.display()
            )));
        }

        tracing::info!(model = %config.model_path.display(), "loading voice model");

        let vits_config = VitsTtsConfig {
            model: config.model_path.display().to_string(),
            tokens: config.tokens_path.display().to_string(),
            lexicon: config
                .lexicon_path
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
            data_dir: config
                .data_dir
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
            length_scale: 1.0 / config.speed.max(0.1),
            ..Default::default()
        };

        let engine = VitsTts::new(vits_config);
        let playback = AudioPlayback::open()?;

        tracing::info!("speech output ready");

        Ok(Self {
            engine,
            playback,
            speaker_id: config.speaker_id,
        })
    }

    /// Speak the given text, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub fn speak(&mut self, text: &str) -> Result<()> {
        tracing::info!(text, "speaking");

        if text.trim().is_empty() {
            return Ok(());
        }

        let audio = self
            .engine
            .create(text, self.speaker_id, 1.0)
            .map_err(|e| Error::Tts(format!("synthesis failed: {e}")))?;

        #[allow(clippy::cast_sign_loss)]
        let sample_rate = audio.sample_rate as u32;
        self.playback.play(&audio.samples, sample_rate)
    }
}
