//! Configuration management for the seer assistant
//!
//! Defaults alone produce a working setup; an optional TOML file at
//! `~/.config/seer/config.toml` is a partial overlay on top of them, and the
//! recognition API key can come from the environment.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Default image the assistant describes, relative to the working directory
pub const DEFAULT_IMAGE_PATH: &str = "image_to_see.jpg";

/// Fixed captioning model identifier
pub const DEFAULT_CAPTION_MODEL: &str = "Salesforce/blip-image-captioning-large";

/// Seer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the single image the assistant can describe
    pub image_path: PathBuf,

    /// Speech recognition configuration
    pub recognition: RecognitionConfig,

    /// Speech synthesis configuration
    pub tts: TtsConfig,

    /// Image captioning configuration
    pub caption: CaptionConfig,
}

/// Speech recognition (network STT) configuration
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Transcription model (e.g. "whisper-1")
    pub model: String,
}

/// Speech synthesis (local VITS engine) configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Path to the ONNX voice model
    pub model_path: PathBuf,

    /// Path to the model's tokens file
    pub tokens_path: PathBuf,

    /// Optional lexicon file for models that need one
    pub lexicon_path: Option<PathBuf>,

    /// Optional espeak-ng data directory
    pub data_dir: Option<PathBuf>,

    /// Speech rate multiplier (1.0 = normal)
    pub speed: f32,

    /// Speaker ID for multi-speaker models
    pub speaker_id: i32,
}

/// Image captioning configuration
#[derive(Debug, Clone)]
pub struct CaptionConfig {
    /// Hugging Face model identifier
    pub model_id: String,

    /// Model revision holding safetensors weights
    pub revision: String,

    /// Hard cap on generated caption tokens
    pub max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            recognition: RecognitionConfig {
                api_key: None,
                model: "whisper-1".to_string(),
            },
            tts: TtsConfig {
                model_path: PathBuf::from("models/vits/model.onnx"),
                tokens_path: PathBuf::from("models/vits/tokens.txt"),
                lexicon_path: None,
                data_dir: None,
                speed: 1.0,
                speaker_id: 0,
            },
            caption: CaptionConfig {
                model_id: DEFAULT_CAPTION_MODEL.to_string(),
                // The main branch ships pytorch weights only
                revision: "refs/pr/18".to_string(),
                max_tokens: 50,
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the config file overlay if present,
    /// then environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file_path()
            && path.exists()
        {
            let raw = std::fs::read_to_string(&path)?;
            let file: ConfigFile = toml::from_str(&raw)?;
            tracing::debug!(path = %path.display(), "loaded config file");
            config.apply_file(file);
        }

        if let Ok(key) = std::env::var("SEER_OPENAI_API_KEY") {
            config.recognition.api_key = Some(key);
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.recognition.api_key = Some(key);
        }

        Ok(config)
    }

    /// Overlay values from a parsed config file onto this configuration
    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(image) = file.image {
            self.image_path = PathBuf::from(image);
        }

        if let Some(key) = file.recognition.api_key {
            self.recognition.api_key = Some(key);
        }
        if let Some(model) = file.recognition.model {
            self.recognition.model = model;
        }

        if let Some(model) = file.tts.model {
            self.tts.model_path = PathBuf::from(model);
        }
        if let Some(tokens) = file.tts.tokens {
            self.tts.tokens_path = PathBuf::from(tokens);
        }
        if let Some(lexicon) = file.tts.lexicon {
            self.tts.lexicon_path = Some(PathBuf::from(lexicon));
        }
        if let Some(data_dir) = file.tts.data_dir {
            self.tts.data_dir = Some(PathBuf::from(data_dir));
        }
        if let Some(speed) = file.tts.speed {
            self.tts.speed = speed;
        }
        if let Some(speaker_id) = file.tts.speaker_id {
            self.tts.speaker_id = speaker_id;
        }

        if let Some(model_id) = file.caption.model {
            self.caption.model_id = model_id;
        }
        if let Some(revision) = file.caption.revision {
            self.caption.revision = revision;
        }
        if let Some(max_tokens) = file.caption.max_tokens {
            self.caption.max_tokens = max_tokens;
        }
    }

    /// Require the recognition API key to be configured
    ///
    /// # Errors
    ///
    /// Returns error if no key was found in the config file or environment
    pub fn require_api_key(&self) -> Result<String> {
        self.recognition
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "recognition API key required (set SEER_OPENAI_API_KEY or add \
                     [recognition] api_key to the config file)"
                        .to_string(),
                )
            })
    }
}

/// Location of the config file: `~/.config/seer/config.toml`
fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config/seer/config.toml"))
}

/// Top-level TOML configuration file schema; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    /// Path to the image to describe
    image: Option<String>,

    #[serde(default)]
    recognition: RecognitionFileConfig,

    #[serde(default)]
    tts: TtsFileConfig,

    #[serde(default)]
    caption: CaptionFileConfig,
}

/// Speech recognition file section
#[derive(Debug, Default, Deserialize)]
struct RecognitionFileConfig {
    api_key: Option<String>,
    model: Option<String>,
}

/// Speech synthesis file section
#[derive(Debug, Default, Deserialize)]
struct TtsFileConfig {
    model: Option<String>,
    tokens: Option<String>,
    lexicon: Option<String>,
    data_dir: Option<String>,
    speed: Option<f32>,
    speaker_id: Option<i32>,
}

/// Captioning file section
#[derive(Debug, Default, Deserialize)]
struct CaptionFileConfig {
    model: Option<String>,
    revision: Option<String>,
    max_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_behavior() {
        let config = Config::default();
        assert_eq!(config.image_path, PathBuf::from("image_to_see.jpg"));
        assert_eq!(config.recognition.model, "whisper-1");
        assert_eq!(config.caption.model_id, DEFAULT_CAPTION_MODEL);
        assert_eq!(config.caption.max_tokens, 50);
        assert!((config.tts.speed - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn file_overlay_replaces_only_present_fields() {
        let raw = r#"
            image = "photos/cat.png"

            [recognition]
            model = "whisper-large"

            [tts]
            model = "voices/amy.onnx"
            speed = 1.25
        "#;
        let file: ConfigFile = toml::from_str(raw).unwrap();

        let mut config = Config::default();
        config.apply_file(file);

        assert_eq!(config.image_path, PathBuf::from("photos/cat.png"));
        assert_eq!(config.recognition.model, "whisper-large");
        assert_eq!(config.tts.model_path, PathBuf::from("voices/amy.onnx"));
        assert!((config.tts.speed - 1.25).abs() < f32::EPSILON);
        // Untouched fields keep their defaults
        assert_eq!(config.tts.tokens_path, PathBuf::from("models/vits/tokens.txt"));
        assert_eq!(config.caption.max_tokens, 50);
    }

    #[test]
    fn empty_file_is_a_no_op() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let mut config = Config::default();
        config.apply_file(file);
        assert_eq!(config.image_path, PathBuf::from(DEFAULT_IMAGE_PATH));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = Config {
            recognition: RecognitionConfig {
                api_key: None,
                model: "whisper-1".to_string(),
            },
            ..Config::default()
        };
        assert!(config.require_api_key().is_err());

        let config = Config {
            recognition: RecognitionConfig {
                api_key: Some("sk-test".to_string()),
                model: "whisper-1".to_string(),
            },
            ..Config::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }
}
