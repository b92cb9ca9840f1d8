//! Error types for the seer assistant

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for seer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the seer assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Captioning model failed to load
    #[error("caption model error: {0}")]
    Model(String),

    /// The image to describe does not exist at call time.
    ///
    /// The display text doubles as the spoken diagnostic.
    #[error("Error: The file '{}' was not found.", .0.display())]
    ImageNotFound(PathBuf),

    /// Captioning inference or decode failure.
    ///
    /// The display text doubles as the spoken diagnostic.
    #[error("An error occurred while processing the image: {0}")]
    Caption(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_not_found_message_names_the_path() {
        let err = Error::ImageNotFound(PathBuf::from("image_to_see.jpg"));
        assert_eq!(
            err.to_string(),
            "Error: The file 'image_to_see.jpg' was not found."
        );
    }

    #[test]
    fn caption_failure_message_is_descriptive() {
        let err = Error::Caption("corrupt JPEG data".to_string());
        assert_eq!(
            err.to_string(),
            "An error occurred while processing the image: corrupt JPEG data"
        );
    }
}
