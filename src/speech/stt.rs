//! Speech recognition via the OpenAI Whisper transcription API

use crate::{Error, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for the network speech recognition service
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl SpeechToText {
    /// Create a new recognition client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "API key required for speech recognition".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }

    /// Transcribe WAV audio bytes to text
    ///
    /// # Errors
    ///
    /// Returns error if the service is unreachable or rejects the request
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "submitting audio for recognition");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response.json().await?;
        tracing::debug!(transcript = %result.text, "recognition complete");
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let err = SpeechToText::new(String::new(), "whisper-1".to_string());
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn client_construction_succeeds_with_a_key() {
        assert!(SpeechToText::new("sk-test".to_string(), "whisper-1".to_string()).is_ok());
    }
}
