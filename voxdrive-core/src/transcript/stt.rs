//! Speech-to-text boundary.
//!
//! The production backend uploads each clip to an OpenAI-compatible
//! Whisper transcription endpoint. One attempt per clip, no retries: the
//! caller treats any failure as "no transcript evidence" and the cycle
//! carries on.

use std::time::Duration;

use reqwest::blocking::multipart;
use tracing::debug;

use crate::audio::{wav, AudioClip};
use crate::error::{Result, VoxdriveError};

/// Contract for transcription backends.
pub trait SpeechToText: Send + 'static {
    /// Best-effort transcription of a mono clip. An empty string means
    /// "nothing recognized" and is not an error.
    fn transcribe(&mut self, clip: &AudioClip) -> Result<String>;
}

const TRANSCRIBE_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const TRANSCRIBE_MODEL: &str = "whisper-1";

pub struct WhisperApiTranscriber {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl WhisperApiTranscriber {
    /// Read the API key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VoxdriveError::Transcription(format!("{API_KEY_ENV} is not set")))?;
        Self::new(api_key)
    }

    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| VoxdriveError::Transcription(format!("client build: {e}")))?;
        Ok(Self { client, api_key })
    }
}

impl SpeechToText for WhisperApiTranscriber {
    fn transcribe(&mut self, clip: &AudioClip) -> Result<String> {
        let wav_bytes = wav::encode_wav(clip)?;
        let file_part = multipart::Part::bytes(wav_bytes)
            .file_name("clip.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoxdriveError::Transcription(format!("multipart: {e}")))?;
        let form = multipart::Form::new()
            .text("model", TRANSCRIBE_MODEL)
            .text("response_format", "json")
            .part("file", file_part);

        let response = self
            .client
            .post(TRANSCRIBE_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoxdriveError::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VoxdriveError::Transcription(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| VoxdriveError::Transcription(format!("response parse: {e}")))?;
        let text = payload
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();

        debug!(chars = text.len(), "transcription received");
        Ok(text)
    }
}
