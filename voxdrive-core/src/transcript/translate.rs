//! Translation boundary.
//!
//! The production backend calls the public Google endpoint that browser
//! clients use (`client=gtx`): no API key, best-effort availability. One
//! attempt; a failure upstream just means the raw transcript gets matched
//! instead.

use std::time::Duration;

use tracing::debug;

use crate::error::{Result, VoxdriveError};

/// Contract for translation backends.
pub trait Translator: Send + 'static {
    /// Translate `text` into `target` (ISO 639-1 code), auto-detecting the
    /// source language.
    fn translate(&mut self, text: &str, target: &str) -> Result<String>;
}

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GoogleTranslator {
    client: reqwest::blocking::Client,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| VoxdriveError::Translation(format!("client build: {e}")))?;
        Ok(Self { client })
    }
}

impl Translator for GoogleTranslator {
    fn translate(&mut self, text: &str, target: &str) -> Result<String> {
        let response = self
            .client
            .get(TRANSLATE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .map_err(|e| VoxdriveError::Translation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VoxdriveError::Translation(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| VoxdriveError::Translation(format!("response parse: {e}")))?;

        // Payload shape: [[["çeviri", "source", ...], ...], ...].
        // The translation arrives split into segments.
        let segments = payload
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| VoxdriveError::Translation("unexpected response shape".into()))?;
        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
                translated.push_str(part);
            }
        }

        let translated = translated.trim().to_string();
        if translated.is_empty() {
            return Err(VoxdriveError::Translation("empty translation".into()));
        }
        debug!(chars = translated.len(), target, "translation received");
        Ok(translated)
    }
}
