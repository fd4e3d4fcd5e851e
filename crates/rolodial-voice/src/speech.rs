//! Text-to-speech backends implementing the core `SpeechSynthesizer` seam.

use crate::error::{VoiceError, VoiceResult};
use rolodial_core::{CallerError, CallerResult, SpeechSynthesizer};
use std::sync::Arc;
use tracing::info;

/// Placeholder TTS: returns empty audio so nothing plays. Keeps the
/// speak-then-dial sequencing intact without an API key.
#[derive(Debug, Default)]
pub struct PlaceholderTts;

impl SpeechSynthesizer for PlaceholderTts {
    fn synthesize(&self, _text: &str) -> CallerResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Production TTS over an OpenAI-compatible speech API.
/// Configured by `SPEECH_API_URL`, `SPEECH_API_KEY`, `TTS_MODEL`, `TTS_VOICE`.
#[derive(Debug, Clone)]
pub struct SpeechApiTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// TTS model: tts-1 (fast) or tts-1-hd (higher quality).
    pub model: String,
    /// Voice id (alloy, echo, fable, onyx, nova, shimmer, ...).
    pub voice: String,
    client: reqwest::blocking::Client,
}

impl SpeechApiTts {
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("SPEECH_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("SPEECH_API_KEY")
            .map_err(|_| VoiceError::Config("TTS requires SPEECH_API_KEY".to_string()))?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());
        Self::new(base_url, api_key, model, voice)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }
}

impl SpeechSynthesizer for SpeechApiTts {
    fn synthesize(&self, text: &str) -> CallerResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| CallerError::Synthesis(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(CallerError::Synthesis(format!(
                "TTS API error {}: {}",
                status, body
            )));
        }
        let bytes = res
            .bytes()
            .map_err(|e| CallerError::Synthesis(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CallerError::Synthesis("TTS returned no audio".to_string()));
        }
        Ok(bytes.to_vec())
    }
}

/// Pick the best available TTS: the API backend when a key is configured,
/// otherwise the placeholder.
pub fn create_best_tts() -> Arc<dyn SpeechSynthesizer> {
    match SpeechApiTts::from_env() {
        Ok(tts) => Arc::new(tts),
        Err(_) => {
            info!("TTS: no SPEECH_API_KEY set, using placeholder");
            Arc::new(PlaceholderTts)
        }
    }
}
