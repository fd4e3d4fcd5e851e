//! Speech-to-text backends: convert a committed [`CommandTurn`] into text.

use crate::error::{VoiceError, VoiceResult};
use crate::turns::CommandTurn;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Backend for converting PCM turns to text. Empty string means nothing was
/// recognized.
pub trait SttBackend: Send + Sync {
    fn transcribe(&self, turn: &CommandTurn) -> VoiceResult<String>;
}

/// Encode f32 PCM (mono) to 16-bit WAV bytes for API upload.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&i.to_le_bytes());
    }
    buf
}

/// Placeholder STT: returns a fixed reply (default empty, so no command ever
/// fires). Use for wiring tests without an API key.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub reply: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn transcribe(&self, _turn: &CommandTurn) -> VoiceResult<String> {
        Ok(self.reply.clone().unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct Transcription {
    text: String,
}

/// Production STT over an OpenAI-compatible transcription API.
/// Configured by `SPEECH_API_URL`, `SPEECH_API_KEY`, and `STT_MODEL`.
#[derive(Debug, Clone)]
pub struct SpeechApiStt {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Transcription model (default whisper-1).
    pub model: String,
    client: reqwest::blocking::Client,
}

impl SpeechApiStt {
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("SPEECH_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("SPEECH_API_KEY")
            .map_err(|_| VoiceError::Config("STT requires SPEECH_API_KEY".to_string()))?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

impl SttBackend for SpeechApiStt {
    fn transcribe(&self, turn: &CommandTurn) -> VoiceResult<String> {
        if turn.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = pcm_f32_to_wav(&turn.samples, turn.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("turn.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let parsed: Transcription = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }
}

/// Pick the best available STT: the API backend when a key is configured,
/// otherwise the placeholder.
pub fn create_best_stt() -> Arc<dyn SttBackend> {
    match SpeechApiStt::from_env() {
        Ok(stt) => Arc::new(stt),
        Err(_) => {
            info!("STT: no SPEECH_API_KEY set, using placeholder");
            Arc::new(PlaceholderStt::new())
        }
    }
}
