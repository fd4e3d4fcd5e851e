//! Error types for the voice stack.

use rolodial_core::CallerError;
use thiserror::Error;

/// Result type alias for voice operations.
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by capture, detection, transcription, synthesis, or playback.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::DevicesError> for VoiceError {
    fn from(err: cpal::DevicesError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for VoiceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for VoiceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for VoiceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}

/// Map voice failures onto the caller's error taxonomy. Device and stream
/// faults present to the user as "microphone unavailable".
impl From<VoiceError> for CallerError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::AudioDevice(m) | VoiceError::AudioStream(m) => {
                CallerError::MicrophoneDenied(m)
            }
            VoiceError::Playback(m) => CallerError::Playback(m),
            VoiceError::Tts(m) => CallerError::Synthesis(m),
            VoiceError::Config(m) => CallerError::Config(m),
            VoiceError::Stt(m) | VoiceError::ChannelSend(m) => CallerError::Internal(m),
            VoiceError::Io(e) => CallerError::Io(e),
        }
    }
}
