//! Error types for the Rolodial caller.

use thiserror::Error;

/// Result type alias for caller operations.
pub type CallerResult<T> = Result<T, CallerError>;

/// Errors surfaced by the caller. Each maps to a single user-visible message;
/// none are retried automatically and none are fatal to the process.
#[derive(Error, Debug)]
pub enum CallerError {
    #[error("Directory fetch failed: {0}")]
    Network(String),

    #[error("Directory contains no usable contacts")]
    EmptyDirectory,

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Microphone unavailable: {0}")]
    MicrophoneDenied(String),

    #[error("Dial intent failed: {0}")]
    Dial(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings store error: {0}")]
    Store(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<reqwest::Error> for CallerError {
    fn from(err: reqwest::Error) -> Self {
        CallerError::Network(err.to_string())
    }
}
