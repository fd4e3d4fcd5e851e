//! Trait seams between the session and the audio stack.
//!
//! The session never touches an audio device directly: it synthesizes through
//! [`SpeechSynthesizer`] and plays through [`UtterancePlayer`]. Backends live in
//! the voice crate; tests substitute recording doubles.

use crate::error::CallerResult;
use async_trait::async_trait;

/// Backend that turns text into encoded audio bytes (WAV/MP3).
/// Empty bytes mean "nothing to play" and the utterance completes immediately.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> CallerResult<Vec<u8>>;
}

/// How a single utterance playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The utterance drained to the end.
    Completed,
    /// Playback was killed mid-utterance by `stop_all`.
    Stopped,
}

/// Owns the single speaker output channel and the set of in-flight playback
/// handles. `stop_all` must tolerate handles that already finished.
#[async_trait]
pub trait UtterancePlayer: Send + Sync {
    /// Play the encoded audio and resolve once it drains or is stopped.
    async fn play_to_end(&self, audio: Vec<u8>) -> CallerResult<PlaybackOutcome>;

    /// Stop every active handle and clear the set.
    fn stop_all(&self);

    /// Whether any handle still has queued samples.
    fn is_playing(&self) -> bool;
}

/// Player that discards audio and completes immediately. Used when no output
/// device is available and in tests.
#[derive(Debug, Default)]
pub struct MutePlayer;

#[async_trait]
impl UtterancePlayer for MutePlayer {
    async fn play_to_end(&self, _audio: Vec<u8>) -> CallerResult<PlaybackOutcome> {
        Ok(PlaybackOutcome::Completed)
    }

    fn stop_all(&self) {}

    fn is_playing(&self) -> bool {
        false
    }
}
