//! # Rolodial Voice
//!
//! The audio side of the hands-free caller: microphone capture, VAD and
//! gap-based turn detection, STT/TTS over OpenAI-compatible APIs, rodio
//! playback with the interruption kill-switch, and the command listener that
//! turns spoken commands into caller-session actions.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Command Listener                      │
//! │  ┌─────────┐   ┌───────────┐   ┌──────────────────┐   │
//! │  │ Mic In  │ → │ VAD +     │ → │ STT → intent     │   │
//! │  │ (cpal)  │   │ gap turns │   │ (tool calls)     │   │
//! │  └─────────┘   └───────────┘   └──────────────────┘   │
//! │       ↓ gated by session status          ↓             │
//! │  ┌─────────┐                    ┌──────────────────┐   │
//! │  │ Speaker │ ←──────────────────│ Caller session   │   │
//! │  │ (rodio) │    stop-all        │ actions          │   │
//! │  └─────────┘                    └──────────────────┘   │
//! └────────────────────────────────────────────────────────┘
//! ```

pub mod capture;
pub mod error;
pub mod intent;
pub mod listener;
pub mod playback;
pub mod speech;
pub mod transcribe;
pub mod turns;
pub mod vad;

pub use capture::{AudioFrame, FrameConfig, MicCapture};
pub use error::{VoiceError, VoiceResult};
pub use intent::CommandIntent;
pub use listener::{
    forwarding_allowed, CommandListener, ListenerConfig, LiveCommandSession, LiveEvent,
    ScriptedSession, ToolAck, TurnCommandSession,
};
pub use playback::VoicePlayback;
pub use speech::{create_best_tts, PlaceholderTts, SpeechApiTts};
pub use transcribe::{create_best_stt, PlaceholderStt, SpeechApiStt, SttBackend};
pub use turns::{CommandTurn, TurnConfig, TurnDetector};
pub use vad::{SpeechDetector, VadConfig};
