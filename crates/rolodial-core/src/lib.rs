//! # Rolodial Core
//!
//! Domain logic for the hands-free contact caller: the contact directory
//! loaded from a published-spreadsheet CSV, the session state machine that
//! serializes the speak-then-dial sequence, the persisted settings store, and
//! the platform dial intent. Audio backends live in `rolodial-voice` and plug
//! in through the trait seams in [`speech`].
//!
//! ```text
//! CSV over HTTP -> Directory -> CallerSession -> SpeechSynthesizer
//!                                   |                 |
//!                                   v                 v
//!                              DialIntent       UtterancePlayer
//! ```

pub mod dial;
pub mod directory;
pub mod error;
pub mod session;
pub mod settings;
pub mod speech;

pub use dial::{normalize_phone, tel_uri, DialIntent, SystemDialer};
pub use directory::{parse_directory, ContactRecord, DirectoryClient};
pub use error::{CallerError, CallerResult};
pub use session::{
    announce_text, CallerSession, SessionConfig, SessionSnapshot, SessionStatus,
};
pub use settings::{SettingsStore, DEFAULT_SOURCE_URL};
pub use speech::{MutePlayer, PlaybackOutcome, SpeechSynthesizer, UtterancePlayer};
