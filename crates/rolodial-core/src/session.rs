//! **Session state machine** — the coordinating core of the caller.
//!
//! Tracks the single overall mode (idle/loading/reading/dialing/error),
//! serializes the speak-then-dial sequence, and routes voice or manual commands
//! to navigation and call actions. The dial intent never fires before the
//! utterance playback for that cycle has drained.
//!
//! Every externally triggered cycle captures the generation counter at entry;
//! reload, stop, and dismissal bump it, and a late synthesis or playback result
//! with a stale generation is discarded without touching state.

use crate::dial::{normalize_phone, tel_uri, DialIntent};
use crate::directory::{ContactRecord, DirectoryClient};
use crate::error::{CallerError, CallerResult};
use crate::speech::{PlaybackOutcome, SpeechSynthesizer, UtterancePlayer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The single overall mode. Exactly one value at a time; it gates which
/// commands are accepted and whether microphone frames are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Reading,
    Dialing,
    Error,
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Grace window after the dial intent fires, covering the OS handoff to
    /// the native dialer before the cursor advances and the session returns
    /// to idle (default 3s).
    pub dial_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dial_grace: Duration::from_secs(3),
        }
    }
}

/// The fixed utterance announcing one contact.
pub fn announce_text(contact: &ContactRecord) -> String {
    format!(
        "{}. {}. Subject: {}.",
        contact.relation, contact.person_name, contact.subject
    )
}

/// Point-in-time view of the session for UIs.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub cursor: usize,
    pub contact_count: usize,
    pub current: Option<ContactRecord>,
    pub last_error: Option<String>,
    /// When the current directory was installed; `None` until a load succeeds.
    pub loaded_at: Option<DateTime<Utc>>,
}

struct SessionInner {
    status: SessionStatus,
    contacts: Vec<ContactRecord>,
    cursor: usize,
    generation: u64,
    last_error: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
}

/// The caller session. One instance owns all mutable state (status, contact
/// list, cursor, generation) behind a single lock; commands from the keyboard
/// and the voice listener go through the same methods.
pub struct CallerSession {
    inner: Mutex<SessionInner>,
    synth: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn UtterancePlayer>,
    dialer: Arc<dyn DialIntent>,
    config: SessionConfig,
}

impl CallerSession {
    pub fn new(
        synth: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn UtterancePlayer>,
        dialer: Arc<dyn DialIntent>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                status: SessionStatus::Idle,
                contacts: Vec::new(),
                cursor: 0,
                generation: 0,
                last_error: None,
                loaded_at: None,
            }),
            synth,
            player,
            dialer,
            config,
        }
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let s = self.inner.lock().await;
        SessionSnapshot {
            status: s.status,
            cursor: s.cursor,
            contact_count: s.contacts.len(),
            current: s.contacts.get(s.cursor).cloned(),
            last_error: s.last_error.clone(),
            loaded_at: s.loaded_at,
        }
    }

    pub async fn current_contact(&self) -> Option<ContactRecord> {
        let s = self.inner.lock().await;
        s.contacts.get(s.cursor).cloned()
    }

    /// Fetch the directory and install it. Supersedes any in-flight cycle.
    pub async fn load_directory(
        &self,
        client: &DirectoryClient,
        source_url: &str,
    ) -> CallerResult<usize> {
        {
            let mut s = self.inner.lock().await;
            s.generation += 1;
            s.status = SessionStatus::Loading;
        }
        self.player.stop_all();
        self.complete_load(client.load(source_url).await).await
    }

    /// Apply the outcome of a directory fetch. On success the list is replaced
    /// wholesale and the cursor resets; on failure the previous list and
    /// cursor are left untouched and the session moves to the error state.
    pub async fn complete_load(
        &self,
        result: CallerResult<Vec<ContactRecord>>,
    ) -> CallerResult<usize> {
        let mut s = self.inner.lock().await;
        match result {
            Ok(contacts) => {
                let count = contacts.len();
                s.contacts = contacts;
                s.cursor = 0;
                s.loaded_at = Some(Utc::now());
                s.status = SessionStatus::Idle;
                s.last_error = None;
                info!("Session: directory ready with {} contacts", count);
                Ok(count)
            }
            Err(e) => {
                s.status = SessionStatus::Error;
                s.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Read the current contact aloud, then hand its number to the dialer.
    /// A start while not idle is a no-op, not a queue entry. After the dial
    /// grace window the cursor advances by one modulo the list length.
    pub async fn start_call(&self) -> CallerResult<()> {
        let Some((generation, contact)) = self.begin_reading().await else {
            return Ok(());
        };
        match self.run_utterance(generation, &contact).await? {
            None => return Ok(()), // superseded while speaking
            Some(PlaybackOutcome::Stopped) => {
                self.finish_reading(generation).await;
                return Ok(());
            }
            Some(PlaybackOutcome::Completed) => {}
        }
        let number = match normalize_phone(&contact.phone_number) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(generation, e).await),
        };
        {
            let mut s = self.inner.lock().await;
            if s.generation != generation || s.status != SessionStatus::Reading {
                return Ok(());
            }
            s.status = SessionStatus::Dialing;
        }
        info!("Session: dialing {}", number);
        if let Err(e) = self.dialer.dial(&tel_uri(&number)) {
            return Err(self.fail(generation, e).await);
        }
        tokio::time::sleep(self.config.dial_grace).await;
        let mut s = self.inner.lock().await;
        if s.generation == generation && s.status == SessionStatus::Dialing {
            s.cursor = (s.cursor + 1) % s.contacts.len().max(1);
            s.status = SessionStatus::Idle;
            debug!("Session: grace elapsed, cursor at {}", s.cursor);
        }
        Ok(())
    }

    /// Read the current contact aloud without dialing.
    pub async fn announce_current(&self) -> CallerResult<()> {
        let Some((generation, contact)) = self.begin_reading().await else {
            return Ok(());
        };
        if self.run_utterance(generation, &contact).await?.is_some() {
            self.finish_reading(generation).await;
        }
        Ok(())
    }

    /// Move the cursor forward one contact. Manual navigation does not speak.
    pub async fn next(&self) -> Option<ContactRecord> {
        self.shift(1).await
    }

    /// Move the cursor back one contact.
    pub async fn previous(&self) -> Option<ContactRecord> {
        self.shift(-1).await
    }

    /// Voice-driven navigation: interrupt any narration, move forward, and
    /// announce the newly selected contact.
    pub async fn advance_and_announce(&self) -> CallerResult<()> {
        self.stop_narration().await;
        if self.next().await.is_none() {
            return Ok(());
        }
        self.announce_current().await
    }

    /// Voice-driven navigation backwards, with announcement.
    pub async fn retreat_and_announce(&self) -> CallerResult<()> {
        self.stop_narration().await;
        if self.previous().await.is_none() {
            return Ok(());
        }
        self.announce_current().await
    }

    /// Kill all active playback and return to idle from reading or dialing.
    /// Supersedes the in-flight cycle; its late results are discarded.
    pub async fn stop_narration(&self) {
        {
            let mut s = self.inner.lock().await;
            s.generation += 1;
            if matches!(s.status, SessionStatus::Reading | SessionStatus::Dialing) {
                s.status = SessionStatus::Idle;
            }
        }
        self.player.stop_all();
    }

    /// User-initiated dismissal of the error state.
    pub async fn dismiss_error(&self) {
        let mut s = self.inner.lock().await;
        if s.status == SessionStatus::Error {
            s.generation += 1;
            s.status = SessionStatus::Idle;
            s.last_error = None;
        }
    }

    /// Surface a failure from outside the session (for example a denied
    /// microphone) as the error state. The rest of the app stays interactive.
    pub async fn report_error(&self, err: &CallerError) {
        self.player.stop_all();
        let mut s = self.inner.lock().await;
        s.generation += 1;
        s.status = SessionStatus::Error;
        s.last_error = Some(err.to_string());
    }

    async fn begin_reading(&self) -> Option<(u64, ContactRecord)> {
        let mut s = self.inner.lock().await;
        if s.status != SessionStatus::Idle {
            debug!("Session: start ignored in {:?}", s.status);
            return None;
        }
        if s.contacts.is_empty() {
            warn!("Session: start requested with no contacts loaded");
            return None;
        }
        s.status = SessionStatus::Reading;
        Some((s.generation, s.contacts[s.cursor].clone()))
    }

    /// Synthesize and play one utterance. `Ok(None)` means the cycle was
    /// superseded; errors have already moved the session to the error state.
    async fn run_utterance(
        &self,
        generation: u64,
        contact: &ContactRecord,
    ) -> CallerResult<Option<PlaybackOutcome>> {
        let text = announce_text(contact);
        debug!("Session: reading {:?}", text);
        let synth = Arc::clone(&self.synth);
        let audio = match tokio::task::spawn_blocking(move || synth.synthesize(&text)).await {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => return Err(self.fail(generation, e).await),
            Err(e) => {
                return Err(
                    self.fail(generation, CallerError::Synthesis(e.to_string()))
                        .await,
                )
            }
        };
        if self.is_stale(generation).await {
            return Ok(None);
        }
        if audio.is_empty() {
            return Ok(Some(PlaybackOutcome::Completed));
        }
        match self.player.play_to_end(audio).await {
            Ok(outcome) => {
                if self.is_stale(generation).await {
                    Ok(None)
                } else {
                    Ok(Some(outcome))
                }
            }
            Err(e) => Err(self.fail(generation, e).await),
        }
    }

    async fn finish_reading(&self, generation: u64) {
        let mut s = self.inner.lock().await;
        if s.generation == generation && s.status == SessionStatus::Reading {
            s.status = SessionStatus::Idle;
        }
    }

    async fn is_stale(&self, generation: u64) -> bool {
        self.inner.lock().await.generation != generation
    }

    /// Leave the cycle for the error state (unless already superseded),
    /// stopping any in-flight playback either way.
    async fn fail(&self, generation: u64, err: CallerError) -> CallerError {
        self.player.stop_all();
        let mut s = self.inner.lock().await;
        if s.generation == generation {
            s.status = SessionStatus::Error;
            s.last_error = Some(err.to_string());
        }
        err
    }

    async fn shift(&self, delta: isize) -> Option<ContactRecord> {
        let mut s = self.inner.lock().await;
        if s.contacts.is_empty() {
            return None;
        }
        let len = s.contacts.len() as isize;
        s.cursor = (s.cursor as isize + delta).rem_euclid(len) as usize;
        Some(s.contacts[s.cursor].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str) -> ContactRecord {
        ContactRecord {
            relation: "Family".into(),
            person_name: name.into(),
            subject: "Catch up".into(),
            phone_number: "+31612345678".into(),
        }
    }

    #[test]
    fn announce_template_uses_all_fields() {
        let text = announce_text(&contact("Anna"));
        assert!(text.contains("Family"));
        assert!(text.contains("Anna"));
        assert!(text.contains("Catch up"));
    }

    #[test]
    fn default_grace_is_three_seconds() {
        assert_eq!(SessionConfig::default().dial_grace, Duration::from_secs(3));
    }
}
