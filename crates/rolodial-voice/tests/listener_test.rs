//! Listener integration tests: scripted tool calls drive the caller session,
//! every call is acknowledged, frames forward only while idle, and a server
//! interrupt kills in-flight narration.

use async_trait::async_trait;
use rolodial_core::{
    CallerResult, CallerSession, ContactRecord, DialIntent, MutePlayer, PlaybackOutcome,
    SessionConfig, SessionStatus, SpeechSynthesizer, UtterancePlayer,
};
use rolodial_voice::{
    AudioFrame, CommandIntent, CommandListener, ListenerConfig, LiveCommandSession, LiveEvent,
    PlaceholderTts, ScriptedSession, ToolAck, VoiceResult,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

struct RecordingDialer {
    uris: Mutex<Vec<String>>,
}

impl RecordingDialer {
    fn new() -> Self {
        Self {
            uris: Mutex::new(Vec::new()),
        }
    }
}

impl DialIntent for RecordingDialer {
    fn dial(&self, tel_uri: &str) -> CallerResult<()> {
        self.uris.lock().unwrap().push(tel_uri.to_string());
        Ok(())
    }
}

fn contacts(n: usize) -> Vec<ContactRecord> {
    (0..n)
        .map(|i| ContactRecord {
            relation: "Friend".into(),
            person_name: format!("Contact {}", i),
            subject: "Hello".into(),
            phone_number: format!("+3161234567{}", i),
        })
        .collect()
}

fn frame() -> AudioFrame {
    AudioFrame {
        samples: vec![0.0; 480],
        captured_at: Instant::now(),
    }
}

async fn seeded_caller(
    synth: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn UtterancePlayer>,
    dialer: Arc<RecordingDialer>,
    n: usize,
) -> Arc<CallerSession> {
    let caller = Arc::new(CallerSession::new(
        synth,
        player,
        dialer,
        SessionConfig {
            dial_grace: Duration::from_millis(10),
        },
    ));
    caller.complete_load(Ok(contacts(n))).await.unwrap();
    caller
}

async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn scripted_tool_calls_drive_the_caller_and_get_acked() {
    let dialer = Arc::new(RecordingDialer::new());
    let caller = seeded_caller(
        Arc::new(PlaceholderTts),
        Arc::new(MutePlayer),
        Arc::clone(&dialer),
        3,
    )
    .await;

    let session = ScriptedSession::new(vec![
        LiveEvent::ToolCall {
            id: "t1".into(),
            intent: CommandIntent::Advance,
        },
        LiveEvent::ToolCall {
            id: "t2".into(),
            intent: CommandIntent::CallCurrent,
        },
        LiveEvent::Closed,
    ]);
    let acks = Arc::clone(&session.acks);

    let listener = CommandListener::new(
        Arc::clone(&caller),
        ListenerConfig {
            auto_announce: false,
        },
    );
    // Keep the mic channel open but silent so only events drive the loop.
    let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
    listener.run(session, frame_rx).await.unwrap();

    // Advance moved the cursor to 1; the call dialed it and auto-advanced to 2.
    wait_for(|| async {
        let snap = caller.snapshot().await;
        snap.cursor == 2 && snap.status == SessionStatus::Idle
    })
    .await;

    assert_eq!(
        dialer.uris.lock().unwrap().as_slice(),
        ["tel:+31612345671"]
    );
    assert_eq!(
        acks.lock().unwrap().as_slice(),
        [
            ("t1".to_string(), ToolAck::Done),
            ("t2".to_string(), ToolAck::Done)
        ]
    );
}

#[tokio::test]
async fn commands_against_an_empty_directory_are_refused() {
    let dialer = Arc::new(RecordingDialer::new());
    let caller = Arc::new(CallerSession::new(
        Arc::new(PlaceholderTts),
        Arc::new(MutePlayer),
        Arc::<RecordingDialer>::clone(&dialer),
        SessionConfig {
            dial_grace: Duration::from_millis(10),
        },
    ));

    let session = ScriptedSession::new(vec![
        LiveEvent::ToolCall {
            id: "t1".into(),
            intent: CommandIntent::CallCurrent,
        },
        LiveEvent::Closed,
    ]);
    let acks = Arc::clone(&session.acks);

    let listener = CommandListener::new(Arc::clone(&caller), ListenerConfig::default());
    let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
    listener.run(session, frame_rx).await.unwrap();

    let acks = acks.lock().unwrap();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].0, "t1");
    assert!(matches!(acks[0].1, ToolAck::Failed(_)));
    assert!(dialer.uris.lock().unwrap().is_empty());
    assert_eq!(caller.status().await, SessionStatus::Idle);
}

/// Session double that closes once the expected number of frames arrived.
struct FrameCountingSession {
    seen: Arc<Mutex<Vec<usize>>>,
    close_after: usize,
}

#[async_trait]
impl LiveCommandSession for FrameCountingSession {
    async fn send_frame(&mut self, frame: AudioFrame) -> VoiceResult<()> {
        self.seen.lock().unwrap().push(frame.samples.len());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<LiveEvent> {
        loop {
            if self.seen.lock().unwrap().len() >= self.close_after {
                return Some(LiveEvent::Closed);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn ack_tool(&mut self, _id: &str, _ack: ToolAck) -> VoiceResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn frames_are_forwarded_while_idle() {
    let dialer = Arc::new(RecordingDialer::new());
    let caller = seeded_caller(
        Arc::new(PlaceholderTts),
        Arc::new(MutePlayer),
        dialer,
        1,
    )
    .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let session = FrameCountingSession {
        seen: Arc::clone(&seen),
        close_after: 2,
    };

    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    frame_tx.send(frame()).unwrap();
    frame_tx.send(frame()).unwrap();

    let listener = CommandListener::new(caller, ListenerConfig::default());
    listener.run(session, frame_rx).await.unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), [480, 480]);
}

/// Synthesizer that produces non-empty audio so playback actually runs.
struct BeepSynth;

impl SpeechSynthesizer for BeepSynth {
    fn synthesize(&self, _text: &str) -> CallerResult<Vec<u8>> {
        Ok(vec![1; 16])
    }
}

/// Player that holds every utterance until `stop_all` fires.
struct HoldingPlayer {
    stop: Notify,
}

#[async_trait]
impl UtterancePlayer for HoldingPlayer {
    async fn play_to_end(&self, _audio: Vec<u8>) -> CallerResult<PlaybackOutcome> {
        self.stop.notified().await;
        Ok(PlaybackOutcome::Stopped)
    }

    fn stop_all(&self) {
        self.stop.notify_waiters();
    }

    fn is_playing(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn server_interrupt_stops_in_flight_narration() {
    let dialer = Arc::new(RecordingDialer::new());
    let caller = seeded_caller(
        Arc::new(BeepSynth),
        Arc::new(HoldingPlayer {
            stop: Notify::new(),
        }),
        Arc::clone(&dialer),
        2,
    )
    .await;

    let reading = {
        let caller = Arc::clone(&caller);
        tokio::spawn(async move { caller.start_call().await })
    };
    wait_for(|| async { caller.status().await == SessionStatus::Reading }).await;

    let session = ScriptedSession::new(vec![LiveEvent::Interrupted, LiveEvent::Closed]);
    let listener = CommandListener::new(Arc::clone(&caller), ListenerConfig::default());
    let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
    listener.run(session, frame_rx).await.unwrap();

    reading.await.unwrap().unwrap();
    assert_eq!(caller.status().await, SessionStatus::Idle);
    assert!(dialer.uris.lock().unwrap().is_empty());
    assert_eq!(caller.snapshot().await.cursor, 0);
}
