//! Rodio-backed utterance playback with the active-handle set.
//!
//! The `OutputStream` is not `Send`, so it lives on a dedicated keeper thread;
//! sinks are created from the (sendable) stream handle. Each utterance gets
//! its own sink registered in the active set, and `stop_all` kills and clears
//! every registered handle, tolerant of handles that already drained.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use rodio::{OutputStreamHandle, Sink, Source};
use rolodial_core::{CallerError, CallerResult, PlaybackOutcome, UtterancePlayer};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info};

struct ActiveHandle {
    sink: Sink,
    killed: AtomicBool,
}

/// Playback over the default output device.
pub struct VoicePlayback {
    handle: OutputStreamHandle,
    active: Mutex<Vec<Arc<ActiveHandle>>>,
    shutdown: Arc<AtomicBool>,
    keeper: Option<JoinHandle<()>>,
}

impl VoicePlayback {
    pub fn new() -> VoiceResult<Self> {
        let (tx, rx) = std::sync::mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&shutdown);
        let keeper = std::thread::spawn(move || {
            match rodio::OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = tx.send(Ok(handle));
                    // The stream must outlive every sink; park until shutdown.
                    while !stop_flag.load(Ordering::Relaxed) {
                        std::thread::park();
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = tx.send(Err(VoiceError::Playback(e.to_string())));
                }
            }
        });
        let handle = rx
            .recv()
            .map_err(|e| VoiceError::Playback(e.to_string()))??;
        info!("Playback: output device ready");
        Ok(Self {
            handle,
            active: Mutex::new(Vec::new()),
            shutdown,
            keeper: Some(keeper),
        })
    }
}

#[async_trait]
impl UtterancePlayer for VoicePlayback {
    async fn play_to_end(&self, audio: Vec<u8>) -> CallerResult<PlaybackOutcome> {
        if audio.is_empty() {
            return Ok(PlaybackOutcome::Completed);
        }
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| CallerError::Playback(e.to_string()))?;
        let source = rodio::Decoder::new(Cursor::new(audio))
            .map_err(|e| CallerError::Playback(format!("decode failed: {}", e)))?;
        sink.append(source.convert_samples::<f32>());

        let entry = Arc::new(ActiveHandle {
            sink,
            killed: AtomicBool::new(false),
        });
        self.active.lock().unwrap().push(Arc::clone(&entry));

        let waiter = Arc::clone(&entry);
        tokio::task::spawn_blocking(move || waiter.sink.sleep_until_end())
            .await
            .map_err(|e| CallerError::Playback(e.to_string()))?;

        self.active
            .lock()
            .unwrap()
            .retain(|h| !Arc::ptr_eq(h, &entry));
        if entry.killed.load(Ordering::SeqCst) {
            debug!("Playback: utterance stopped mid-flight");
            Ok(PlaybackOutcome::Stopped)
        } else {
            Ok(PlaybackOutcome::Completed)
        }
    }

    fn stop_all(&self) {
        let mut active = self.active.lock().unwrap();
        if active.is_empty() {
            return;
        }
        debug!("Playback: stopping {} active handle(s)", active.len());
        for handle in active.drain(..) {
            handle.killed.store(true, Ordering::SeqCst);
            handle.sink.stop();
        }
    }

    fn is_playing(&self) -> bool {
        self.active
            .lock()
            .unwrap()
            .iter()
            .any(|h| !h.sink.empty())
    }
}

impl Drop for VoicePlayback {
    fn drop(&mut self) {
        self.stop_all();
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(keeper) = self.keeper.take() {
            keeper.thread().unpark();
            let _ = keeper.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires an output device.
    async fn empty_audio_completes_immediately() {
        let playback = VoicePlayback::new().unwrap();
        let outcome = playback.play_to_end(Vec::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert!(!playback.is_playing());
    }

    #[tokio::test]
    #[ignore] // Requires an output device.
    async fn stop_all_with_no_handles_is_harmless() {
        let playback = VoicePlayback::new().unwrap();
        playback.stop_all();
        playback.stop_all();
    }
}
