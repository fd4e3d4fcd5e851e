//! Rolodial CLI: hands-free contact calling from a published spreadsheet.
//!
//! Usage:
//!   cargo run -p rolodial-app -- [--url URL] [--grace N] [--no-voice] [--no-announce]
//!
//! Loads the contact directory from the stored CSV URL, narrates the selected
//! contact over TTS, and dials via the platform opener. With a working
//! microphone the voice pipeline accepts "next", "previous" and "call";
//! the keyboard commands below always work.

use rolodial_core::{
    CallerError, CallerSession, DirectoryClient, MutePlayer, SessionConfig, SettingsStore,
    SystemDialer, UtterancePlayer,
};
use rolodial_voice::{
    create_best_stt, create_best_tts, CommandListener, FrameConfig, ListenerConfig, MicCapture,
    TurnCommandSession, TurnConfig, VadConfig, VoicePlayback, VoiceResult,
};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut url_override: Option<String> = None;
    let mut grace_secs: u64 = 3;
    let mut voice = true;
    let mut announce = true;
    let mut show_usage = false;

    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--url" => url_override = args.next(),
            "--grace" => {
                if let Some(g) = args.next() {
                    grace_secs = g.parse().unwrap_or(3);
                }
            }
            "--no-voice" => voice = false,
            "--no-announce" => announce = false,
            "--help" | "-h" => show_usage = true,
            _ => {}
        }
    }

    if show_usage {
        eprintln!("Rolodial — hands-free contact caller");
        eprintln!("  --url URL        Set and persist the directory CSV URL");
        eprintln!("  --grace N        Seconds between dial and auto-advance (default 3)");
        eprintln!("  --no-voice       Keyboard commands only, no microphone");
        eprintln!("  --no-announce    Voice navigation moves silently");
        eprintln!();
        eprintln!("Requires SPEECH_API_URL and SPEECH_API_KEY for real speech (else placeholder).");
        eprintln!("Settings DB: ROLODIAL_DATA_DIR or ./data/rolodial");
        return Ok(());
    }

    let settings = SettingsStore::open_default()?;
    if let Some(url) = url_override {
        settings.set_source_url(&url)?;
    }
    let source_url = settings.source_url()?;

    let synth = create_best_tts();
    let player: Arc<dyn UtterancePlayer> = match VoicePlayback::new() {
        Ok(p) => Arc::new(p),
        Err(e) => {
            warn!("Rolodial: no audio output ({}), narration muted", e);
            Arc::new(MutePlayer)
        }
    };
    let caller = Arc::new(CallerSession::new(
        synth,
        player,
        Arc::new(SystemDialer),
        SessionConfig {
            dial_grace: Duration::from_secs(grace_secs),
        },
    ));

    let client = DirectoryClient::new();
    match caller.load_directory(&client, &source_url).await {
        Ok(n) => info!("Rolodial: loaded {} contacts from {}", n, source_url),
        Err(e) => warn!("Rolodial: directory load failed: {}", e),
    }

    // The capture stream must outlive the loop; dropping it stops the mic.
    let mut _mic_stream: Option<cpal::Stream> = None;
    if voice {
        match start_voice(Arc::clone(&caller), announce) {
            Ok(stream) => {
                _mic_stream = Some(stream);
                info!("Rolodial: voice commands active (say next / previous / call)");
            }
            Err(e) => {
                warn!("Rolodial: voice pipeline unavailable: {}", e);
                caller.report_error(&CallerError::from(e)).await;
            }
        }
    }

    println!("Commands: n=next  p=previous  c=call  s=stop  r=reload  d=dismiss  u URL=set source  q=quit");
    print_snapshot(&caller).await;

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        let (cmd, rest) = input.split_once(' ').unwrap_or((input, ""));
        match cmd {
            "n" => {
                if let Err(e) = caller.advance_and_announce().await {
                    warn!("Rolodial: announce failed: {}", e);
                }
            }
            "p" => {
                if let Err(e) = caller.retreat_and_announce().await {
                    warn!("Rolodial: announce failed: {}", e);
                }
            }
            "c" => {
                let caller = Arc::clone(&caller);
                tokio::spawn(async move {
                    if let Err(e) = caller.start_call().await {
                        warn!("Rolodial: call failed: {}", e);
                    }
                });
            }
            "s" => caller.stop_narration().await,
            "r" => match caller.load_directory(&client, &settings.source_url()?).await {
                Ok(n) => info!("Rolodial: reloaded {} contacts", n),
                Err(e) => warn!("Rolodial: reload failed: {}", e),
            },
            "d" => caller.dismiss_error().await,
            "u" => {
                if rest.is_empty() {
                    println!("source url: {}", settings.source_url()?);
                } else {
                    settings.set_source_url(rest)?;
                    match caller.load_directory(&client, rest).await {
                        Ok(n) => info!("Rolodial: loaded {} contacts from {}", n, rest),
                        Err(e) => warn!("Rolodial: load failed: {}", e),
                    }
                }
            }
            "q" => break,
            "" => {}
            _ => println!(
                "Commands: n=next  p=previous  c=call  s=stop  r=reload  d=dismiss  u URL=set source  q=quit"
            ),
        }
        print_snapshot(&caller).await;
    }

    info!("Rolodial: done");
    Ok(())
}

/// Wire mic capture -> local turn detection -> command listener.
fn start_voice(caller: Arc<CallerSession>, auto_announce: bool) -> VoiceResult<cpal::Stream> {
    let (frame_tx, frame_rx) = tokio::sync::mpsc::unbounded_channel();
    let stream = MicCapture::new(FrameConfig::default())?.start(frame_tx)?;

    let session = TurnCommandSession::start(
        create_best_stt(),
        VadConfig::default(),
        TurnConfig::default(),
    )?;
    let listener = CommandListener::new(caller, ListenerConfig { auto_announce });
    tokio::spawn(async move {
        if let Err(e) = listener.run(session, frame_rx).await {
            warn!("Rolodial: listener stopped: {}", e);
        }
    });
    Ok(stream)
}

async fn print_snapshot(caller: &CallerSession) {
    let snap = caller.snapshot().await;
    match snap.current {
        Some(c) => println!(
            "[{:?}] {}/{}  {} ({})",
            snap.status,
            snap.cursor + 1,
            snap.contact_count,
            c.person_name,
            c.phone_number
        ),
        None => println!("[{:?}] no contacts", snap.status),
    }
    if let Some(err) = snap.last_error {
        println!("  error: {}", err);
    }
}
