//! Phone number normalization and the platform dial intent.

use crate::error::{CallerError, CallerResult};
use tracing::info;

/// Strip a phone number to dialable digits plus an optional leading `+`.
/// Parenthesized groups carry non-dialable digits (the `(0)` trunk prefix in
/// `"+31 (0)6-12345678"`) and are dropped wholesale: the result is
/// `"+31612345678"`.
pub fn normalize_phone(raw: &str) -> CallerResult<String> {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    let mut depth = 0usize;
    for c in trimmed.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && c.is_ascii_digit() => out.push(c),
            _ => {}
        }
    }
    if out.is_empty() || out == "+" {
        return Err(CallerError::Dial(format!("no digits in {:?}", raw)));
    }
    Ok(out)
}

/// Build the `tel:` URI for an already-normalized number.
pub fn tel_uri(normalized: &str) -> String {
    format!("tel:{}", normalized)
}

/// Hands a `tel:` URI to the platform. Implementations must be cheap to call
/// and synchronous; the session sequences them after playback completes.
pub trait DialIntent: Send + Sync {
    fn dial(&self, tel_uri: &str) -> CallerResult<()>;
}

/// Dialer that invokes the OS opener on the `tel:` URI, handing off to
/// whatever telephony app the platform registers for the scheme.
#[derive(Debug, Default)]
pub struct SystemDialer;

impl DialIntent for SystemDialer {
    fn dial(&self, tel_uri: &str) -> CallerResult<()> {
        info!("Dialer: opening {}", tel_uri);
        spawn_opener(tel_uri).map_err(|e| CallerError::Dial(e.to_string()))?;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn spawn_opener(uri: &str) -> std::io::Result<()> {
    std::process::Command::new("xdg-open").arg(uri).spawn()?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn spawn_opener(uri: &str) -> std::io::Result<()> {
    std::process::Command::new("open").arg(uri).spawn()?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn spawn_opener(uri: &str) -> std::io::Result<()> {
    std::process::Command::new("cmd")
        .args(["/C", "start", "", uri])
        .spawn()?;
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn spawn_opener(_uri: &str) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no opener for this platform",
    ))
}
