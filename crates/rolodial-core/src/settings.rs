//! Persisted settings: a single key-value store holding the CSV source URL.

use crate::error::CallerResult;
use sled::Db;
use std::path::Path;

const DEFAULT_STORE_PATH: &str = "./data/rolodial_settings";
const SOURCE_URL_KEY: &str = "directory_source_url";

/// Placeholder published-sheet URL used until the user configures their own.
pub const DEFAULT_SOURCE_URL: &str =
    "https://docs.google.com/spreadsheets/d/e/YOUR-SHEET-ID/pub?output=csv";

/// Sled-backed settings store. The only persisted value is the directory
/// source URL under a fixed key.
pub struct SettingsStore {
    db: Db,
}

impl SettingsStore {
    /// Opens or creates the store at `ROLODIAL_DATA_DIR` (or `./data/rolodial_settings`).
    pub fn open_default() -> CallerResult<Self> {
        let path = std::env::var("ROLODIAL_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
        Self::open(path)
    }

    /// Opens or creates the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> CallerResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// The configured source URL, or the placeholder default when unset.
    pub fn source_url(&self) -> CallerResult<String> {
        let value = self.db.get(SOURCE_URL_KEY)?;
        Ok(value
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()))
    }

    /// Persist a new source URL.
    pub fn set_source_url(&self, url: &str) -> CallerResult<()> {
        self.db.insert(SOURCE_URL_KEY, url.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}
