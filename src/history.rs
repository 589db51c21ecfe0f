//! Persistent fishing history

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::autofish::AttemptRecord;
use crate::session::SessionOutcome;
use crate::utils::path::get_data_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatchSource {
    Manual,
    Autofish,
}

/// Log entry for one fishing attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchLogEntry {
    pub timestamp: String,
    #[serde(rename = "catch")]
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fish_type: Option<String>,
    pub source: CatchSource,
}

impl CatchLogEntry {
    /// Entry for a resolved manual session
    pub fn from_outcome(outcome: &SessionOutcome) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            status: outcome.is_success(),
            fish_type: outcome.fish().map(|f| f.id.clone()),
            source: CatchSource::Manual,
        }
    }

    /// Entry for one autofish attempt
    pub fn from_attempt(record: &AttemptRecord) -> Self {
        Self {
            timestamp: record.timestamp.to_rfc3339(),
            status: record.success,
            fish_type: record.fish.as_ref().map(|f| f.id.clone()),
            source: CatchSource::Autofish,
        }
    }
}

/// Default history file
pub fn history_path() -> PathBuf {
    get_data_dir().join("logs").join("fishing_log.json")
}

/// Load history, empty when missing or unreadable
pub fn load_history(path: &Path) -> Vec<CatchLogEntry> {
    fs::read_to_string(path)
        .ok()
        .and_then(|c| serde_json::from_str(&c).ok())
        .unwrap_or_default()
}

/// Append an entry. Best effort: write failures are ignored.
pub fn log_catch(path: &Path, entry: CatchLogEntry) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut data = load_history(path);
    data.push(entry);

    if let Ok(content) = serde_json::to_string_pretty(&data) {
        if let Err(e) = fs::write(path, content) {
            tracing::debug!("[HISTORY] Could not write {:?}: {}", path, e);
        }
    }
}
