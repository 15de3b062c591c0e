//! Activity log: one JSON line per notable panel event.
//!
//! Records probes, uploads, analysis results and storage failures so a user
//! can see what happened after the fact (`inspector log`). Writing is
//! best-effort: a failure to log never interrupts the panel flow.
//!
//! Log file: `~/.inspector/activity.jsonl`

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config;

// Off in unit tests so they never write to the real data directory.
static ENABLED: AtomicBool = AtomicBool::new(!cfg!(test));

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single line in `activity.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub level: Level,
    /// Subsystem that produced the entry: `monitor`, `panel`, `history`, `web`.
    pub component: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Logging functions
// ---------------------------------------------------------------------------

/// Turn the activity log on or off for this process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn info(component: &str, message: impl Into<String>) {
    log(Level::Info, component, message);
}

pub fn warn(component: &str, message: impl Into<String>) {
    log(Level::Warn, component, message);
}

pub fn error(component: &str, message: impl Into<String>) {
    log(Level::Error, component, message);
}

/// Append an entry. Silently ignores I/O failures.
pub fn log(level: Level, component: &str, message: impl Into<String>) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let entry = ActivityEntry {
        timestamp: Utc::now().to_rfc3339(),
        level,
        component: component.to_string(),
        message: message.into(),
    };

    let _ = append_entry(&entry);
}

// ---------------------------------------------------------------------------
// Reading entries
// ---------------------------------------------------------------------------

/// Read the last `limit` entries, oldest first.
///
/// Malformed lines are skipped. Returns an empty vec if the file does not
/// exist or cannot be read.
pub fn read_recent(limit: usize) -> Vec<ActivityEntry> {
    let Some(path) = activity_log_path() else {
        return Vec::new();
    };

    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    let entries: Vec<ActivityEntry> = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
        .collect();

    let skip = entries.len().saturating_sub(limit);
    entries.into_iter().skip(skip).collect()
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_entry(entry: &ActivityEntry) -> Result<()> {
    let Some(path) = activity_log_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Return the path to the activity log file.
pub fn activity_log_path() -> Option<PathBuf> {
    config::data_dir().map(|dir| dir.join("activity.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
