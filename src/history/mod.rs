//! Bounded report history.
//!
//! The history is a single JSON list stored under one key of a
//! [`RecordStore`], ordered oldest to newest and capped at a fixed capacity.
//! Every mutation reads the whole list, changes it, and writes the whole
//! list back. If any step fails the stored list is left as it was and the
//! error is returned; callers log it and carry on.

pub mod store;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{FileStore, MemoryStore, RecordStore};

/// Default number of reports kept.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default storage key.
pub const DEFAULT_KEY: &str = "contractReports";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One persisted analysis report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Time-based unique token; doubles as the card's node id.
    pub id: String,
    /// Uploaded file name, or a generic analysis title.
    pub title: String,
    /// Server-supplied HTML fragment, stored verbatim.
    pub html: String,
    #[serde(rename = "createdAt", alias = "date", alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        html: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            html: html.into(),
            created_at,
        }
    }
}

/// Generate a report id of the form `report-{unix_millis}`.
///
/// If that id is already `taken`, the millisecond component is bumped until
/// it is free, so two reports created within the same millisecond still get
/// distinct ids.
pub fn generate_report_id(now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    let mut millis = now.timestamp_millis();
    loop {
        let id = format!("report-{millis}");
        if !taken(&id) {
            return id;
        }
        millis += 1;
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ReportHistory<S> {
    store: S,
    key: String,
    capacity: usize,
}

impl<S: RecordStore> ReportHistory<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, DEFAULT_KEY, DEFAULT_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_settings(store: S, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            store,
            key: key.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read every stored record, oldest first.
    ///
    /// A missing key is an empty history; a malformed list is an error.
    pub fn load(&self) -> Result<Vec<ReportRecord>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() || raw.trim() == "null" {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed report history under '{}'", self.key))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.load()?.iter().any(|r| r.id == id))
    }

    /// Append a record as the newest entry.
    ///
    /// A record with the same id is replaced rather than duplicated. When the
    /// list grows past capacity the oldest entries are evicted. Returns the
    /// evicted records.
    pub fn push(&mut self, record: ReportRecord) -> Result<Vec<ReportRecord>> {
        let mut records = self.load()?;
        records.retain(|r| r.id != record.id);
        records.push(record);

        let excess = records.len().saturating_sub(self.capacity);
        let evicted: Vec<ReportRecord> = records.drain(..excess).collect();

        self.save(&records)?;
        Ok(evicted)
    }

    /// Remove one record. Returns `false` (and writes nothing) if the id is
    /// not stored.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }

    /// Delete the whole history key.
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.key)
    }

    fn save(&mut self, records: &[ReportRecord]) -> Result<()> {
        let json = serde_json::to_string(records).context("failed to serialize report history")?;
        self.store.set(&self.key, &json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
