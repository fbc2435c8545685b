//! Bounded ingestion event log
//!
//! Append-only from the caller's perspective, size-bounded on disk: the file
//! always holds the newest `retention` events. Rewrites go through a temp
//! file and rename so observers never read a torn log.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Outcome of one ingestion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Success,
    Error,
}

/// A record of one ingestion attempt, kept for external observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionEvent {
    pub title: String,
    pub url: String,
    pub outcome: EventOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl IngestionEvent {
    pub fn success(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            outcome: EventOutcome::Success,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(title: &str, url: &str, detail: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            outcome: EventOutcome::Error,
            error: Some(detail.to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// Persisted, size-bounded event log
pub struct EventLog {
    path: PathBuf,
    retention: usize,
}

impl EventLog {
    pub fn new(path: PathBuf, retention: usize) -> Self {
        Self {
            path,
            retention: retention.max(1),
        }
    }

    /// Append an event, evicting the oldest entries beyond the retention cap
    pub fn append(&self, event: IngestionEvent) -> Result<()> {
        let mut events = self.read_all()?;
        events.push(event);

        if events.len() > self.retention {
            let excess = events.len() - self.retention;
            events.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&events)?)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Event log now holds {} entries", events.len());
        Ok(())
    }

    /// All retained events, oldest first. A missing or unreadable log reads
    /// as empty.
    pub fn read_all(&self) -> Result<Vec<IngestionEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    /// The newest `limit` events, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<IngestionEvent>> {
        let mut events = self.read_all()?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }
}
