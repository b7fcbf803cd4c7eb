//! NDJSON event logging with daily file rotation.
//!
//! Events are appended one JSON object per line to
//! `<log_dir>/metrics-YYYY-MM-DD.ndjson`, where the date is the current UTC
//! calendar date at write time. Every write first checks the date and swaps
//! the file handle on day change. The handle and date tag live under one
//! mutex so rotation stays atomic if callers ever appear off-task.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::snapshot::Snapshot;

/// One serialized event line.
#[derive(Debug, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasons: Option<Vec<String>>,
    pub metrics: Snapshot,
}

/// Event `metric` field: the sole category when exactly one tripped,
/// otherwise "multi".
pub fn metric_label(reasons: &[&'static str]) -> String {
    if reasons.len() == 1 {
        reasons[0].to_string()
    } else {
        "multi".to_string()
    }
}

struct Inner {
    file: Option<File>,
    date: String,
}

pub struct EventLogger {
    log_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl EventLogger {
    /// Creates the log directory if needed and opens today's file.
    pub fn new(log_dir: &Path) -> Result<EventLogger> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;

        let logger = EventLogger {
            log_dir: log_dir.to_path_buf(),
            inner: Mutex::new(Inner {
                file: None,
                date: String::new(),
            }),
        };
        logger.rotate_if_needed(&mut logger.inner.lock().unwrap())?;

        Ok(logger)
    }

    pub fn log_sample(&self, snap: &Snapshot) -> Result<()> {
        self.log("sample", "sample".to_string(), None, snap)
    }

    pub fn log_spike(&self, snap: &Snapshot, reasons: &[&'static str]) -> Result<()> {
        self.log("spike", metric_label(reasons), Some(reasons), snap)
    }

    pub fn log_alert(&self, snap: &Snapshot, reasons: &[&'static str]) -> Result<()> {
        self.log("alert", metric_label(reasons), Some(reasons), snap)
    }

    fn log(
        &self,
        event_type: &str,
        metric: String,
        reasons: Option<&[&'static str]>,
        snap: &Snapshot,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        self.rotate_if_needed(&mut inner)?;

        let event = Event {
            timestamp: snap.timestamp.to_rfc3339(),
            event_type: event_type.to_string(),
            metric,
            reasons: reasons.map(|r| r.iter().map(|s| s.to_string()).collect()),
            metrics: snap.clone(),
        };

        let mut line = serde_json::to_vec(&event).context("failed to serialize event")?;
        line.push(b'\n');

        let file = inner.file.as_mut().expect("log file open after rotation");
        file.write_all(&line).context("failed to write event")?;

        Ok(())
    }

    /// Opens a new append-only file when the UTC date has changed since the
    /// last write. The old handle is dropped, never rewritten.
    fn rotate_if_needed(&self, inner: &mut Inner) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        if inner.file.is_some() && inner.date == date {
            return Ok(());
        }

        let path = self.log_dir.join(format!("metrics-{}.ndjson", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o644)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        inner.file = Some(file);
        inner.date = date;
        Ok(())
    }
}
