//! Retention rotation for daily log files.
//!
//! A background task deletes `metrics-YYYY-MM-DD.ndjson` files whose date is
//! strictly before `today_utc - retention_days`. The cutoff is always in the
//! past, so the current-day file is never touched. One pass runs at startup
//! and then every 6 hours; directory-listing errors abort the pass silently
//! and the next period retries.

use chrono::{Days, NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

const ROTATION_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

pub struct Rotator {
    log_dir: PathBuf,
    retention_days: i64,
}

/// Handle to a running rotator task; `stop` signals shutdown and waits for
/// the task to finish.
pub struct RotatorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RotatorHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl Rotator {
    pub fn new(log_dir: &Path, retention_days: i64) -> Self {
        Rotator {
            log_dir: log_dir.to_path_buf(),
            retention_days,
        }
    }

    pub fn start(self) -> RotatorHandle {
        let (shutdown, mut rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ROTATION_PERIOD);
            loop {
                tokio::select! {
                    _ = rx.changed() => return,
                    _ = ticker.tick() => {
                        rotate_pass(&self.log_dir, self.cutoff());
                    }
                }
            }
        });

        RotatorHandle { shutdown, task }
    }

    fn cutoff(&self) -> NaiveDate {
        Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(self.retention_days as u64))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Deletes log files dated strictly before the cutoff. Non-matching names
/// and unparseable dates are skipped; re-running is a no-op.
fn rotate_pass(log_dir: &Path, cutoff: NaiveDate) {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        if entry.file_type().map_or(true, |t| t.is_dir()) {
            continue;
        }

        let name = entry.file_name();
        let name = match name.to_str() {
            Some(n) => n,
            None => continue,
        };

        let date = match parse_log_date(name) {
            Some(d) => d,
            None => continue,
        };

        if date < cutoff {
            debug!("deleting expired log file {}", name);
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// Extracts the date from a `metrics-YYYY-MM-DD.ndjson` filename, rejecting
/// anything that deviates from the strict pattern.
fn parse_log_date(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix("metrics-")?.strip_suffix(".ndjson")?;
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
