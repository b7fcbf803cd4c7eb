//! Metrics collection from the /proc filesystem.
//!
//! The collector owns the previous-sample state needed to derive rates from
//! monotonic kernel counters: CPU jiffies from /proc/stat, memory from
//! /proc/meminfo, and per-interface byte counters from /proc/net/dev.
//!
//! Parsing is isolated in pure functions over string content so tests can
//! inject synthetic procfs text. State updates are stage-by-stage: a failure
//! in a later stage leaves earlier stages' previous counters updated.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use thiserror::Error;

use crate::snapshot::Snapshot;

/// Per-kind collection failure. The orchestrator skips downstream stages
/// for the tick and retries on the next one.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cpu: {0}")]
    Cpu(String),
    #[error("memory: {0}")]
    Memory(String),
    #[error("network: {0}")]
    Network(String),
}

/// Aggregate CPU jiffy counters from the first line of /proc/stat.
#[derive(Debug, Clone, Copy, Default)]
struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTimes {
    /// Total CPU time across all fields.
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Non-active time (idle + iowait).
    fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NetCounters {
    rx_bytes: u64,
    tx_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
struct MemInfo {
    total: u64,
    available: u64,
}

/// Source of procfs content, abstracted so tests can substitute fixtures.
pub trait ProcSource {
    fn read_stat(&self) -> io::Result<String>;
    fn read_meminfo(&self) -> io::Result<String>;
    fn read_net_dev(&self) -> io::Result<String>;
}

/// The real /proc filesystem.
pub struct Procfs;

impl ProcSource for Procfs {
    fn read_stat(&self) -> io::Result<String> {
        fs::read_to_string("/proc/stat")
    }

    fn read_meminfo(&self) -> io::Result<String> {
        fs::read_to_string("/proc/meminfo")
    }

    fn read_net_dev(&self) -> io::Result<String> {
        fs::read_to_string("/proc/net/dev")
    }
}

/// Stateful metrics collector. Single logical caller; not reentrant.
pub struct Collector<S = Procfs> {
    source: S,
    interface: String,
    prev_cpu: CpuTimes,
    prev_net: NetCounters,
    prev_sample_time: Option<DateTime<Utc>>,
    initialized: bool,
}

impl Collector<Procfs> {
    pub fn new(interface: &str) -> Self {
        Collector::with_source(Procfs, interface)
    }
}

impl<S: ProcSource> Collector<S> {
    pub fn with_source(source: S, interface: &str) -> Self {
        Collector {
            source,
            interface: interface.to_string(),
            prev_cpu: CpuTimes::default(),
            prev_net: NetCounters::default(),
            prev_sample_time: None,
            initialized: false,
        }
    }

    /// Produces one snapshot of derived metrics.
    ///
    /// The first call stores counters and reports zero CPU usage and zero
    /// network rates; subsequent calls derive rates over the elapsed wall
    /// clock interval.
    pub fn collect(&mut self) -> Result<Snapshot, CollectError> {
        let now = Utc::now();
        let mut snap = Snapshot {
            timestamp: now,
            net_interface: self.interface.clone(),
            ..Snapshot::default()
        };

        let stat = self
            .source
            .read_stat()
            .map_err(|e| CollectError::Cpu(e.to_string()))?;
        let cpu = parse_cpu_line(&stat).map_err(CollectError::Cpu)?;
        snap.cpu_usage_percent = self.cpu_usage(cpu);

        let meminfo = self
            .source
            .read_meminfo()
            .map_err(|e| CollectError::Memory(e.to_string()))?;
        let mem = parse_meminfo(&meminfo).map_err(CollectError::Memory)?;
        snap.mem_total_bytes = mem.total;
        snap.mem_used_bytes = mem.total.saturating_sub(mem.available);
        snap.mem_used_percent = snap.mem_used_bytes as f64 / mem.total as f64 * 100.0;

        let net_dev = self
            .source
            .read_net_dev()
            .map_err(|e| CollectError::Network(e.to_string()))?;
        let net = parse_net_dev(&net_dev, &self.interface).map_err(CollectError::Network)?;
        let (rx_ps, tx_ps) = self.net_rates(net, now);
        snap.net_rx_bytes_per_sec = rx_ps;
        snap.net_tx_bytes_per_sec = tx_ps;
        snap.net_rx_mbps = rx_ps * 8.0 / 1_000_000.0;
        snap.net_tx_mbps = tx_ps * 8.0 / 1_000_000.0;

        Ok(snap)
    }

    /// Derives CPU usage percent from the delta against the previous sample.
    /// Always stores the current counters as the new previous sample.
    fn cpu_usage(&mut self, current: CpuTimes) -> f64 {
        if !self.initialized {
            self.prev_cpu = current;
            self.initialized = true;
            return 0.0;
        }

        let total_delta = current.total().saturating_sub(self.prev_cpu.total());
        let idle_delta = current
            .idle_total()
            .saturating_sub(self.prev_cpu.idle_total());
        self.prev_cpu = current;

        if total_delta == 0 {
            return 0.0;
        }

        let idle_delta = idle_delta.min(total_delta);
        (1.0 - idle_delta as f64 / total_delta as f64) * 100.0
    }

    /// Derives rx/tx byte rates from counter deltas over the wall-clock
    /// interval, with a 1-second floor against non-positive deltas.
    fn net_rates(&mut self, current: NetCounters, now: DateTime<Utc>) -> (f64, f64) {
        let prev_time = match self.prev_sample_time {
            Some(t) => t,
            None => {
                self.prev_net = current;
                self.prev_sample_time = Some(now);
                return (0.0, 0.0);
            }
        };

        let mut delta_secs = (now - prev_time).num_milliseconds() as f64 / 1000.0;
        if delta_secs <= 0.0 {
            delta_secs = 1.0;
        }

        let rx_delta = current.rx_bytes.saturating_sub(self.prev_net.rx_bytes);
        let tx_delta = current.tx_bytes.saturating_sub(self.prev_net.tx_bytes);

        self.prev_net = current;
        self.prev_sample_time = Some(now);

        (rx_delta as f64 / delta_secs, tx_delta as f64 / delta_secs)
    }
}

/// Parses the aggregate "cpu" line from /proc/stat content.
fn parse_cpu_line(content: &str) -> Result<CpuTimes, String> {
    let line = content.lines().next().ok_or("empty /proc/stat")?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 8 || fields[0] != "cpu" {
        return Err("invalid cpu line".to_string());
    }

    let field = |i: usize| -> u64 { fields[i].parse().unwrap_or(0) };

    Ok(CpuTimes {
        user: field(1),
        nice: field(2),
        system: field(3),
        idle: field(4),
        iowait: field(5),
        irq: field(6),
        softirq: field(7),
        steal: if fields.len() > 8 { field(8) } else { 0 },
    })
}

/// Parses MemTotal and MemAvailable from /proc/meminfo content.
/// Values are reported in kibibytes and converted to bytes. A missing
/// MemAvailable is treated as equal to MemTotal (used = 0).
fn parse_meminfo(content: &str) -> Result<MemInfo, String> {
    let mut total: u64 = 0;
    let mut available: u64 = 0;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            if let Some(kb) = parse_kb_value(rest) {
                total = kb * 1024;
            }
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            if let Some(kb) = parse_kb_value(rest) {
                available = kb * 1024;
            }
        }
        if total > 0 && available > 0 {
            break;
        }
    }

    if total == 0 {
        return Err("could not read MemTotal".to_string());
    }
    if available == 0 {
        available = total;
    }

    Ok(MemInfo { total, available })
}

/// Parses rx/tx byte counters for the named interface from /proc/net/dev
/// content. The line's first token must equal `<interface>:` exactly;
/// rx bytes is the next field and tx bytes the ninth after that.
fn parse_net_dev(content: &str, interface: &str) -> Result<NetCounters, String> {
    let prefix = format!("{}:", interface);

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || fields[0] != prefix {
            continue;
        }

        return Ok(NetCounters {
            rx_bytes: fields[1].parse().unwrap_or(0),
            tx_bytes: fields[9].parse().unwrap_or(0),
        });
    }

    Err(format!("interface {} not found", interface))
}

/// Parses the numeric kilobyte value from a meminfo line remainder.
fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}
