//! YAML configuration for system-sentinel.
//!
//! Loading follows apply-defaults-then-validate order: missing or
//! non-positive numeric options are replaced by their documented defaults
//! before validation runs, so a sparse config file is always usable.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sample_interval_sec: i64,
    pub collection_interval_sec: i64,
    pub log_dir: String,
    pub retention_days: i64,
    pub interface: String,
    pub spikes: Spikes,
    pub alerts: Alerts,
    pub scripts: Scripts,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Spikes {
    pub cpu: CpuSpike,
    pub memory: MemorySpike,
    pub network: NetworkSpike,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Alerts {
    pub cpu: CpuAlert,
    pub memory: MemoryAlert,
    pub network: NetworkAlert,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CpuSpike {
    pub enabled: bool,
    pub absolute_threshold: f64,
    pub relative_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemorySpike {
    pub enabled: bool,
    pub absolute_threshold: f64,
    pub relative_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkSpike {
    pub enabled: bool,
    pub rx_mbps_threshold: f64,
    pub tx_mbps_threshold: f64,
    pub relative_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CpuAlert {
    pub enabled: bool,
    pub absolute_threshold: f64,
    pub relative_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryAlert {
    pub enabled: bool,
    pub absolute_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkAlert {
    pub enabled: bool,
    pub rx_mbps_threshold: f64,
    pub tx_mbps_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scripts {
    pub enabled: bool,
    pub dir: String,
    pub env_file: String,
    pub debounce_sec: i64,
    pub timeout_sec: i64,
}

impl Config {
    /// Loads, defaults, and validates a configuration file.
    pub fn load(path: &Path) -> Result<Config> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let mut cfg: Config = serde_yaml::from_str(&data).context("failed to parse config")?;
        cfg.apply_defaults();
        cfg.validate().context("invalid config")?;

        Ok(cfg)
    }

    fn apply_defaults(&mut self) {
        if self.sample_interval_sec <= 0 {
            self.sample_interval_sec = 1;
        }
        if self.collection_interval_sec <= 0 {
            self.collection_interval_sec = 60;
        }
        if self.log_dir.is_empty() {
            self.log_dir = "/var/log/system-sentinel".to_string();
        }
        if self.retention_days <= 0 {
            self.retention_days = 30;
        }
        if self.interface.is_empty() {
            self.interface = "eth0".to_string();
        }
        if self.scripts.dir.is_empty() {
            self.scripts.dir = "/etc/system-sentinel/sh".to_string();
        }
        if self.scripts.env_file.is_empty() {
            self.scripts.env_file = "/etc/system-sentinel/.env".to_string();
        }
        if self.scripts.debounce_sec <= 0 {
            self.scripts.debounce_sec = 60;
        }
        if self.scripts.timeout_sec <= 0 {
            self.scripts.timeout_sec = 30;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sample_interval_sec <= 0 {
            bail!("sample_interval_sec must be positive");
        }
        if self.collection_interval_sec <= 0 {
            bail!("collection_interval_sec must be positive");
        }
        if self.retention_days <= 0 {
            bail!("retention_days must be positive");
        }
        if self.interface.is_empty() {
            bail!("interface cannot be empty");
        }
        if self.scripts.debounce_sec <= 0 {
            bail!("scripts.debounce_sec must be positive");
        }
        if self.scripts.timeout_sec <= 0 {
            bail!("scripts.timeout_sec must be positive");
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_sec as u64)
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_sec as u64)
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_secs(self.scripts.debounce_sec as u64)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.scripts.timeout_sec as u64)
    }
}
