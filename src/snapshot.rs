//! The per-tick metrics record.
//!
//! JSON field names match the on-disk log schema, so a snapshot read back
//! from an NDJSON event deserializes to identical values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of derived metrics, produced once per tick.
///
/// All percent fields are in [0, 100] and all rate fields are >= 0. A
/// collector with no previous sample reports zero CPU usage and zero rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "CPUUsagePercent")]
    pub cpu_usage_percent: f64,
    #[serde(rename = "MemUsedPercent")]
    pub mem_used_percent: f64,
    #[serde(rename = "MemUsedBytes")]
    pub mem_used_bytes: u64,
    #[serde(rename = "MemTotalBytes")]
    pub mem_total_bytes: u64,
    #[serde(rename = "NetInterface")]
    pub net_interface: String,
    #[serde(rename = "NetRxBytesPS")]
    pub net_rx_bytes_per_sec: f64,
    #[serde(rename = "NetTxBytesPS")]
    pub net_tx_bytes_per_sec: f64,
    #[serde(rename = "NetRxMbps")]
    pub net_rx_mbps: f64,
    #[serde(rename = "NetTxMbps")]
    pub net_tx_mbps: f64,
}
