//! Spike and alert detection over successive snapshots.
//!
//! Both detectors are stateless pure functions over a (current, previous)
//! snapshot pair. Each enabled category contributes at most one name and the
//! output is ordered cpu, memory, network. Comparisons are >=, and relative
//! comparisons are skipped when the previous value is zero.

use crate::config::{Alerts, Spikes};
use crate::snapshot::Snapshot;

/// True when the relative change from previous to current meets the
/// threshold. Disabled thresholds (<= 0) and zero previous values never fire.
fn relative_exceeds(current: f64, previous: f64, threshold: f64) -> bool {
    if previous <= 0.0 || threshold <= 0.0 {
        return false;
    }
    (current - previous) / previous * 100.0 >= threshold
}

/// Evaluates spike thresholds; spikes are logged but never run scripts.
pub struct SpikeDetector {
    cfg: Spikes,
}

impl SpikeDetector {
    pub fn new(cfg: Spikes) -> Self {
        SpikeDetector { cfg }
    }

    pub fn detect(&self, current: &Snapshot, previous: &Snapshot) -> Vec<&'static str> {
        let mut tripped = Vec::new();

        if self.cfg.cpu.enabled && self.cpu_spike(current, previous) {
            tripped.push("cpu");
        }
        if self.cfg.memory.enabled && self.memory_spike(current, previous) {
            tripped.push("memory");
        }
        if self.cfg.network.enabled && self.network_spike(current, previous) {
            tripped.push("network");
        }

        tripped
    }

    fn cpu_spike(&self, current: &Snapshot, previous: &Snapshot) -> bool {
        let cfg = &self.cfg.cpu;
        current.cpu_usage_percent >= cfg.absolute_threshold
            || relative_exceeds(
                current.cpu_usage_percent,
                previous.cpu_usage_percent,
                cfg.relative_threshold,
            )
    }

    fn memory_spike(&self, current: &Snapshot, previous: &Snapshot) -> bool {
        let cfg = &self.cfg.memory;
        current.mem_used_percent >= cfg.absolute_threshold
            || relative_exceeds(
                current.mem_used_percent,
                previous.mem_used_percent,
                cfg.relative_threshold,
            )
    }

    fn network_spike(&self, current: &Snapshot, previous: &Snapshot) -> bool {
        let cfg = &self.cfg.network;
        current.net_rx_mbps >= cfg.rx_mbps_threshold
            || current.net_tx_mbps >= cfg.tx_mbps_threshold
            || relative_exceeds(current.net_rx_mbps, previous.net_rx_mbps, cfg.relative_threshold)
            || relative_exceeds(current.net_tx_mbps, previous.net_tx_mbps, cfg.relative_threshold)
    }
}

/// Evaluates alert thresholds; alerts additionally trigger script execution
/// subject to debouncing. Memory and network alerts have no relative test.
pub struct AlertDetector {
    cfg: Alerts,
}

impl AlertDetector {
    pub fn new(cfg: Alerts) -> Self {
        AlertDetector { cfg }
    }

    pub fn detect(&self, current: &Snapshot, previous: &Snapshot) -> Vec<&'static str> {
        let mut tripped = Vec::new();

        if self.cfg.cpu.enabled && self.cpu_alert(current, previous) {
            tripped.push("cpu");
        }
        if self.cfg.memory.enabled
            && current.mem_used_percent >= self.cfg.memory.absolute_threshold
        {
            tripped.push("memory");
        }
        if self.cfg.network.enabled && self.network_alert(current) {
            tripped.push("network");
        }

        tripped
    }

    fn cpu_alert(&self, current: &Snapshot, previous: &Snapshot) -> bool {
        let cfg = &self.cfg.cpu;
        current.cpu_usage_percent >= cfg.absolute_threshold
            || relative_exceeds(
                current.cpu_usage_percent,
                previous.cpu_usage_percent,
                cfg.relative_threshold,
            )
    }

    fn network_alert(&self, current: &Snapshot) -> bool {
        let cfg = &self.cfg.network;
        current.net_rx_mbps >= cfg.rx_mbps_threshold || current.net_tx_mbps >= cfg.tx_mbps_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CpuAlert, CpuSpike, MemoryAlert, MemorySpike, NetworkAlert, NetworkSpike};

    fn snap(cpu: f64, mem: f64, rx_mbps: f64, tx_mbps: f64) -> Snapshot {
        Snapshot {
            cpu_usage_percent: cpu,
            mem_used_percent: mem,
            net_rx_mbps: rx_mbps,
            net_tx_mbps: tx_mbps,
            ..Snapshot::default()
        }
    }

    fn all_spikes() -> Spikes {
        Spikes {
            cpu: CpuSpike {
                enabled: true,
                absolute_threshold: 80.0,
                relative_threshold: 50.0,
            },
            memory: MemorySpike {
                enabled: true,
                absolute_threshold: 90.0,
                relative_threshold: 50.0,
            },
            network: NetworkSpike {
                enabled: true,
                rx_mbps_threshold: 100.0,
                tx_mbps_threshold: 100.0,
                relative_threshold: 50.0,
            },
        }
    }

    fn all_alerts() -> Alerts {
        Alerts {
            cpu: CpuAlert {
                enabled: true,
                absolute_threshold: 90.0,
                relative_threshold: 0.0,
            },
            memory: MemoryAlert {
                enabled: true,
                absolute_threshold: 95.0,
            },
            network: NetworkAlert {
                enabled: true,
                rx_mbps_threshold: 200.0,
                tx_mbps_threshold: 200.0,
            },
        }
    }

    #[test]
    fn test_disabled_categories_never_fire() {
        let spikes = SpikeDetector::new(Spikes::default());
        let alerts = AlertDetector::new(Alerts::default());
        let hot = snap(100.0, 100.0, 1000.0, 1000.0);
        assert!(spikes.detect(&hot, &hot).is_empty());
        assert!(alerts.detect(&hot, &hot).is_empty());
    }

    #[test]
    fn test_absolute_threshold_equality_fires() {
        let det = SpikeDetector::new(all_spikes());
        let current = snap(80.0, 0.0, 0.0, 0.0);
        assert_eq!(det.detect(&current, &Snapshot::default()), vec!["cpu"]);
    }

    #[test]
    fn test_relative_spike_fires() {
        let det = SpikeDetector::new(all_spikes());
        // 40 -> 62 is a 55% increase, over the 50% relative threshold.
        let previous = snap(0.0, 40.0, 0.0, 0.0);
        let current = snap(0.0, 62.0, 0.0, 0.0);
        assert_eq!(det.detect(&current, &previous), vec!["memory"]);
    }

    #[test]
    fn test_relative_skipped_when_previous_zero() {
        let det = SpikeDetector::new(all_spikes());
        let current = snap(0.0, 62.0, 0.0, 0.0);
        assert!(det.detect(&current, &Snapshot::default()).is_empty());
    }

    #[test]
    fn test_relative_skipped_when_threshold_zero() {
        let mut cfg = all_spikes();
        cfg.cpu.relative_threshold = 0.0;
        let det = SpikeDetector::new(cfg);
        let previous = snap(10.0, 0.0, 0.0, 0.0);
        let current = snap(40.0, 0.0, 0.0, 0.0);
        assert!(det.detect(&current, &previous).is_empty());
    }

    #[test]
    fn test_network_spike_rx_or_tx() {
        let det = SpikeDetector::new(all_spikes());
        let zero = Snapshot::default();
        assert_eq!(det.detect(&snap(0.0, 0.0, 150.0, 0.0), &zero), vec!["network"]);
        assert_eq!(det.detect(&snap(0.0, 0.0, 0.0, 150.0), &zero), vec!["network"]);
    }

    #[test]
    fn test_network_spike_relative_on_either_direction() {
        let det = SpikeDetector::new(all_spikes());
        let previous = snap(0.0, 0.0, 10.0, 10.0);
        let current = snap(0.0, 0.0, 10.0, 20.0);
        assert_eq!(det.detect(&current, &previous), vec!["network"]);
    }

    #[test]
    fn test_alert_memory_has_no_relative_test() {
        let det = AlertDetector::new(all_alerts());
        // Large relative jump but below the absolute threshold.
        let previous = snap(0.0, 10.0, 0.0, 0.0);
        let current = snap(0.0, 94.0, 0.0, 0.0);
        assert!(det.detect(&current, &previous).is_empty());
        assert_eq!(
            det.detect(&snap(0.0, 95.0, 0.0, 0.0), &previous),
            vec!["memory"]
        );
    }

    #[test]
    fn test_multi_category_output_order() {
        let spikes = SpikeDetector::new(all_spikes());
        let current = snap(85.0, 95.0, 150.0, 0.0);
        assert_eq!(
            spikes.detect(&current, &Snapshot::default()),
            vec!["cpu", "memory", "network"]
        );

        let alerts = AlertDetector::new(all_alerts());
        let current = snap(95.0, 0.0, 250.0, 0.0);
        assert_eq!(
            alerts.detect(&current, &Snapshot::default()),
            vec!["cpu", "network"]
        );
    }

    #[test]
    fn test_first_tick_fires_nothing() {
        let spikes = SpikeDetector::new(all_spikes());
        let alerts = AlertDetector::new(all_alerts());
        let zero = Snapshot::default();
        let first = snap(0.0, 30.0, 0.0, 0.0);
        assert!(spikes.detect(&first, &zero).is_empty());
        assert!(alerts.detect(&first, &zero).is_empty());
    }
}
