//! Per-category debouncer for script execution.
//!
//! A round of tripped alert categories is admitted when any category has
//! never fired or is outside the debounce interval. On admission every
//! category in the round is marked as fired now, including those still
//! inside their window, so a rarely-tripping category cannot piggy-back on
//! a frequently-tripping companion every round.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct Debouncer {
    interval: Duration,
    last_fired: Mutex<HashMap<&'static str, Instant>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Debouncer {
            interval,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether this alert round should run scripts, recording the
    /// current instant for every category when admitted.
    pub fn should_execute(&self, categories: &[&'static str]) -> bool {
        self.admit_at(categories, Instant::now())
    }

    fn admit_at(&self, categories: &[&'static str], now: Instant) -> bool {
        if categories.is_empty() {
            return false;
        }

        let mut last_fired = self.last_fired.lock().unwrap();

        let admitted = categories.iter().any(|category| {
            last_fired
                .get(category)
                .map_or(true, |last| now.duration_since(*last) >= self.interval)
        });

        if admitted {
            for category in categories {
                last_fired.insert(*category, now);
            }
        }

        admitted
    }
}
