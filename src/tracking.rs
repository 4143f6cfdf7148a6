//! Per-tracking-id invocation counters.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Counts how many times each tracking id has been executed.
///
/// Counters only ever grow. Shared by every clone of a
/// [`RestClient`](crate::RestClient).
#[derive(Debug, Default)]
pub struct TrackingCounters {
    counts: Mutex<HashMap<String, u64>>,
}

impl TrackingCounters {
    /// Creates an empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter for `tracking_id` and returns the new count.
    pub fn increment(&self, tracking_id: &str) -> u64 {
        let mut counts = self.counts.lock();
        let count = counts.entry(tracking_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// The current count for `tracking_id`, zero if never executed.
    pub fn count(&self, tracking_id: &str) -> u64 {
        self.counts.lock().get(tracking_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment() {
        let counters = TrackingCounters::new();
        assert_eq!(counters.count("RB1001"), 0);
        assert_eq!(counters.increment("RB1001"), 1);
        assert_eq!(counters.increment("RB1001"), 2);
        assert_eq!(counters.increment("RB1002"), 1);
        assert_eq!(counters.count("RB1001"), 2);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(TrackingCounters::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.increment("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.count("shared"), 8000);
    }
}
