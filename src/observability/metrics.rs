//! Mirror group counters
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; exact totals, no ordering guarantees between counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    commands_issued: AtomicU64,
    commands_failed: AtomicU64,
    status_decodes: AtomicU64,
    status_fetch_failures: AtomicU64,
    sites_skipped: AtomicU64,
    images_skipped: AtomicU64,
    entries_clamped: AtomicU64,
    buffers_released: AtomicU64,
    transition_anomalies: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Commands

    pub fn increment_commands_issued(&self) {
        self.commands_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_commands_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Status decode

    pub fn increment_status_decodes(&self) {
        self.status_decodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_status_fetch_failures(&self) {
        self.status_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sites_skipped(&self) {
        self.sites_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_images_skipped(&self) {
        self.images_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_entries_clamped(&self) {
        self.entries_clamped.fetch_add(1, Ordering::Relaxed);
    }

    /// Backend status buffer handed back for cleanup
    pub fn increment_buffers_released(&self) {
        self.buffers_released.fetch_add(1, Ordering::Relaxed);
    }

    // Polling

    /// Polled lifecycle state moved in a way the state machine forbids
    pub fn increment_transition_anomalies(&self) {
        self.transition_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Structural anomalies absorbed so far.
    pub fn anomalies(&self) -> u64 {
        self.sites_skipped.load(Ordering::Relaxed)
            + self.images_skipped.load(Ordering::Relaxed)
            + self.entries_clamped.load(Ordering::Relaxed)
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            status_decodes: self.status_decodes.load(Ordering::Relaxed),
            status_fetch_failures: self.status_fetch_failures.load(Ordering::Relaxed),
            sites_skipped: self.sites_skipped.load(Ordering::Relaxed),
            images_skipped: self.images_skipped.load(Ordering::Relaxed),
            entries_clamped: self.entries_clamped.load(Ordering::Relaxed),
            buffers_released: self.buffers_released.load(Ordering::Relaxed),
            transition_anomalies: self.transition_anomalies.load(Ordering::Relaxed),
        }
    }

    /// Get all counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commands_issued: u64,
    pub commands_failed: u64,
    pub status_decodes: u64,
    pub status_fetch_failures: u64,
    pub sites_skipped: u64,
    pub images_skipped: u64,
    pub entries_clamped: u64,
    pub buffers_released: u64,
    pub transition_anomalies: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_commands_issued();
        registry.increment_commands_issued();
        registry.increment_commands_failed();
        registry.increment_status_decodes();
        registry.increment_status_fetch_failures();
        registry.increment_sites_skipped();
        registry.increment_images_skipped();
        registry.increment_images_skipped();
        registry.increment_entries_clamped();
        registry.increment_buffers_released();
        registry.increment_transition_anomalies();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.commands_issued, 2);
        assert_eq!(snapshot.commands_failed, 1);
        assert_eq!(snapshot.status_decodes, 1);
        assert_eq!(snapshot.status_fetch_failures, 1);
        assert_eq!(snapshot.sites_skipped, 1);
        assert_eq!(snapshot.images_skipped, 2);
        assert_eq!(snapshot.entries_clamped, 1);
        assert_eq!(snapshot.buffers_released, 1);
        assert_eq!(snapshot.transition_anomalies, 1);
        assert_eq!(registry.anomalies(), 4);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_sites_skipped();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["sites_skipped"], 1);
        assert_eq!(parsed["commands_issued"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_status_decodes();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().status_decodes, 800);
    }
}
