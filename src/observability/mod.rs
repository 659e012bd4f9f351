//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed events
//! - Monotonic counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on decode or command results
//! 3. No background threads
//!
//! # Usage
//!
//! ```ignore
//! use mirrorgroup::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::SiteSkipped, &[("index", "1")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_sites_skipped();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // verifies no panic
        log_event(Event::ConfigLoaded);
        log_event(Event::StatusDecoded);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::SiteSkipped, &[("index", "0"), ("reason", "null uuid")]);
    }
}
