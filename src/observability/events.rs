//! Observable mirror group events
//!
//! Events are explicit and typed. Each maps to one stable upper-case name
//! used as the `event` key of a log line.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,

    // Commands
    /// Lifecycle command accepted by the backend
    CommandIssued,
    /// Lifecycle command rejected by the backend
    CommandFailed,

    // Status
    /// Status record decoded into an owned snapshot
    StatusDecoded,
    /// Backend refused a status or info request
    StatusFetchFailed,
    /// Site entry dropped because a required pointer was null
    SiteSkipped,
    /// Image entry dropped because its UUID pointer was null
    ImageSkipped,
    /// Declared count exceeded the decode bound
    EntriesClamped,
    /// Decoded status had no local site entry
    LocalSiteMissing,

    // Polling
    /// Polled condition reached
    ConvergenceReached,
    /// Polling gave up
    ConvergenceTimeout,
    /// Polled lifecycle state moved backwards
    TransitionAnomaly,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::CommandIssued => "MIRROR_COMMAND_ISSUED",
            Event::CommandFailed => "MIRROR_COMMAND_FAILED",

            Event::StatusDecoded => "MIRROR_STATUS_DECODED",
            Event::StatusFetchFailed => "MIRROR_STATUS_FETCH_FAILED",
            Event::SiteSkipped => "MIRROR_SITE_SKIPPED",
            Event::ImageSkipped => "MIRROR_IMAGE_SKIPPED",
            Event::EntriesClamped => "MIRROR_ENTRIES_CLAMPED",
            Event::LocalSiteMissing => "MIRROR_LOCAL_SITE_MISSING",

            Event::ConvergenceReached => "MIRROR_CONVERGENCE_REACHED",
            Event::ConvergenceTimeout => "MIRROR_CONVERGENCE_TIMEOUT",
            Event::TransitionAnomaly => "MIRROR_TRANSITION_ANOMALY",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CommandFailed | Event::StatusFetchFailed | Event::ConvergenceTimeout => {
                Severity::Error
            }
            Event::SiteSkipped
            | Event::ImageSkipped
            | Event::EntriesClamped
            | Event::TransitionAnomaly => Severity::Warn,
            Event::LocalSiteMissing => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
