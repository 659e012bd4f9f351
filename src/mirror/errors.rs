//! # Mirror Errors
//!
//! Error types for the mirror group subsystem.
//!
//! Backend failures carry the backend's status code verbatim and are never
//! retried here. Structural anomalies inside a successful status record are
//! not errors at all; the decoder skips the offending entry and counts it.

use thiserror::Error;

/// Result type for mirror group operations
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Mirror group errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    // ==================
    // Backend Errors
    // ==================

    /// The backend rejected a command or status request
    #[error("backend request '{operation}' failed with code {code}")]
    Backend {
        /// Operation name as sent to the backend
        operation: String,
        /// Backend status code (negative errno)
        code: i32,
    },

    // ==================
    // Status Errors
    // ==================

    /// No site entry with an empty mirror UUID exists in the status
    #[error("local site status not found")]
    LocalStatusNotFound,

    // ==================
    // Request Errors
    // ==================

    /// Group name cannot be sent to the backend
    #[error("invalid group name '{name}': {reason}")]
    InvalidGroupName { name: String, reason: &'static str },

    /// Image mirror mode not accepted for this request
    #[error("invalid image mirror mode: {0}")]
    InvalidImageMode(String),

    /// Command request is missing or carries a malformed parameter
    #[error("invalid command '{operation}': {reason}")]
    InvalidCommand { operation: String, reason: String },

    /// Command name not understood by the issuer
    #[error("unsupported command '{0}'")]
    UnsupportedCommand(String),

    // ==================
    // Polling Errors
    // ==================

    /// Polling gave up before the group reached the expected condition
    #[error("group '{group}' did not converge after {attempts} attempts")]
    ConvergenceTimeout { group: String, attempts: u32 },
}

impl MirrorError {
    /// Create a backend error from a raw status code.
    pub fn backend(operation: impl Into<String>, code: i32) -> Self {
        Self::Backend {
            operation: operation.into(),
            code,
        }
    }

    /// Create an invalid command error.
    pub fn invalid_command(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Backend status code, if this is a backend error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Positive errno for a backend error.
    pub fn errno(&self) -> Option<i32> {
        self.code().map(i32::abs)
    }

    /// Whether the backend reported that the group or pool does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Backend { code, .. } => *code == -libc::ENOENT,
            Self::LocalStatusNotFound => true,
            _ => false,
        }
    }

    /// Whether the error was caught before anything reached the backend.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGroupName { .. } | Self::InvalidImageMode(_) | Self::InvalidCommand { .. }
        )
    }
}

/// Translate a backend return value into a result.
///
/// Zero and positive values are success, negative values are errno codes.
pub(crate) fn check_return(operation: &str, ret: i32) -> MirrorResult<()> {
    if ret < 0 {
        Err(MirrorError::backend(operation, ret))
    } else {
        Ok(())
    }
}
