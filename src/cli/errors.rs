//! CLI-specific error types
//!
//! All CLI errors are fatal: the process prints the error and exits
//! non-zero.

use std::fmt;
use std::io;

use crate::mirror::MirrorError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, config file)
    IoError,
    /// Group name, mode or command parameter rejected before reaching the backend
    InvalidArgument,
    /// Backend refused the request
    BackendError,
    /// Polling gave up before the requested state was observed
    Timeout,
    /// Built without a cluster binding
    Unavailable,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "MIRROR_CLI_CONFIG_ERROR",
            Self::IoError => "MIRROR_CLI_IO_ERROR",
            Self::InvalidArgument => "MIRROR_CLI_INVALID_ARGUMENT",
            Self::BackendError => "MIRROR_CLI_BACKEND_ERROR",
            Self::Timeout => "MIRROR_CLI_TIMEOUT",
            Self::Unavailable => "MIRROR_CLI_UNAVAILABLE",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// No cluster binding compiled in
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Unavailable, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<MirrorError> for CliError {
    fn from(e: MirrorError) -> Self {
        let code = if e.is_caller_error() {
            CliErrorCode::InvalidArgument
        } else if matches!(e, MirrorError::ConvergenceTimeout { .. }) {
            CliErrorCode::Timeout
        } else {
            CliErrorCode::BackendError
        };
        Self::new(code, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
