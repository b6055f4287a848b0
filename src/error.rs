//! Error types for CopyBench
//!
//! Every failure a copy task can hit is a variant of [`CopyBenchError`]. Task
//! errors are captured into timing samples by the harness; only configuration
//! and report-sink errors ever reach `main`.

use crate::core::TaskState;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase of a copy in which an I/O failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoPhase {
    /// Reading from the input handle
    Read,
    /// Writing to the output handle
    Write,
    /// Flushing buffered output before release
    Flush,
    /// Closing a handle
    Close,
}

impl IoPhase {
    /// Lowercase name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Flush => "flush",
            Self::Close => "close",
        }
    }

    /// Flush failures count as write-side failures
    pub fn is_write_side(&self) -> bool {
        matches!(self, Self::Write | Self::Flush)
    }
}

impl fmt::Display for IoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stream of a task a resource error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    /// The byte source
    Input,
    /// The byte sink
    Output,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Main error type for CopyBench operations
#[derive(Error, Debug)]
pub enum CopyBenchError {
    /// Input or output could not be resolved or opened
    #[error("cannot open {which} '{name}': {source}")]
    Resource {
        /// Which side of the copy failed to open
        which: StreamRole,
        /// Resource name as configured
        name: String,
        /// Underlying open error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while a copy was in progress
    #[error("{phase} failed: {source}")]
    Io {
        /// Step that failed
        phase: IoPhase,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A strategy or task parameter is out of range
    #[error("invalid {field}: {message}")]
    InvalidParam {
        /// Offending parameter
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The run was interrupted through the shared interrupt flag
    #[error("interrupted")]
    Interrupted,

    /// A lifecycle transition was attempted from the wrong state
    #[error("task '{task}' cannot {action} in state {state}")]
    InvalidState {
        /// Task name
        task: String,
        /// Transition that was attempted
        action: &'static str,
        /// State the run was in
        state: TaskState,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The report sink rejected output
    #[error("Report error: {0}")]
    Report(#[source] std::io::Error),
}

impl CopyBenchError {
    /// Create a resource error for the given stream
    pub fn resource(which: StreamRole, name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            which,
            name: name.into(),
            source,
        }
    }

    /// Create an I/O error for the given phase
    pub fn io(phase: IoPhase, source: std::io::Error) -> Self {
        Self::Io { phase, source }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            field,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Stable snake_case label for reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resource { .. } => "resource_error",
            Self::Io { .. } => "io_error",
            Self::InvalidParam { .. } => "invalid_param",
            Self::Interrupted => "interrupted",
            Self::InvalidState { .. } => "invalid_state",
            Self::ConfigError(_) => "config_error",
            Self::Report(_) => "report_error",
        }
    }

    /// The I/O phase, for copy failures
    pub fn phase(&self) -> Option<IoPhase> {
        match self {
            Self::Io { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The stream a resource error refers to
    pub fn stream(&self) -> Option<StreamRole> {
        match self {
            Self::Resource { which, .. } => Some(*which),
            _ => None,
        }
    }
}

/// Result type alias for CopyBench operations
pub type Result<T> = std::result::Result<T, CopyBenchError>;

impl From<serde_json::Error> for CopyBenchError {
    fn from(err: serde_json::Error) -> Self {
        CopyBenchError::ConfigError(err.to_string())
    }
}

/// Extension trait for tagging std::io::Result with the copy phase
pub trait IoPhaseExt<T> {
    /// Map an I/O error into [`CopyBenchError::Io`] for `phase`
    fn in_phase(self, phase: IoPhase) -> Result<T>;
}

impl<T> IoPhaseExt<T> for std::io::Result<T> {
    fn in_phase(self, phase: IoPhase) -> Result<T> {
        self.map_err(|e| CopyBenchError::io(phase, e))
    }
}

/// Combine a primary outcome with the outcome of releasing its resources.
///
/// The earliest failure wins: a release error is only surfaced when the
/// primary operation succeeded.
pub fn retain_first<T>(primary: Result<T>, release: Result<()>) -> Result<T> {
    match (primary, release) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e),
        (Ok(value), Ok(())) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_with_phase() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        let err = result.in_phase(IoPhase::Write).unwrap_err();
        assert_eq!(err.kind(), "io_error");
        assert_eq!(err.phase(), Some(IoPhase::Write));
        assert_eq!(err.to_string(), "write failed: pipe closed");
    }

    #[test]
    fn test_resource_error_display() {
        let err = CopyBenchError::resource(
            StreamRole::Input,
            "missing.txt",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.kind(), "resource_error");
        assert_eq!(err.stream(), Some(StreamRole::Input));
        assert_eq!(err.to_string(), "cannot open input 'missing.txt': not found");
    }

    #[test]
    fn test_flush_is_write_side() {
        assert!(IoPhase::Flush.is_write_side());
        assert!(IoPhase::Write.is_write_side());
        assert!(!IoPhase::Read.is_write_side());
        assert!(!IoPhase::Close.is_write_side());
    }

    #[test]
    fn test_retain_first_keeps_primary_error() {
        let primary: Result<u64> = Err(CopyBenchError::io(
            IoPhase::Read,
            io::Error::new(io::ErrorKind::Other, "disk gone"),
        ));
        let release = Err(CopyBenchError::io(
            IoPhase::Close,
            io::Error::new(io::ErrorKind::Other, "bad fd"),
        ));
        let err = retain_first(primary, release).unwrap_err();
        assert_eq!(err.phase(), Some(IoPhase::Read));
    }

    #[test]
    fn test_retain_first_surfaces_release_error() {
        let release = Err(CopyBenchError::io(
            IoPhase::Flush,
            io::Error::new(io::ErrorKind::Other, "no space"),
        ));
        let err = retain_first(Ok(5u64), release).unwrap_err();
        assert_eq!(err.phase(), Some(IoPhase::Flush));

        assert_eq!(retain_first(Ok(5u64), Ok(())).unwrap(), 5);
    }
}
