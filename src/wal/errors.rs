//! WAL error types
//!
//! Variants are split by what the engine can still promise afterwards: a
//! failed append or an unopenable log fans out to the affected writers and
//! the engine continues, while a failed fsync or a corrupt complete record
//! means durability or history can no longer be trusted, which is fatal.
//! Each variant also carries a stable code so callers can match across
//! message changes.

use std::io;

use thiserror::Error;

use crate::observability::Severity;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors raised by the WAL appender and reader.
#[derive(Debug, Error)]
pub enum WalError {
    /// A batch group could not be written. The engine continues; this
    /// becomes the status of every writer in the group.
    #[error("append of batch group at sequence {sequence} failed")]
    AppendFailed {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    /// The log file could not be opened or prepared.
    #[error("wal unavailable: {context}")]
    Unavailable {
        context: String,
        #[source]
        source: io::Error,
    },

    /// fsync did not complete after an append that a sync write was about
    /// to be acknowledged on.
    #[error("fsync of wal failed after sequence {sequence}")]
    FsyncFailed {
        sequence: u64,
        #[source]
        source: io::Error,
    },

    /// A complete record failed validation during replay.
    #[error("corrupt wal record at byte {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },
}

impl WalError {
    /// Stable string code, independent of the display text.
    pub fn code(&self) -> &'static str {
        match self {
            WalError::AppendFailed { .. } => "BASALT_WAL_APPEND_FAILED",
            WalError::Unavailable { .. } => "BASALT_WAL_UNAVAILABLE",
            WalError::FsyncFailed { .. } => "BASALT_WAL_FSYNC_FAILED",
            WalError::CorruptRecord { .. } => "BASALT_WAL_CORRUPTION",
        }
    }

    /// How much of the engine's promise survives this error.
    pub fn severity(&self) -> Severity {
        match self {
            WalError::AppendFailed { .. } | WalError::Unavailable { .. } => Severity::Error,
            WalError::FsyncFailed { .. } | WalError::CorruptRecord { .. } => Severity::Fatal,
        }
    }

    /// Whether the engine must stop trusting the log after this error.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
