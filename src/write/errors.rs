//! Write path error types
//!
//! One leader status fans out to every writer absorbed into its batch
//! group, so `WriteError` is cheap to clone; the WAL's structured error is
//! flattened to its stable code plus message at the boundary.

use thiserror::Error;

use crate::column_family::ColumnFamilyId;
use crate::wal::WalError;

/// Result type for write path operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Errors surfaced by the write path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The writer exceeded its timeout hint before becoming leader and
    /// without being absorbed into another leader's batch group.
    #[error("write timed out waiting in the writer queue")]
    TimedOut,

    /// The batch referenced a column family this engine does not have.
    #[error("unknown column family: {0}")]
    UnknownColumnFamily(ColumnFamilyId),

    /// The write's callback aborted the write before it was logged.
    #[error("write callback rejected the write: {0}")]
    CallbackRejected(String),

    /// The leader's WAL append or fsync failed.
    #[error("{code}: {message}")]
    Wal {
        code: &'static str,
        message: String,
    },
}

impl From<WalError> for WriteError {
    fn from(e: WalError) -> Self {
        WriteError::Wal {
            code: e.code(),
            message: e.to_string(),
        }
    }
}
