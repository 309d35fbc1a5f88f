//! WAL writer
//!
//! Append-only, single file, opened with exclusive write access. The leader
//! of a batch group is the only caller: it appends the whole group as one
//! physical record and, for sync writes, does not return before fsync.
//!
//! Durability follows the per-write options rather than being unconditional:
//! a non-sync write is buffered by the OS and made durable by the next sync
//! write (or an explicit `fsync`).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};
use super::reader::WalReader;
use super::record::encode_group;
use crate::batch::WriteBatch;
use crate::observability::Event;

/// WAL writer appending one record per batch group.
pub struct WalWriter {
    /// Path to the WAL file
    wal_path: PathBuf,
    /// Underlying file handle
    file: File,
    /// Last sequence number made visible through this WAL (0 = none)
    last_sequence: u64,
}

impl WalWriter {
    /// Opens or creates a WAL file under the given data directory.
    ///
    /// Creates `<data_dir>/wal/wal.log` and its parents if missing, then
    /// scans any existing records to recover the last appended sequence
    /// number.
    pub fn open(data_dir: &Path) -> WalResult<Self> {
        let wal_dir = data_dir.join("wal");
        let wal_path = wal_dir.join("wal.log");

        if !wal_dir.exists() {
            fs::create_dir_all(&wal_dir).map_err(|e| WalError::Unavailable {
                context: format!("failed to create WAL directory: {}", wal_dir.display()),
                source: e,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)
            .map_err(|e| WalError::Unavailable {
                context: format!("failed to open WAL file: {}", wal_path.display()),
                source: e,
            })?;

        let last_sequence = Self::recover_last_sequence(&wal_path)?;

        Ok(Self {
            wal_path,
            file,
            last_sequence,
        })
    }

    /// Scans the existing WAL to find the last committed sequence number.
    /// Returns 0 for an empty or missing WAL.
    fn recover_last_sequence(wal_path: &Path) -> WalResult<u64> {
        let metadata = match fs::metadata(wal_path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(WalError::Unavailable {
                    context: "failed to read WAL metadata".to_string(),
                    source: e,
                })
            }
        };
        if metadata.len() == 0 {
            return Ok(0);
        }

        let mut reader = WalReader::open(wal_path)?;
        let mut last = 0u64;
        while let Some(record) = reader.read_next()? {
            last = record.last_sequence();
        }
        Ok(last)
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the last sequence number appended through this WAL, or 0 if
    /// the WAL is empty.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Appends a batch group as one physical record.
    ///
    /// `first_sequence` is the sequence number of the group's first
    /// operation, assigned by the caller before application so that the WAL
    /// order fixes the visible numbering. With `sync` set the record is
    /// fsync'd before this returns; an fsync failure is fatal severity.
    pub fn append_group(
        &mut self,
        first_sequence: u64,
        batches: &[&WriteBatch],
        sync: bool,
    ) -> WalResult<()> {
        debug_assert!(!batches.is_empty());
        let serialized = encode_group(first_sequence, batches);

        self.file
            .write_all(&serialized)
            .map_err(|e| WalError::AppendFailed {
                sequence: first_sequence,
                source: e,
            })?;

        if sync {
            self.file.sync_all().map_err(|e| {
                Event::WalFsyncFailed {
                    sequence: first_sequence,
                }
                .emit();
                WalError::FsyncFailed {
                    sequence: first_sequence,
                    source: e,
                }
            })?;
        }

        let total: u64 = batches.iter().map(|b| b.count()).sum();
        self.last_sequence = first_sequence + total.saturating_sub(1);
        Ok(())
    }

    /// Explicitly fsyncs the WAL file, making all buffered appends durable.
    pub fn fsync(&self) -> WalResult<()> {
        self.file.sync_all().map_err(|e| WalError::FsyncFailed {
            sequence: self.last_sequence,
            source: e,
        })
    }
}
