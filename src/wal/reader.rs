//! WAL reader
//!
//! Sequential replay of group records with strict corruption detection:
//!
//! - A complete record failing its checksum halts replay with a corruption
//!   error; no skipping, no repair
//! - A truncated trailing record is a torn final write and ends replay
//!   cleanly; everything before it was fully committed
//! - First sequence numbers must be strictly increasing across records

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};
use super::record::{GroupRecord, CHECKSUM_SIZE, LEN_PREFIX_SIZE, MIN_BODY_SIZE};

/// WAL reader for sequential replay.
pub struct WalReader {
    /// Path to the WAL file
    wal_path: PathBuf,
    /// Buffered reader for sequential reads
    reader: BufReader<File>,
    /// Current byte offset in the file
    current_offset: u64,
    /// Total file size at open
    file_size: u64,
    /// Last sequence number of the last successfully read record
    last_sequence: u64,
}

impl WalReader {
    /// Opens a WAL file for reading.
    pub fn open(wal_path: &Path) -> WalResult<Self> {
        let file = File::open(wal_path).map_err(|e| WalError::Unavailable {
            context: format!("failed to open WAL file: {}", wal_path.display()),
            source: e,
        })?;
        let metadata = file.metadata().map_err(|e| WalError::Unavailable {
            context: "failed to read WAL metadata".to_string(),
            source: e,
        })?;

        Ok(Self {
            wal_path: wal_path.to_path_buf(),
            file_size: metadata.len(),
            reader: BufReader::new(file),
            current_offset: 0,
            last_sequence: 0,
        })
    }

    /// Opens the WAL under a data directory, at `<data_dir>/wal/wal.log`.
    pub fn open_from_data_dir(data_dir: &Path) -> WalResult<Self> {
        let wal_path = data_dir.join("wal").join("wal.log");
        Self::open(&wal_path)
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the last sequence number successfully replayed.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Reads the next group record.
    ///
    /// Returns `Ok(None)` at clean end of file and on a torn final record;
    /// returns a corruption error when a complete record fails validation.
    pub fn read_next(&mut self) -> WalResult<Option<GroupRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }
        let remaining = self.file_size - self.current_offset;

        // Torn final write: not even a length prefix made it to disk.
        if remaining < LEN_PREFIX_SIZE as u64 {
            return Ok(None);
        }

        let mut len_buf = [0u8; LEN_PREFIX_SIZE];
        self.reader
            .read_exact(&mut len_buf)
            .map_err(|e| WalError::CorruptRecord {
                offset: self.current_offset,
                reason: format!("failed to read record length: {}", e),
            })?;
        let body_len = u32::from_le_bytes(len_buf) as u64;

        if body_len < MIN_BODY_SIZE as u64 {
            return Err(WalError::CorruptRecord {
                offset: self.current_offset,
                reason: format!("invalid record body length: {}", body_len),
            });
        }

        let record_len = LEN_PREFIX_SIZE as u64 + body_len + CHECKSUM_SIZE as u64;
        if record_len > remaining {
            // The record never finished landing on disk.
            return Ok(None);
        }

        let mut record_buf = vec![0u8; record_len as usize];
        record_buf[0..LEN_PREFIX_SIZE].copy_from_slice(&len_buf);
        self.reader
            .read_exact(&mut record_buf[LEN_PREFIX_SIZE..])
            .map_err(|e| WalError::CorruptRecord {
                offset: self.current_offset,
                reason: format!("failed to read record body: {}", e),
            })?;

        let (record, bytes_consumed) =
            GroupRecord::deserialize(&record_buf).map_err(|e| WalError::CorruptRecord {
                offset: self.current_offset,
                reason: e.to_string(),
            })?;

        if record.first_sequence <= self.last_sequence {
            return Err(WalError::CorruptRecord {
                offset: self.current_offset,
                reason: format!(
                    "non-increasing sequence: last {}, record starts at {}",
                    self.last_sequence, record.first_sequence
                ),
            });
        }

        self.current_offset += bytes_consumed as u64;
        self.last_sequence = record.last_sequence();
        Ok(Some(record))
    }

    /// Reads all remaining records, for full replay.
    pub fn read_all(&mut self) -> WalResult<Vec<GroupRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
