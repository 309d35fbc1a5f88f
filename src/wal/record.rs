//! WAL group records
//!
//! One batch group, however many writers were merged, becomes exactly one
//! physical record. Record layout (all integers little-endian):
//!
//! - body length (u32)
//! - body: first sequence number (u64), batch count (u32), then each member
//!   batch in commit order, using the batch's own framing
//! - masked CRC32 over the body (u32)
//!
//! The first sequence number plus the cumulative operation count of the
//! member batches determines every operation's sequence number, so replay
//! reproduces exactly the numbering the write path assigned.

use std::io;

use super::checksum::{compute_checksum, verify_checksum};
use crate::batch::WriteBatch;

/// Size of the body-length prefix.
pub(crate) const LEN_PREFIX_SIZE: usize = 4;

/// Size of the trailing checksum.
pub(crate) const CHECKSUM_SIZE: usize = 4;

/// Minimum size of a record body: sequence number plus batch count.
pub(crate) const MIN_BODY_SIZE: usize = 8 + 4;

/// A decoded WAL record: one committed batch group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    /// Sequence number of the first operation in the group.
    pub first_sequence: u64,
    /// Member batches in commit order.
    pub batches: Vec<WriteBatch>,
}

impl GroupRecord {
    /// Total operation count across all member batches.
    pub fn total_count(&self) -> u64 {
        self.batches.iter().map(WriteBatch::count).sum()
    }

    /// Sequence number of the last operation in the group.
    pub fn last_sequence(&self) -> u64 {
        self.first_sequence + self.total_count().saturating_sub(1)
    }

    /// Serializes this record into its on-disk form.
    pub fn serialize(&self) -> Vec<u8> {
        let refs: Vec<&WriteBatch> = self.batches.iter().collect();
        encode_group(self.first_sequence, &refs)
    }

    /// Decodes one record from `data`. Returns the record and the number of
    /// bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < LEN_PREFIX_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record length prefix truncated",
            ));
        }
        let body_len = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        if body_len < MIN_BODY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record body too short: {}", body_len),
            ));
        }
        let total = LEN_PREFIX_SIZE + body_len + CHECKSUM_SIZE;
        if data.len() < total {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record body truncated",
            ));
        }

        let body = &data[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + body_len];
        let stored_crc =
            u32::from_le_bytes(data[LEN_PREFIX_SIZE + body_len..total].try_into().unwrap());
        if !verify_checksum(body, stored_crc) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "record checksum mismatch",
            ));
        }

        let first_sequence = u64::from_le_bytes(body[0..8].try_into().unwrap());
        let batch_count = u32::from_le_bytes(body[8..12].try_into().unwrap());
        let mut batches = Vec::with_capacity(batch_count as usize);
        let mut pos = 12;
        for _ in 0..batch_count {
            let (batch, next) = WriteBatch::decode_from(body, pos)?;
            batches.push(batch);
            pos = next;
        }
        if pos != body_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record body has {} trailing bytes", body_len - pos),
            ));
        }

        Ok((
            Self {
                first_sequence,
                batches,
            },
            total,
        ))
    }
}

/// Encodes a batch group into one physical record without cloning the
/// member batches. This is the append-path entry point.
pub fn encode_group(first_sequence: u64, batches: &[&WriteBatch]) -> Vec<u8> {
    let payload_size: usize = batches.iter().map(|b| b.byte_size()).sum();
    let body_len = MIN_BODY_SIZE + payload_size;
    let mut buf = Vec::with_capacity(LEN_PREFIX_SIZE + body_len + CHECKSUM_SIZE);

    buf.extend_from_slice(&(body_len as u32).to_le_bytes());
    buf.extend_from_slice(&first_sequence.to_le_bytes());
    buf.extend_from_slice(&(batches.len() as u32).to_le_bytes());
    for batch in batches {
        batch.encode_into(&mut buf);
    }

    let crc = compute_checksum(&buf[LEN_PREFIX_SIZE..]);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}
