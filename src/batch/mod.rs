//! Write batch payload
//!
//! A `WriteBatch` is the unit a client hands to the write path: an ordered
//! list of operations against one or more column families. Batches from
//! compatible concurrent writers are merged into a single WAL record; the
//! encoded byte size reported here is what bounds that merge.
//!
//! Encoding is stable and self-framing so a batch can be carried inside a
//! WAL record and decoded on recovery:
//! - batch header: operation count (u32 LE)
//! - per operation: kind (u8), column family id (u32 LE),
//!   key length (u32 LE), key bytes, and for puts a value length (u32 LE)
//!   followed by value bytes

use std::collections::BTreeSet;
use std::io;

use crate::column_family::ColumnFamilyId;

/// Fixed per-batch framing overhead: the operation count header.
const BATCH_HEADER_SIZE: usize = 4;

/// Per-operation framing overhead: kind byte, column family id, key length.
const OP_HEADER_SIZE: usize = 1 + 4 + 4;

/// Framing overhead for a put value: the value length prefix.
const VALUE_HEADER_SIZE: usize = 4;

/// Operation kind tags used in the encoded form.
const KIND_PUT: u8 = 0;
const KIND_DELETE: u8 = 1;

/// A single operation within a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key in a column family.
    Put {
        cf: ColumnFamilyId,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    /// Remove a key from a column family (written as a tombstone).
    Delete { cf: ColumnFamilyId, key: Vec<u8> },
}

impl BatchOp {
    /// Column family this operation targets.
    pub fn cf(&self) -> ColumnFamilyId {
        match self {
            BatchOp::Put { cf, .. } | BatchOp::Delete { cf, .. } => *cf,
        }
    }

    fn encoded_size(&self) -> usize {
        match self {
            BatchOp::Put { key, value, .. } => {
                OP_HEADER_SIZE + key.len() + VALUE_HEADER_SIZE + value.len()
            }
            BatchOp::Delete { key, .. } => OP_HEADER_SIZE + key.len(),
        }
    }
}

/// An ordered list of operations applied atomically by the write path.
///
/// The encoded byte size is maintained incrementally so that the batch
/// group builder can consult it without re-serializing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
    encoded_size: usize,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            encoded_size: BATCH_HEADER_SIZE,
        }
    }

    /// Appends a put against an explicit column family.
    pub fn put_cf(&mut self, cf: ColumnFamilyId, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let op = BatchOp::Put {
            cf,
            key: key.into(),
            value: value.into(),
        };
        self.encoded_size += op.encoded_size();
        self.ops.push(op);
    }

    /// Appends a put against the default column family.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.put_cf(crate::column_family::DEFAULT_CF_ID, key, value);
    }

    /// Appends a delete against an explicit column family.
    pub fn delete_cf(&mut self, cf: ColumnFamilyId, key: impl Into<Vec<u8>>) {
        let op = BatchOp::Delete { cf, key: key.into() };
        self.encoded_size += op.encoded_size();
        self.ops.push(op);
    }

    /// Appends a delete against the default column family.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.delete_cf(crate::column_family::DEFAULT_CF_ID, key);
    }

    /// Number of operations in this batch.
    pub fn count(&self) -> u64 {
        self.ops.len() as u64
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Encoded byte size of this batch, header included.
    pub fn byte_size(&self) -> usize {
        self.encoded_size
    }

    /// Operations in insertion order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// The set of column families touched by this batch.
    pub fn cf_ids(&self) -> BTreeSet<ColumnFamilyId> {
        self.ops.iter().map(BatchOp::cf).collect()
    }

    /// Serializes the batch into `buf` using the stable framing.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());
        for op in &self.ops {
            match op {
                BatchOp::Put { cf, key, value } => {
                    buf.push(KIND_PUT);
                    buf.extend_from_slice(&cf.to_le_bytes());
                    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                    buf.extend_from_slice(key);
                    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
                    buf.extend_from_slice(value);
                }
                BatchOp::Delete { cf, key } => {
                    buf.push(KIND_DELETE);
                    buf.extend_from_slice(&cf.to_le_bytes());
                    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                    buf.extend_from_slice(key);
                }
            }
        }
    }

    /// Decodes one batch from `data` starting at `offset`.
    ///
    /// Returns the decoded batch and the offset just past it.
    pub fn decode_from(data: &[u8], offset: usize) -> io::Result<(Self, usize)> {
        let mut pos = offset;
        let op_count = read_u32(data, &mut pos)?;
        let mut batch = WriteBatch::new();
        for _ in 0..op_count {
            let kind = read_u8(data, &mut pos)?;
            let cf = read_u32(data, &mut pos)?;
            let key = read_bytes(data, &mut pos)?;
            match kind {
                KIND_PUT => {
                    let value = read_bytes(data, &mut pos)?;
                    batch.put_cf(cf, key, value);
                }
                KIND_DELETE => {
                    batch.delete_cf(cf, key);
                }
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unknown batch operation kind: {}", other),
                    ));
                }
            }
        }
        Ok((batch, pos))
    }
}

fn read_u8(data: &[u8], pos: &mut usize) -> io::Result<u8> {
    let byte = *data
        .get(*pos)
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "batch truncated"))?;
    *pos += 1;
    Ok(byte)
}

fn read_u32(data: &[u8], pos: &mut usize) -> io::Result<u32> {
    let end = *pos + 4;
    let slice = data
        .get(*pos..end)
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "batch truncated"))?;
    *pos = end;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_bytes(data: &[u8], pos: &mut usize) -> io::Result<Vec<u8>> {
    let len = read_u32(data, pos)? as usize;
    let end = *pos + len;
    let slice = data
        .get(*pos..end)
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "batch truncated"))?;
    *pos = end;
    Ok(slice.to_vec())
}
