//! Write-Ahead Log subsystem
//!
//! The WAL is the durability mechanism of the write path. The leader of a
//! batch group appends the whole merged group as a single physical record;
//! commit order in the log equals the order writers entered the queue.
//!
//! # Design Principles
//!
//! - One batch group, one record
//! - Checksums on every record
//! - Halt on corruption of a complete record; tolerate a torn final write
//! - Sync writes do not return before fsync

mod checksum;
mod errors;
mod reader;
mod record;
mod writer;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{WalError, WalResult};
pub use reader::WalReader;
pub use record::GroupRecord;
pub use writer::WalWriter;
