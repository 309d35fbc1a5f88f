//! basaltdb - write coordination core of an embedded log-structured
//! key-value engine
//!
//! Concurrent client writers are serialized into one ordered stream: a
//! leader at the head of the writer queue logs a merged batch group as a
//! single WAL record, then the group applies to the memtables, either
//! serially by the leader or in parallel with each owner applying its own
//! batch.

pub mod batch;
pub mod column_family;
pub mod db;
pub mod flush;
pub mod memtable;
pub mod observability;
pub mod wal;
pub mod write;
