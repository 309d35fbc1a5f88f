//! Write coordination core
//!
//! Serializes many concurrent client writers into one ordered stream that
//! is appended to the write-ahead log and applied to the memtables, while
//! amortizing lock and I/O costs across writers.
//!
//! # Design Principles
//!
//! - FIFO fairness: leadership follows queue entry order
//! - Heterogeneous write options never merge incompatibly
//! - The leader logs; owners apply their own batches, in parallel when the
//!   group allows it
//! - A timed-out follower repairs the queue behind itself
//! - Exactly one waiter becomes the next leader; no stall, no lost wakeup

mod batch_group;
mod errors;
mod queue;
mod writer;

pub use batch_group::{BatchGroup, MAX_GROUP_BYTES, SMALL_WRITE_SLACK_BYTES};
pub use errors::{WriteError, WriteResult};
pub use queue::{EnterOutcome, WriteThread};
pub use writer::{WriteOptions, Writer};
