//! Batch group builder
//!
//! A pure function over the head of the writer queue: it decides which
//! contiguous prefix of pending writers can be committed as one WAL record.
//! The only side effect is setting `in_batch_group` on the merged writers;
//! removal from the queue happens later, in `exit` or `start_parallel_run`.
//!
//! The scan stops at the first writer that fails any predicate, never
//! skipping past one, so queue order is preserved inside the group.

use std::collections::VecDeque;
use std::sync::Arc;

use super::writer::Writer;
use crate::batch::WriteBatch;

/// Hard ceiling on the cumulative byte size of a batch group.
pub const MAX_GROUP_BYTES: usize = 1 << 20;

/// Growth allowance over a small initiator's own size, so that merging
/// never adds more than this much tail latency to a small write.
pub const SMALL_WRITE_SLACK_BYTES: usize = 128 << 10;

/// The result of one build: the merged prefix of the queue.
#[derive(Debug)]
pub struct BatchGroup {
    /// Member writers in queue order; the leader is first.
    pub writers: Vec<Arc<Writer>>,
    /// The last writer merged into the group.
    pub last_writer: Arc<Writer>,
    /// Cumulative encoded byte size of the member batches.
    pub size: usize,
}

impl BatchGroup {
    /// Number of writers in the group.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Whether the group holds only the leader.
    pub fn is_singleton(&self) -> bool {
        self.writers.len() == 1
    }

    /// The member batches in commit order.
    pub fn batches(&self) -> Vec<&WriteBatch> {
        self.writers
            .iter()
            .map(|w| w.batch().expect("every group member carries a batch"))
            .collect()
    }

    /// Total operation count across the member batches.
    pub fn total_count(&self) -> u64 {
        self.writers
            .iter()
            .map(|w| w.batch().expect("every group member carries a batch").count())
            .sum()
    }
}

/// Builds the batch group starting at the queue head.
///
/// The head writer (the leader) is always included and must carry a batch.
/// A candidate `w` behind it is merged iff all of the following hold:
///
/// - `w` does not require sync when the leader doesn't (`w.sync` implies
///   `first.sync`)
/// - `w` does not require the WAL when the leader bypasses it
///   (`first.disable_wal` implies `w.disable_wal`)
/// - `w` is at least as patient as the leader
///   (`w.timeout_hint >= first.timeout_hint`)
/// - `w` has no abort-capable callback, and neither does the leader
/// - `w` carries a batch
/// - the cumulative size stays within the cap
///
/// The cap: a leader at or under [`SMALL_WRITE_SLACK_BYTES`] grows by at
/// most that slack over its own size; a larger leader grows to at most
/// [`MAX_GROUP_BYTES`] total.
pub(crate) fn build(writers: &VecDeque<Arc<Writer>>) -> BatchGroup {
    let first = writers
        .front()
        .expect("batch group build requires a non-empty queue");
    let first_batch = first.batch().expect("leader must carry a batch");

    let mut size = first_batch.byte_size();
    let mut max_size = MAX_GROUP_BYTES;
    if size <= SMALL_WRITE_SLACK_BYTES {
        max_size = size + SMALL_WRITE_SLACK_BYTES;
    }

    let mut group = vec![Arc::clone(first)];
    let mut last_writer = Arc::clone(first);

    if !first.has_callback() {
        for w in writers.iter().skip(1) {
            if w.sync() && !first.sync() {
                break;
            }
            if !w.disable_wal() && first.disable_wal() {
                break;
            }
            if w.timeout_hint_us() < first.timeout_hint_us() {
                break;
            }
            if w.has_callback() {
                break;
            }
            let batch = match w.batch() {
                Some(batch) => batch,
                None => break,
            };
            if size + batch.byte_size() > max_size {
                break;
            }
            size += batch.byte_size();
            w.mark_in_batch_group();
            group.push(Arc::clone(w));
            last_writer = Arc::clone(w);
        }
    }

    BatchGroup {
        writers: group,
        last_writer,
        size,
    }
}
