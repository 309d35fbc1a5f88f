//! Writer records
//!
//! One `Writer` per in-flight client write. The client owns the record (an
//! `Arc` handle) for the whole protocol; the queue only borrows it, so a
//! writer always outlives its queue entry.
//!
//! Two condition variables per writer, on purpose:
//! - `cv` pairs with the queue mutex and carries the leader handoff,
//!   absorption, and promotion signals
//! - `self_cv` pairs with the writer's own `self_mutex` and carries only the
//!   parallel-done signal, so a worker can block for completion without
//!   touching the queue mutex the leader holds during cleanup
//!
//! Lock order is always queue mutex before `self_mutex`, never the reverse.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::errors::WriteResult;
use crate::batch::WriteBatch;
use crate::column_family::ColumnFamilyId;

/// Per-write knobs carried by a writer through the queue.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether the WAL must be fsync'd before the write is acknowledged.
    pub sync: bool,
    /// Whether to bypass the WAL for this write.
    pub disable_wal: bool,
    /// Maximum acceptable queue wait in microseconds; 0 means no timeout.
    pub timeout_hint_us: u64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            sync: false,
            disable_wal: false,
            timeout_hint_us: 0,
        }
    }
}

/// One in-flight client write and its completion state.
#[derive(Debug)]
pub struct Writer {
    /// Write payload; `None` marks a non-batch signal that is never merged.
    batch: Option<WriteBatch>,
    sync: bool,
    disable_wal: bool,
    has_callback: bool,
    timeout_hint_us: u64,

    // Protocol state. Mutated under the queue mutex (or, for `done` in the
    // parallel path, under `self_mutex`); atomics carry the cross-thread
    // visibility.
    in_batch_group: AtomicBool,
    parallel_execute_id: AtomicU64,
    done: AtomicBool,
    /// First sequence number of the batch group, stamped by the leader
    /// before the parallel run starts.
    base_sequence: AtomicU64,

    status: Mutex<WriteResult<()>>,
    cfd_set: Mutex<BTreeSet<ColumnFamilyId>>,

    /// Queue-handoff condvar; always paired with the queue mutex.
    pub(crate) cv: Condvar,
    /// Parallel-done handshake, decoupled from the queue mutex.
    pub(crate) self_mutex: Mutex<()>,
    pub(crate) self_cv: Condvar,
}

impl Writer {
    /// Creates a writer for a plain write.
    pub fn new(batch: Option<WriteBatch>, options: &WriteOptions) -> Self {
        Self::build(batch, options, false)
    }

    /// Creates a writer whose owner runs a callback that may abort the
    /// write. Such a writer is never merged with others.
    pub fn with_callback(batch: Option<WriteBatch>, options: &WriteOptions) -> Self {
        Self::build(batch, options, true)
    }

    fn build(batch: Option<WriteBatch>, options: &WriteOptions, has_callback: bool) -> Self {
        Self {
            batch,
            sync: options.sync,
            disable_wal: options.disable_wal,
            has_callback,
            timeout_hint_us: options.timeout_hint_us,
            in_batch_group: AtomicBool::new(false),
            parallel_execute_id: AtomicU64::new(0),
            done: AtomicBool::new(false),
            base_sequence: AtomicU64::new(0),
            status: Mutex::new(Ok(())),
            cfd_set: Mutex::new(BTreeSet::new()),
            cv: Condvar::new(),
            self_mutex: Mutex::new(()),
            self_cv: Condvar::new(),
        }
    }

    /// The write payload, if any.
    pub fn batch(&self) -> Option<&WriteBatch> {
        self.batch.as_ref()
    }

    /// Whether this write requires an fsync'd WAL append.
    pub fn sync(&self) -> bool {
        self.sync
    }

    /// Whether this write bypasses the WAL.
    pub fn disable_wal(&self) -> bool {
        self.disable_wal
    }

    /// Whether this write carries an abort-capable callback.
    pub fn has_callback(&self) -> bool {
        self.has_callback
    }

    /// Queue-wait budget in microseconds; 0 means unbounded.
    pub fn timeout_hint_us(&self) -> u64 {
        self.timeout_hint_us
    }

    /// Absolute deadline derived from the timeout hint, `None` when
    /// unbounded.
    pub fn deadline(&self) -> Option<Instant> {
        if self.timeout_hint_us == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_micros(self.timeout_hint_us))
        }
    }

    /// Whether the write has reached its terminal state.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Slot in the current parallel run; 0 means not promoted.
    pub fn parallel_execute_id(&self) -> u64 {
        self.parallel_execute_id.load(Ordering::Acquire)
    }

    /// Whether a leader has merged this write into its batch group.
    pub fn in_batch_group(&self) -> bool {
        self.in_batch_group.load(Ordering::Acquire)
    }

    /// First sequence number of the batch group this writer belongs to.
    pub fn base_sequence(&self) -> u64 {
        self.base_sequence.load(Ordering::Acquire)
    }

    /// Final outcome of this write.
    pub fn status(&self) -> WriteResult<()> {
        self.status.lock().unwrap().clone()
    }

    /// Records the outcome of this write.
    pub fn set_status(&self, status: WriteResult<()>) {
        *self.status.lock().unwrap() = status;
    }

    /// Records a column family touched while applying this writer's batch.
    pub fn record_cf(&self, id: ColumnFamilyId) {
        self.cfd_set.lock().unwrap().insert(id);
    }

    /// Snapshot of the column families touched so far.
    pub fn cf_ids(&self) -> BTreeSet<ColumnFamilyId> {
        self.cfd_set.lock().unwrap().clone()
    }

    /// Merges another writer's touched column families into this one's.
    pub(crate) fn absorb_cf_ids(&self, other: &Writer) {
        let theirs = other.cf_ids();
        self.cfd_set.lock().unwrap().extend(theirs);
    }

    pub(crate) fn mark_in_batch_group(&self) {
        self.in_batch_group.store(true, Ordering::Release);
    }

    pub(crate) fn set_parallel_execute_id(&self, id: u64) {
        self.parallel_execute_id.store(id, Ordering::Release);
    }

    pub(crate) fn set_base_sequence(&self, sequence: u64) {
        self.base_sequence.store(sequence, Ordering::Release);
    }

    /// Marks the write complete. Set exactly once, never cleared.
    pub(crate) fn mark_done(&self) {
        let was_done = self.done.swap(true, Ordering::AcqRel);
        debug_assert!(!was_done, "writer marked done twice");
    }
}
