//! Flush scheduling
//!
//! The write path only decides *that* a column family needs flushing; the
//! actual flush is driven elsewhere. This module holds the pending queue the
//! leader submits to after a write group completes. Enqueueing is idempotent
//! so repeated consultation across write groups cannot double-schedule a
//! family; the memtable's scheduled mark provides the cross-group guard.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::column_family::{ColumnFamily, ColumnFamilyId};
use crate::observability::Event;

#[derive(Debug, Default)]
struct FlushQueue {
    queue: VecDeque<Arc<ColumnFamily>>,
    pending: HashSet<ColumnFamilyId>,
}

/// FIFO of column families awaiting flush.
#[derive(Debug, Default)]
pub struct FlushScheduler {
    inner: Mutex<FlushQueue>,
}

impl FlushScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a column family for flushing. A family already pending is
    /// not enqueued twice.
    pub fn schedule_flush(&self, cfd: &Arc<ColumnFamily>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.pending.insert(cfd.id()) {
            inner.queue.push_back(Arc::clone(cfd));
            Event::FlushScheduled { cf: cfd.name() }.emit();
        }
    }

    /// Pops the next family due for flushing, clearing both the pending
    /// entry and the memtable's scheduled mark; ownership of the flush
    /// passes to the caller.
    pub fn take_next(&self) -> Option<Arc<ColumnFamily>> {
        let mut inner = self.inner.lock().unwrap();
        let cfd = inner.queue.pop_front()?;
        inner.pending.remove(&cfd.id());
        cfd.mem().unmark_flush_scheduled();
        Some(cfd)
    }

    /// Number of families currently pending.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Whether no flushes are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }
}
