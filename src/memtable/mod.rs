//! In-memory writable table
//!
//! One memtable per column family. Entries are keyed by user key plus the
//! sequence number assigned at commit, ordered so that the newest version of
//! a key sorts first; deletions are tombstones. The map must admit
//! concurrent insertion: during a parallel run every group member applies
//! its own batch from its own thread.
//!
//! Flush coordination: the memtable reports when it has outgrown its write
//! buffer, and carries the mark that keeps the flush scheduler enqueue
//! idempotent.

use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use crossbeam_skiplist::SkipMap;

/// Approximate per-entry bookkeeping overhead counted toward the write
/// buffer, covering the sequence number and node framing.
const ENTRY_OVERHEAD: usize = 16;

/// Internal key: user key ascending, sequence descending, so a point lookup
/// lands on the newest version first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionedKey {
    user_key: Vec<u8>,
    sequence: u64,
}

impl Ord for VersionedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for VersionedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The writable in-memory table for one column family.
#[derive(Debug)]
pub struct Memtable {
    /// Versioned entries; `None` values are tombstones.
    data: SkipMap<VersionedKey, Option<Vec<u8>>>,
    approximate_size: AtomicUsize,
    write_buffer_size: usize,
    flush_scheduled: AtomicBool,
}

impl Memtable {
    /// Creates an empty memtable with the given write buffer capacity.
    pub fn new(write_buffer_size: usize) -> Self {
        Self {
            data: SkipMap::new(),
            approximate_size: AtomicUsize::new(0),
            write_buffer_size,
            flush_scheduled: AtomicBool::new(false),
        }
    }

    /// Inserts a value version for `key` at `sequence`.
    pub fn insert(&self, sequence: u64, key: &[u8], value: &[u8]) {
        let charge = key.len() + value.len() + ENTRY_OVERHEAD;
        self.data.insert(
            VersionedKey {
                user_key: key.to_vec(),
                sequence,
            },
            Some(value.to_vec()),
        );
        self.approximate_size
            .fetch_add(charge, AtomicOrdering::Relaxed);
    }

    /// Inserts a tombstone for `key` at `sequence`.
    pub fn delete(&self, sequence: u64, key: &[u8]) {
        let charge = key.len() + ENTRY_OVERHEAD;
        self.data.insert(
            VersionedKey {
                user_key: key.to_vec(),
                sequence,
            },
            None,
        );
        self.approximate_size
            .fetch_add(charge, AtomicOrdering::Relaxed);
    }

    /// Returns the newest value for `key`, or `None` when the key is absent
    /// or its newest version is a tombstone.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let probe = VersionedKey {
            user_key: key.to_vec(),
            sequence: u64::MAX,
        };
        let entry = self.data.lower_bound(Bound::Included(&probe))?;
        if entry.key().user_key != key {
            return None;
        }
        entry.value().clone()
    }

    /// Number of entry versions held, tombstones included.
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    /// Approximate bytes held by this memtable.
    pub fn approximate_size(&self) -> usize {
        self.approximate_size.load(AtomicOrdering::Relaxed)
    }

    /// Whether the memtable has outgrown its write buffer and no flush has
    /// been scheduled for it yet.
    pub fn should_schedule_flush(&self) -> bool {
        self.approximate_size() >= self.write_buffer_size
            && !self.flush_scheduled.load(AtomicOrdering::Acquire)
    }

    /// Records that a flush has been scheduled. Keeps the scheduler enqueue
    /// idempotent across write groups.
    pub fn mark_flush_scheduled(&self) {
        self.flush_scheduled.store(true, AtomicOrdering::Release);
    }

    /// Clears the scheduled mark; called by the flush driver once it takes
    /// ownership of the pending flush.
    pub fn unmark_flush_scheduled(&self) {
        self.flush_scheduled.store(false, AtomicOrdering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_returns_newest_version() {
        let mem = Memtable::new(1 << 20);
        mem.insert(1, b"key", b"old");
        mem.insert(5, b"key", b"new");

        assert_eq!(mem.get(b"key"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_tombstone_hides_older_version() {
        let mem = Memtable::new(1 << 20);
        mem.insert(1, b"key", b"value");
        mem.delete(2, b"key");

        assert_eq!(mem.get(b"key"), None);
        assert_eq!(mem.entry_count(), 2);
    }

    #[test]
    fn test_get_does_not_match_neighbor_key() {
        let mem = Memtable::new(1 << 20);
        mem.insert(1, b"ab", b"1");
        mem.insert(2, b"ac", b"2");

        assert_eq!(mem.get(b"aa"), None);
        assert_eq!(mem.get(b"ab"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_flush_mark_is_sticky_until_cleared() {
        let mem = Memtable::new(8);
        mem.insert(1, b"key", b"a value that exceeds the tiny buffer");

        assert!(mem.should_schedule_flush());
        mem.mark_flush_scheduled();
        assert!(!mem.should_schedule_flush());
        mem.unmark_flush_scheduled();
        assert!(mem.should_schedule_flush());
    }

    #[test]
    fn test_concurrent_insertion_keeps_all_versions() {
        let mem = Arc::new(Memtable::new(1 << 20));
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let mem = Arc::clone(&mem);
            handles.push(thread::spawn(move || {
                for i in 0..50u64 {
                    let seq = t * 50 + i + 1;
                    let key = format!("k{}-{}", t, i);
                    mem.insert(seq, key.as_bytes(), b"v");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(mem.entry_count(), 200);
        assert_eq!(mem.get(b"k3-49"), Some(b"v".to_vec()));
    }
}
