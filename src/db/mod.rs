//! Engine front-end for the write pipeline
//!
//! Ties the write coordination core to its collaborators: the WAL appender,
//! the per-column-family memtables, and the flush scheduler. One `write`
//! call walks the whole protocol: enter the queue, then depending on the
//! outcome either return an absorbed result, apply one batch as a parallel
//! worker, or drive the leader path (build the group, append one WAL
//! record, apply, clean up, hand off leadership).
//!
//! Sequence numbers are allocated by the leader before application, so the
//! WAL order fixes the visible numbering even when memtable application
//! interleaves across the group.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::batch::{BatchOp, WriteBatch};
use crate::column_family::{ColumnFamilyId, ColumnFamilySet};
use crate::flush::FlushScheduler;
use crate::observability::Event;
use crate::wal::{WalReader, WalWriter};
use crate::write::{EnterOutcome, WriteError, WriteOptions, WriteResult, WriteThread, Writer};

/// Engine-wide options fixed at open.
#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Per-memtable capacity before a flush is scheduled.
    pub write_buffer_size: usize,
    /// Whether multi-writer groups apply their batches concurrently.
    pub allow_parallel_memtable_write: bool,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            write_buffer_size: 4 << 20,
            allow_parallel_memtable_write: true,
        }
    }
}

/// An open engine instance: write coordination plus its collaborators.
pub struct Db {
    options: DbOptions,
    cfds: ColumnFamilySet,
    wal: Mutex<WalWriter>,
    write_thread: WriteThread,
    flush_scheduler: FlushScheduler,
    /// Last sequence number made visible; advanced by the leader at commit.
    last_sequence: AtomicU64,
}

impl Db {
    /// Opens an engine under `data_dir` with the given extra column
    /// families, replaying any existing WAL into the memtables.
    pub fn open(data_dir: &Path, options: DbOptions, extra_cfs: &[&str]) -> WriteResult<Self> {
        let cfds = ColumnFamilySet::new(extra_cfs, options.write_buffer_size);
        let wal = WalWriter::open(data_dir)?;

        let db = Self {
            last_sequence: AtomicU64::new(wal.last_sequence_number()),
            options,
            cfds,
            wal: Mutex::new(wal),
            write_thread: WriteThread::new(),
            flush_scheduler: FlushScheduler::new(),
        };
        db.replay_wal(data_dir)?;
        Ok(db)
    }

    fn replay_wal(&self, data_dir: &Path) -> WriteResult<()> {
        let mut reader = WalReader::open_from_data_dir(data_dir)?;
        while let Some(record) = reader.read_next()? {
            let mut sequence = record.first_sequence;
            for batch in &record.batches {
                self.check_column_families(batch)?;
                sequence = self.apply_ops(batch, sequence, None);
            }
        }
        Ok(())
    }

    /// Applies a batch of writes with the given per-write options.
    ///
    /// Blocks until the write is durable to the extent the options demand.
    /// The calling thread takes whatever role the queue assigns it: it may
    /// return early because another leader committed on its behalf, apply
    /// its own batch as a parallel worker, or commit a whole group as
    /// leader.
    pub fn write(&self, options: &WriteOptions, batch: WriteBatch) -> WriteResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.check_column_families(&batch)?;
        let writer = Arc::new(Writer::new(Some(batch), options));
        self.write_writer(writer)
    }

    /// Applies a batch guarded by a callback that runs after leadership is
    /// acquired and before anything is logged. A rejected callback aborts
    /// only this write; callback writers are never merged with others.
    pub fn write_with_callback<F>(
        &self,
        options: &WriteOptions,
        batch: WriteBatch,
        callback: F,
    ) -> WriteResult<()>
    where
        F: FnOnce() -> WriteResult<()>,
    {
        if batch.is_empty() {
            return Ok(());
        }
        self.check_column_families(&batch)?;
        let writer = Arc::new(Writer::with_callback(Some(batch), options));

        match self.write_thread.enter(&writer, writer.deadline())? {
            EnterOutcome::Leader => {}
            // A callback writer is never merged, so it can only lead or
            // time out.
            outcome => unreachable!("callback writer resolved as {:?}", outcome),
        }

        if let Err(rejection) = callback() {
            let status = Err(WriteError::CallbackRejected(rejection.to_string()));
            self.write_thread.exit(&writer, &writer, status.clone());
            return status;
        }
        self.leader_commit(writer)
    }

    fn write_writer(&self, writer: Arc<Writer>) -> WriteResult<()> {
        match self.write_thread.enter(&writer, writer.deadline())? {
            EnterOutcome::Absorbed => Ok(()),
            EnterOutcome::ParallelWorker => {
                let status = self.apply_writer_batch(&writer);
                writer.set_status(status.clone());
                let was_last = self.write_thread.report_parallel_finish();
                self.write_thread.end_parallel_run(&writer, was_last);
                status
            }
            EnterOutcome::Leader => self.leader_commit(writer),
        }
    }

    /// The leader path: log the merged group as one record, then apply it
    /// either in parallel (each owner applies its own batch) or serially
    /// (the leader applies all of them), and finally release the group.
    fn leader_commit(&self, leader: Arc<Writer>) -> WriteResult<()> {
        let group = self.write_thread.build_batch_group();
        let base_sequence = self.last_sequence.load(Ordering::Acquire) + 1;
        let total_count = group.total_count();

        let mut status: WriteResult<()> = Ok(());
        if !leader.disable_wal() {
            let batches = group.batches();
            let mut wal = self.wal.lock().unwrap();
            status = wal
                .append_group(base_sequence, &batches, leader.sync())
                .map_err(Into::into);
        }

        if status.is_ok() && self.options.allow_parallel_memtable_write && group.len() > 1 {
            for member in &group.writers {
                member.set_base_sequence(base_sequence);
            }
            self.write_thread
                .start_parallel_run(&leader, group.len() as u32, &group.last_writer);

            let my_status = self.apply_writer_batch(&leader);
            leader.set_status(my_status.clone());
            if !self.write_thread.report_parallel_finish() {
                self.write_thread.leader_wait_end_parallel(&leader);
            }
            self.write_thread.leader_end_parallel(
                &leader,
                &group.last_writer,
                &self.cfds,
                &self.flush_scheduler,
            );
            self.last_sequence
                .store(base_sequence + total_count - 1, Ordering::Release);
            return my_status;
        }

        if status.is_ok() {
            let mut sequence = base_sequence;
            for member in &group.writers {
                let batch = member.batch().expect("every group member carries a batch");
                sequence = self.apply_ops(batch, sequence, Some(&leader));
            }
            self.last_sequence.store(sequence - 1, Ordering::Release);
            self.maybe_schedule_flushes(&leader);
        }

        self.write_thread.exit(&leader, &group.last_writer, status.clone());
        status
    }

    /// Applies one promoted writer's own batch at its slot in the group's
    /// sequence range, recording touched column families on that writer.
    /// The per-writer status seam: whatever this returns is the status that
    /// writer reports before finishing its parallel run.
    fn apply_writer_batch(&self, w: &Arc<Writer>) -> WriteResult<()> {
        let batch = w.batch().expect("parallel worker carries a batch");
        let sequence = w.base_sequence() + w.parallel_execute_id() - 1;
        self.apply_ops(batch, sequence, Some(w));
        Ok(())
    }

    /// Applies a batch's operations starting at `sequence`; returns the
    /// sequence number just past the batch. Column families were validated
    /// before the writer entered the queue, so application cannot fail.
    fn apply_ops(&self, batch: &WriteBatch, mut sequence: u64, record_into: Option<&Writer>) -> u64 {
        for op in batch.ops() {
            let cfd = self
                .cfds
                .family(op.cf())
                .expect("column families validated before entry");
            match op {
                BatchOp::Put { key, value, .. } => cfd.mem().insert(sequence, key, value),
                BatchOp::Delete { key, .. } => cfd.mem().delete(sequence, key),
            }
            if let Some(w) = record_into {
                w.record_cf(op.cf());
            }
            sequence += 1;
        }
        sequence
    }

    fn check_column_families(&self, batch: &WriteBatch) -> WriteResult<()> {
        for id in batch.cf_ids() {
            if self.cfds.family(id).is_none() {
                Event::UnknownColumnFamily { cf: id }.emit();
                return Err(WriteError::UnknownColumnFamily(id));
            }
        }
        Ok(())
    }

    fn maybe_schedule_flushes(&self, w: &Writer) {
        for id in w.cf_ids() {
            if let Some(cfd) = self.cfds.family(id) {
                if cfd.mem().should_schedule_flush() {
                    self.flush_scheduler.schedule_flush(cfd);
                    cfd.mem().mark_flush_scheduled();
                }
            }
        }
    }

    /// Reads the newest value for `key` in the default column family.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.get_cf(crate::column_family::DEFAULT_CF_ID, key)
    }

    /// Reads the newest value for `key` in the given column family.
    pub fn get_cf(&self, cf: ColumnFamilyId, key: &[u8]) -> Option<Vec<u8>> {
        self.cfds.family(cf)?.mem().get(key)
    }

    /// The column family registry.
    pub fn column_families(&self) -> &ColumnFamilySet {
        &self.cfds
    }

    /// The pending-flush queue.
    pub fn flush_scheduler(&self) -> &FlushScheduler {
        &self.flush_scheduler
    }

    /// Last sequence number made visible by a committed write.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}
