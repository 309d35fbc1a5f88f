//! Writer queue and leader/follower handshake
//!
//! Many concurrent client threads are serialized into a single ordered
//! stream: each thread enqueues a `Writer`, and at any moment exactly one of
//! them, the head of the queue, acts as leader, committing on behalf of
//! the contiguous prefix of compatible followers behind it. Commit order
//! equals queue entry order, up to the granularity of batch groups.
//!
//! After the leader has logged a multi-writer group it can hand each member
//! batch back to its owner for in-memory application in parallel. During
//! that phase the last merged writer deliberately stays at the head of the
//! queue: it is the barrier that keeps newcomers from becoming leader until
//! the leader's cleanup runs.
//!
//! Wake-up discipline: every completed writer gets a signal after its
//! `done` flag is set, and whenever the queue head changes hands the new
//! head is signaled. A follower that times out and removes itself mid-queue
//! must re-signal the head for the same reason.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::batch_group::{self, BatchGroup};
use super::errors::{WriteError, WriteResult};
use super::writer::Writer;
use crate::column_family::ColumnFamilySet;
use crate::flush::FlushScheduler;
use crate::observability::Event;

/// How `enter` resolved for the calling writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The writer reached the head of the queue; the caller drives the
    /// leader path.
    Leader,
    /// A leader committed on this writer's behalf; the write is complete.
    Absorbed,
    /// The writer was promoted into a parallel run; the caller must apply
    /// its own batch and then call `end_parallel_run`.
    ParallelWorker,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Pending writers, head first. The head is the current or next leader.
    writers: VecDeque<Arc<Writer>>,
    /// Members of the current parallel run; the leader is first.
    parallel_writers: Vec<Arc<Writer>>,
}

/// The write coordination core: one queue, one mutex, one leader at a time.
///
/// The mutex owned here protects both lists and doubles as the database
/// mutex: all remaining engine state is either immutable after open or
/// separately synchronized.
#[derive(Debug, Default)]
pub struct WriteThread {
    state: Mutex<QueueState>,
    /// Parallel workers that have not yet reported completion.
    unfinished_threads: AtomicU32,
}

impl WriteThread {
    /// Creates an empty write thread.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `w` and blocks until it is absorbed, promoted, or becomes
    /// leader, or, with a deadline set, until that deadline passes while it
    /// is still an unmerged follower.
    ///
    /// A timed-out writer that a leader has already merged must not
    /// abandon: the leader is about to commit on its behalf, so the wait
    /// becomes unbounded and the writer sees the protocol through.
    pub fn enter(&self, w: &Arc<Writer>, mut deadline: Option<Instant>) -> WriteResult<EnterOutcome> {
        let mut state = self.state.lock().unwrap();
        state.writers.push_back(Arc::clone(w));

        let mut timed_out = false;
        loop {
            let front = state
                .writers
                .front()
                .expect("queue holds at least the waiting writer");
            if w.is_done() || w.parallel_execute_id() > 0 || Arc::ptr_eq(w, front) {
                break;
            }
            match deadline {
                None => {
                    state = w.cv.wait(state).unwrap();
                }
                Some(at) => {
                    let now = Instant::now();
                    let fired = if now >= at {
                        true
                    } else {
                        let (guard, result) = w.cv.wait_timeout(state, at - now).unwrap();
                        state = guard;
                        result.timed_out()
                    };
                    if fired {
                        if w.in_batch_group() {
                            deadline = None;
                        } else {
                            timed_out = true;
                            break;
                        }
                    }
                }
            }
        }

        if !w.is_done() && w.parallel_execute_id() > 0 {
            return Ok(EnterOutcome::ParallelWorker);
        }

        if timed_out {
            let position = state
                .writers
                .iter()
                .position(|queued| Arc::ptr_eq(queued, w))
                .expect("timed-out writer is still queued");
            state.writers.remove(position);
            // The new head may be blocked in an untimed wait with no one
            // else left to signal it.
            if let Some(head) = state.writers.front() {
                head.cv.notify_one();
            }
            Event::WriteTimeout {
                waited_us: w.timeout_hint_us(),
            }
            .emit();
            return Err(WriteError::TimedOut);
        }

        if w.is_done() {
            w.status()?;
            return Ok(EnterOutcome::Absorbed);
        }
        Ok(EnterOutcome::Leader)
    }

    /// Builds the batch group starting at the current head. Leader only.
    pub fn build_batch_group(&self) -> BatchGroup {
        let state = self.state.lock().unwrap();
        batch_group::build(&state.writers)
    }

    /// Moves the current batch group into the parallel run: assigns each
    /// member its execution slot, wakes the followers, and pops everyone
    /// except `last_writer`, which stays at the head as the barrier.
    ///
    /// Slot ids start at 1 and advance by each batch's operation count, so
    /// a slot id is also the member's offset into the group's sequence
    /// number range.
    pub fn start_parallel_run(&self, leader: &Arc<Writer>, num_threads: u32, last_writer: &Arc<Writer>) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(
            self.unfinished_threads.load(Ordering::Acquire),
            0,
            "previous parallel run still outstanding"
        );
        self.unfinished_threads.store(num_threads, Ordering::Release);

        let mut parallel_id: u64 = 1;
        loop {
            let front = Arc::clone(
                state
                    .writers
                    .front()
                    .expect("parallel run consumes queued writers"),
            );
            front.set_parallel_execute_id(parallel_id);
            parallel_id += front
                .batch()
                .expect("every group member carries a batch")
                .count();
            state.parallel_writers.push(Arc::clone(&front));
            if !Arc::ptr_eq(&front, leader) {
                front.cv.notify_one();
            }
            if Arc::ptr_eq(&front, last_writer) {
                // Leave the last writer queued so no newcomer can become
                // leader before cleanup.
                break;
            }
            state.writers.pop_front();
        }
        assert_eq!(state.parallel_writers.len() as u32, num_threads);
    }

    /// Reports this worker's batch as applied. Returns true iff the caller
    /// was the last outstanding worker; that caller wakes the leader.
    pub fn report_parallel_finish(&self) -> bool {
        let previous = self.unfinished_threads.fetch_sub(1, Ordering::AcqRel);
        assert!(previous >= 1, "parallel finish without outstanding workers");
        previous == 1
    }

    /// Leader blocks until every parallel worker has reported completion.
    pub fn leader_wait_end_parallel(&self, leader: &Arc<Writer>) {
        let mut state = self.state.lock().unwrap();
        while self.unfinished_threads.load(Ordering::Acquire) != 0 {
            state = leader.cv.wait(state).unwrap();
        }
        drop(state);
    }

    /// Leader cleanup after a parallel run: union the members' touched
    /// column families, release each member through its own mutex/condvar
    /// pair, consult the flush scheduler, drop the barrier, and hand
    /// leadership to the next head if any.
    pub fn leader_end_parallel(
        &self,
        leader: &Arc<Writer>,
        last_writer: &Arc<Writer>,
        cfds: &ColumnFamilySet,
        flush_scheduler: &FlushScheduler,
    ) {
        let mut state = self.state.lock().unwrap();
        assert_eq!(
            self.unfinished_threads.load(Ordering::Acquire),
            0,
            "parallel run not finished"
        );

        for member in &state.parallel_writers {
            if Arc::ptr_eq(member, leader) {
                continue;
            }
            leader.absorb_cf_ids(member);
            // Lock order: queue mutex, then the member's self mutex.
            let _held = member.self_mutex.lock().unwrap();
            member.mark_done();
            member.self_cv.notify_one();
        }

        assert!(!state.writers.is_empty(), "barrier writer missing");
        {
            let barrier = state
                .parallel_writers
                .last()
                .expect("parallel run has members");
            assert!(Arc::ptr_eq(barrier, state.writers.front().unwrap()));
            assert!(Arc::ptr_eq(barrier, last_writer));
        }

        for id in leader.cf_ids() {
            if let Some(cfd) = cfds.family(id) {
                if cfd.mem().should_schedule_flush() {
                    flush_scheduler.schedule_flush(cfd);
                    cfd.mem().mark_flush_scheduled();
                }
            }
        }

        state.parallel_writers.clear();
        state.writers.pop_front();
        if let Some(head) = state.writers.front() {
            head.cv.notify_one();
        }
    }

    /// Called by a non-leader parallel worker once its own application is
    /// done. Optionally wakes the leader, then blocks on the writer's own
    /// condvar until the leader marks it done.
    pub fn end_parallel_run(&self, w: &Arc<Writer>, need_wake_up_leader: bool) {
        if need_wake_up_leader {
            let state = self.state.lock().unwrap();
            // The leader may already have observed the zero counter and
            // moved on; a stray signal is harmless because it re-tests its
            // predicate under the mutex.
            if let Some(lead) = state.parallel_writers.first() {
                lead.cv.notify_one();
            }
        }

        let mut held = w.self_mutex.lock().unwrap();
        while !w.is_done() {
            held = w.self_cv.wait(held).unwrap();
        }
        drop(held);
    }

    /// Serial completion path: the leader committed the whole group itself.
    /// Pops every writer through `last_writer`, finalizing the absorbed
    /// ones with the leader's status, then signals the next head if any.
    pub fn exit(&self, leader: &Arc<Writer>, last_writer: &Arc<Writer>, status: WriteResult<()>) {
        let mut state = self.state.lock().unwrap();
        while let Some(ready) = state.writers.pop_front() {
            if !Arc::ptr_eq(&ready, leader) {
                ready.set_status(status.clone());
                ready.mark_done();
                ready.cv.notify_one();
            }
            if Arc::ptr_eq(&ready, last_writer) {
                break;
            }
        }
        if let Some(head) = state.writers.front() {
            head.cv.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::writer::WriteOptions;
    use crate::batch::WriteBatch;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn make_writer(options: &WriteOptions) -> Arc<Writer> {
        let mut batch = WriteBatch::new();
        batch.put(b"key".to_vec(), b"value".to_vec());
        Arc::new(Writer::new(Some(batch), options))
    }

    fn queue_depth(thread: &WriteThread) -> usize {
        thread.state.lock().unwrap().writers.len()
    }

    fn wait_for_depth(thread: &WriteThread, depth: usize) {
        for _ in 0..2000 {
            if queue_depth(thread) >= depth {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("queue never reached depth {}", depth);
    }

    // =========================================================================
    // Leader election and absorption
    // =========================================================================

    #[test]
    fn test_first_writer_becomes_leader_immediately() {
        let thread = WriteThread::new();
        let w = make_writer(&WriteOptions::default());

        let outcome = thread.enter(&w, None).unwrap();
        assert_eq!(outcome, EnterOutcome::Leader);

        let group = thread.build_batch_group();
        assert!(group.is_singleton());
        thread.exit(&w, &group.last_writer, Ok(()));
        assert_eq!(queue_depth(&thread), 0);
    }

    #[test]
    fn test_absorbed_followers_receive_leader_status() {
        let thread = Arc::new(WriteThread::new());
        let leader = make_writer(&WriteOptions::default());
        assert_eq!(thread.enter(&leader, None).unwrap(), EnterOutcome::Leader);

        let mut followers = Vec::new();
        for _ in 0..3 {
            let thread = Arc::clone(&thread);
            let w = make_writer(&WriteOptions::default());
            let handle = {
                let w = Arc::clone(&w);
                thread::spawn(move || thread.enter(&w, None))
            };
            followers.push((w, handle));
        }
        wait_for_depth(&thread, 4);

        let group = thread.build_batch_group();
        assert_eq!(group.len(), 4);
        thread.exit(&leader, &group.last_writer, Ok(()));

        for (w, handle) in followers {
            assert_eq!(handle.join().unwrap().unwrap(), EnterOutcome::Absorbed);
            assert!(w.is_done());
        }
        assert_eq!(queue_depth(&thread), 0);
    }

    #[test]
    fn test_absorbed_follower_sees_leader_error() {
        let thread = Arc::new(WriteThread::new());
        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let follower = make_writer(&WriteOptions::default());
        let handle = {
            let thread = Arc::clone(&thread);
            let follower = Arc::clone(&follower);
            thread::spawn(move || thread.enter(&follower, None))
        };
        wait_for_depth(&thread, 2);

        let group = thread.build_batch_group();
        assert_eq!(group.len(), 2);
        let failure = WriteError::Wal {
            code: "BASALT_WAL_APPEND_FAILED",
            message: "disk error".to_string(),
        };
        thread.exit(&leader, &group.last_writer, Err(failure.clone()));

        assert_eq!(handle.join().unwrap(), Err(failure));
    }

    #[test]
    fn test_fifo_leadership_order() {
        let thread = Arc::new(WriteThread::new());
        let leader_log = Arc::new(Mutex::new(Vec::new()));

        let first = make_writer(&WriteOptions::default());
        assert_eq!(thread.enter(&first, None).unwrap(), EnterOutcome::Leader);

        let mut handles = Vec::new();
        for i in 0..3u32 {
            let thread_handle = Arc::clone(&thread);
            let log = Arc::clone(&leader_log);
            // Callback writers are never merged, so each must take its own
            // turn as leader.
            let w = {
                let mut batch = WriteBatch::new();
                batch.put(b"key".to_vec(), b"value".to_vec());
                Arc::new(Writer::with_callback(Some(batch), &WriteOptions::default()))
            };
            handles.push(thread::spawn(move || {
                let outcome = thread_handle.enter(&w, None).unwrap();
                assert_eq!(outcome, EnterOutcome::Leader);
                log.lock().unwrap().push(i);
                let group = thread_handle.build_batch_group();
                thread_handle.exit(&w, &group.last_writer, Ok(()));
            }));
            // Stagger entry so queue order is deterministic.
            wait_for_depth(&thread, 2 + i as usize);
        }

        let group = thread.build_batch_group();
        assert!(group.is_singleton());
        thread.exit(&first, &group.last_writer, Ok(()));

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*leader_log.lock().unwrap(), vec![0, 1, 2]);
    }

    // =========================================================================
    // Timeouts
    // =========================================================================

    #[test]
    fn test_follower_timeout_while_leader_stalls() {
        let thread = Arc::new(WriteThread::new());
        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let hurried = make_writer(&WriteOptions {
            sync: true, // never merged into the non-sync leader
            timeout_hint_us: 2_000,
            ..WriteOptions::default()
        });
        let deadline = hurried.deadline();
        let result = thread.enter(&hurried, deadline);

        assert_eq!(result, Err(WriteError::TimedOut));
        assert_eq!(queue_depth(&thread), 1);

        let group = thread.build_batch_group();
        thread.exit(&leader, &group.last_writer, Ok(()));
        assert_eq!(queue_depth(&thread), 0);
    }

    #[test]
    fn test_mid_queue_timeout_signals_new_head() {
        let thread = Arc::new(WriteThread::new());
        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        // B will time out; C waits untimed behind it and must still make
        // progress once the stalled leader finishes.
        let b = make_writer(&WriteOptions {
            sync: true,
            timeout_hint_us: 200_000,
            ..WriteOptions::default()
        });
        let b_handle = {
            let thread = Arc::clone(&thread);
            let b = Arc::clone(&b);
            let deadline = b.deadline();
            thread::spawn(move || thread.enter(&b, deadline))
        };
        wait_for_depth(&thread, 2);

        let c = make_writer(&WriteOptions {
            sync: true,
            ..WriteOptions::default()
        });
        let c_handle = {
            let thread = Arc::clone(&thread);
            let c = Arc::clone(&c);
            thread::spawn(move || {
                let outcome = thread.enter(&c, None).unwrap();
                assert_eq!(outcome, EnterOutcome::Leader);
                let group = thread.build_batch_group();
                thread.exit(&c, &group.last_writer, Ok(()));
            })
        };
        wait_for_depth(&thread, 3);

        assert_eq!(b_handle.join().unwrap(), Err(WriteError::TimedOut));

        // Leader finishes only after B has already removed itself.
        let group = thread.build_batch_group();
        assert!(group.is_singleton());
        thread.exit(&leader, &group.last_writer, Ok(()));

        c_handle.join().unwrap();
        assert_eq!(queue_depth(&thread), 0);
    }

    #[test]
    fn test_timed_out_writer_already_merged_waits_for_completion() {
        let thread = Arc::new(WriteThread::new());
        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let b = make_writer(&WriteOptions {
            timeout_hint_us: 50_000,
            ..WriteOptions::default()
        });
        let b_handle = {
            let thread = Arc::clone(&thread);
            let b = Arc::clone(&b);
            let deadline = b.deadline();
            thread::spawn(move || thread.enter(&b, deadline))
        };
        wait_for_depth(&thread, 2);

        // Merge B, then let its deadline fire before the leader commits.
        let group = thread.build_batch_group();
        assert_eq!(group.len(), 2);
        assert!(b.in_batch_group());
        thread::sleep(Duration::from_millis(80));

        thread.exit(&leader, &group.last_writer, Ok(()));

        // B must not report TimedOut: the leader committed on its behalf.
        assert_eq!(b_handle.join().unwrap(), Ok(EnterOutcome::Absorbed));
        assert!(b.is_done());
    }

    // =========================================================================
    // Parallel run
    // =========================================================================

    #[test]
    fn test_parallel_run_promotes_followers_and_keeps_barrier() {
        let thread = Arc::new(WriteThread::new());
        let cfds = ColumnFamilySet::new(&[], 1 << 20);
        let scheduler = FlushScheduler::new();

        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let barrier = Arc::new(Barrier::new(3));
        let mut worker_handles = Vec::new();
        for _ in 0..2 {
            let thread = Arc::clone(&thread);
            let barrier = Arc::clone(&barrier);
            let w = make_writer(&WriteOptions::default());
            let w_clone = Arc::clone(&w);
            worker_handles.push((
                w,
                thread::spawn(move || {
                    let outcome = thread.enter(&w_clone, None).unwrap();
                    assert_eq!(outcome, EnterOutcome::ParallelWorker);
                    assert!(w_clone.parallel_execute_id() > 0);
                    // Apply own batch here, then report.
                    w_clone.record_cf(0);
                    barrier.wait();
                    let last = thread.report_parallel_finish();
                    thread.end_parallel_run(&w_clone, last);
                    assert!(w_clone.is_done());
                }),
            ));
        }
        wait_for_depth(&thread, 3);

        let group = thread.build_batch_group();
        assert_eq!(group.len(), 3);
        thread.start_parallel_run(&leader, 3, &group.last_writer);

        // The barrier writer is both the queue head and the last parallel
        // member until cleanup.
        assert_eq!(queue_depth(&thread), 1);
        assert_eq!(leader.parallel_execute_id(), 1);

        leader.record_cf(0);
        barrier.wait();
        if !thread.report_parallel_finish() {
            thread.leader_wait_end_parallel(&leader);
        }
        thread.leader_end_parallel(&leader, &group.last_writer, &cfds, &scheduler);

        for (w, handle) in worker_handles {
            handle.join().unwrap();
            assert!(w.is_done());
        }
        assert_eq!(queue_depth(&thread), 0);
    }

    #[test]
    fn test_parallel_ids_advance_by_batch_count() {
        let thread = Arc::new(WriteThread::new());
        let leader = {
            let mut batch = WriteBatch::new();
            batch.put(b"a".to_vec(), b"1".to_vec());
            batch.put(b"b".to_vec(), b"2".to_vec());
            batch.put(b"c".to_vec(), b"3".to_vec());
            Arc::new(Writer::new(Some(batch), &WriteOptions::default()))
        };
        thread.enter(&leader, None).unwrap();

        let follower = make_writer(&WriteOptions::default());
        let handle = {
            let thread = Arc::clone(&thread);
            let follower = Arc::clone(&follower);
            thread::spawn(move || {
                let outcome = thread.enter(&follower, None).unwrap();
                assert_eq!(outcome, EnterOutcome::ParallelWorker);
                let last = thread.report_parallel_finish();
                thread.end_parallel_run(&follower, last);
            })
        };
        wait_for_depth(&thread, 2);

        let group = thread.build_batch_group();
        thread.start_parallel_run(&leader, 2, &group.last_writer);

        // The leader's three operations occupy slots 1..=3.
        assert_eq!(leader.parallel_execute_id(), 1);
        assert_eq!(follower.parallel_execute_id(), 4);

        if !thread.report_parallel_finish() {
            thread.leader_wait_end_parallel(&leader);
        }
        let cfds = ColumnFamilySet::new(&[], 1 << 20);
        let scheduler = FlushScheduler::new();
        thread.leader_end_parallel(&leader, &group.last_writer, &cfds, &scheduler);
        handle.join().unwrap();
    }

    #[test]
    fn test_report_parallel_finish_true_exactly_once() {
        let thread = WriteThread::new();
        thread.unfinished_threads.store(3, Ordering::Release);

        let mut lasts = 0;
        for _ in 0..3 {
            if thread.report_parallel_finish() {
                lasts += 1;
            }
        }
        assert_eq!(lasts, 1);
    }

    #[test]
    fn test_leader_cf_union_after_parallel_run() {
        let thread = Arc::new(WriteThread::new());
        let cfds = ColumnFamilySet::new(&["aux"], 1 << 20);
        let scheduler = FlushScheduler::new();

        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let follower = make_writer(&WriteOptions::default());
        let handle = {
            let thread = Arc::clone(&thread);
            let follower = Arc::clone(&follower);
            thread::spawn(move || {
                thread.enter(&follower, None).unwrap();
                follower.record_cf(1);
                let last = thread.report_parallel_finish();
                thread.end_parallel_run(&follower, last);
            })
        };
        wait_for_depth(&thread, 2);

        let group = thread.build_batch_group();
        thread.start_parallel_run(&leader, 2, &group.last_writer);
        leader.record_cf(0);
        if !thread.report_parallel_finish() {
            thread.leader_wait_end_parallel(&leader);
        }
        thread.leader_end_parallel(&leader, &group.last_writer, &cfds, &scheduler);
        handle.join().unwrap();

        let ids: Vec<_> = leader.cf_ids().into_iter().collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_next_leader_emerges_after_parallel_cleanup() {
        let thread = Arc::new(WriteThread::new());
        let cfds = ColumnFamilySet::new(&[], 1 << 20);
        let scheduler = FlushScheduler::new();

        let leader = make_writer(&WriteOptions::default());
        thread.enter(&leader, None).unwrap();

        let follower = make_writer(&WriteOptions::default());
        let follower_handle = {
            let thread = Arc::clone(&thread);
            let follower = Arc::clone(&follower);
            thread::spawn(move || {
                thread.enter(&follower, None).unwrap();
                let last = thread.report_parallel_finish();
                thread.end_parallel_run(&follower, last);
            })
        };
        wait_for_depth(&thread, 2);

        let group = thread.build_batch_group();
        thread.start_parallel_run(&leader, 2, &group.last_writer);

        // A newcomer entering during the run queues behind the barrier.
        let newcomer = make_writer(&WriteOptions {
            sync: true,
            ..WriteOptions::default()
        });
        let newcomer_handle = {
            let thread = Arc::clone(&thread);
            let newcomer = Arc::clone(&newcomer);
            thread::spawn(move || {
                let outcome = thread.enter(&newcomer, None).unwrap();
                assert_eq!(outcome, EnterOutcome::Leader);
                let group = thread.build_batch_group();
                thread.exit(&newcomer, &group.last_writer, Ok(()));
            })
        };
        wait_for_depth(&thread, 2);

        if !thread.report_parallel_finish() {
            thread.leader_wait_end_parallel(&leader);
        }
        thread.leader_end_parallel(&leader, &group.last_writer, &cfds, &scheduler);

        follower_handle.join().unwrap();
        newcomer_handle.join().unwrap();
        assert_eq!(queue_depth(&thread), 0);
    }
}
