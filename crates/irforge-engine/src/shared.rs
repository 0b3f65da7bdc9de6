//! State shared by every worker: the id counter, the bounded worker pool,
//! the stop flag, and run counters.
//!
//! The pool parks over-cap workers on a per-depth condition variable and
//! wakes the deepest parked worker first, so subtrees finish before the
//! enumeration widens. A live-worker counter with its own condition variable
//! lets the root wait for every descendant, at arbitrary depth, to exit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::{Abort, EngineError};

/// Cap on the choice-tree depth, and thus on the condition-variable array.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug)]
struct Sched {
    /// Workers currently executing (not parked).
    running: usize,
    /// Parked workers per depth.
    waiting: Vec<usize>,
    /// Workers that have been spawned and not yet exited, the root included.
    live: u64,
    peak_running: usize,
}

#[derive(Debug)]
pub struct Shared {
    next_id: AtomicU64,
    stop: AtomicBool,
    pub(crate) emitted: AtomicU64,
    pub(crate) discarded: AtomicU64,
    cores: usize,
    sched: Mutex<Sched>,
    conds: Vec<Condvar>,
    all_done: Condvar,
    first_error: Mutex<Option<EngineError>>,
}

impl Shared {
    pub fn new(cores: usize) -> Self {
        Shared {
            next_id: AtomicU64::new(1),
            stop: AtomicBool::new(false),
            emitted: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            cores,
            sched: Mutex::new(Sched {
                running: 1,
                waiting: vec![0; MAX_DEPTH],
                live: 0,
                peak_running: 1,
            }),
            conds: (0..MAX_DEPTH).map(|_| Condvar::new()).collect(),
            all_done: Condvar::new(),
            first_error: Mutex::new(None),
        }
    }

    fn sched(&self) -> MutexGuard<'_, Sched> {
        self.sched.lock().expect("pool mutex poisoned")
    }

    pub(crate) fn claim_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Re-acquire a running slot at `depth`, parking while the pool is at
    /// capacity. Returns `Stopped` if the stop flag is raised before or while
    /// parked.
    pub(crate) fn increase_runners(&self, depth: usize) -> Result<(), Abort> {
        if depth >= MAX_DEPTH {
            return Err(self.die(EngineError::DepthExceeded(depth)));
        }
        let mut s = self.sched();
        while s.running >= self.cores {
            if self.stopped() {
                return Err(Abort::Stopped);
            }
            s.waiting[depth] += 1;
            s = self.conds[depth].wait(s).expect("pool mutex poisoned");
            s.waiting[depth] -= 1;
            if self.stopped() {
                return Err(Abort::Stopped);
            }
        }
        s.running += 1;
        s.peak_running = s.peak_running.max(s.running);
        Ok(())
    }

    /// Release this worker's running slot and wake the deepest parked worker,
    /// if any. Called on every worker exit path.
    pub(crate) fn decrease_runners(&self) {
        let mut s = self.sched();
        debug_assert!(s.running <= self.cores);
        s.running = s.running.saturating_sub(1);
        for d in (0..MAX_DEPTH).rev() {
            if s.waiting[d] > 0 {
                self.conds[d].notify_one();
                break;
            }
        }
    }

    /// Account a worker about to start; the matching `worker_done` runs as
    /// its last action.
    pub(crate) fn worker_spawned(&self) {
        self.sched().live += 1;
    }

    pub(crate) fn worker_done(&self) {
        let mut s = self.sched();
        s.live -= 1;
        if s.live == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until every worker has exited.
    pub(crate) fn wait_all(&self) {
        let mut s = self.sched();
        while s.live > 0 {
            s = self.all_done.wait(s).expect("pool mutex poisoned");
        }
    }

    /// Record a fatal error, raise the stop flag, and wake every parked
    /// worker so the forest drains.
    pub(crate) fn die(&self, err: EngineError) -> Abort {
        {
            let mut slot = self.first_error.lock().expect("error slot poisoned");
            slot.get_or_insert(err);
        }
        self.stop.store(true, Ordering::SeqCst);
        let _guard = self.sched();
        for c in &self.conds {
            c.notify_all();
        }
        self.all_done.notify_all();
        Abort::Stopped
    }

    pub(crate) fn take_error(&self) -> Option<EngineError> {
        self.first_error.lock().expect("error slot poisoned").take()
    }

    pub(crate) fn peak_running(&self) -> usize {
        self.sched().peak_running
    }
}
