// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Deferred work.
//!
//! A [`Work`] is a job that can be scheduled from any context, including
//! ones that must not sleep. Scheduling is idempotent: while a run is
//! queued, further `schedule` calls are absorbed into it, so callers get
//! "at least one run after this point" rather than "one run per request".
//! A work item never runs concurrently with itself.
//!
//! # State machine
//!
//! ```text
//!            schedule()              executor picks it up
//!   IDLE ──────────────▶ PENDING ─────────────────────────▶ RUNNING
//!    ▲                      │                                 │
//!    │     cancel_sync()    │      schedule() while running   │
//!    ├──────────────────────┘      sets PENDING again         │
//!    └────────────────────────────────────────────────────────┘
//!                          job returns
//! ```
//!
//! Executors decide *where* work runs: [`WorkerThread`] runs it on a
//! dedicated thread, [`ManualExecutor`] whenever its owner polls it.

#[cfg(test)]
mod work_test;

mod manual;
mod worker;

pub use manual::ManualExecutor;
pub use worker::WorkerThread;

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Queued and not yet started.
const PENDING: u8 = 1 << 0;
/// Job currently executing.
const RUNNING: u8 = 1 << 1;

/// Somewhere to run work.
pub trait Executor: Send + Sync {
    /// Queue `work` for execution. Must not block.
    ///
    /// Implementations call [`Work::run`] at some later point. Entries whose
    /// work has been cancelled in the meantime are skipped by `run` itself,
    /// so executors never need to remove anything.
    fn submit(&self, work: Arc<Work>);
}

type Job = Box<dyn Fn() + Send + Sync>;

/// An idempotently schedulable job.
pub struct Work {
    name: &'static str,
    state: AtomicU8,
    job: Job,
    executor: Arc<dyn Executor>,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Work {
    /// Create a work item that runs `job` on `executor`.
    #[must_use]
    pub fn new<F>(name: &'static str, executor: Arc<dyn Executor>, job: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            state: AtomicU8::new(0),
            job: Box::new(job),
            executor,
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
        })
    }

    /// Name given at creation, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Queue a run unless one is already queued.
    ///
    /// Never blocks. Returns `true` if a new run was queued.
    pub fn schedule(self: &Arc<Self>) -> bool {
        let previous = self.state.fetch_or(PENDING, Ordering::AcqRel);
        if previous & PENDING != 0 {
            return false;
        }
        self.executor.submit(Arc::clone(self));
        true
    }

    /// Whether a run is queued and has not started yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) & PENDING != 0
    }

    /// Whether the job is executing right now.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) & RUNNING != 0
    }

    /// Execute the job if a run is pending. Called by executors.
    ///
    /// If another thread is still executing this work, the pending run is
    /// handed back to the executor instead of running concurrently.
    pub fn run(self: &Arc<Self>) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & PENDING == 0 {
                // Cancelled, or absorbed into a run that already happened.
                return;
            }
            if current & RUNNING != 0 {
                self.executor.submit(Arc::clone(self));
                return;
            }
            match self.state.compare_exchange_weak(
                current,
                (current & !PENDING) | RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        (self.job)();

        self.state.fetch_and(!RUNNING, Ordering::AcqRel);
        let _guard = self
            .idle_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.idle.notify_all();
    }

    /// Drop a queued run and wait for a running one to finish.
    ///
    /// Returns `true` if a queued run was dropped. Must not be called from
    /// inside this work's own job.
    pub fn cancel_sync(&self) -> bool {
        let previous = self.state.fetch_and(!PENDING, Ordering::AcqRel);
        let mut guard = self
            .idle_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while self.is_running() {
            guard = self
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        previous & PENDING != 0
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Work")
            .field("name", &self.name)
            .field("pending", &self.is_pending())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
