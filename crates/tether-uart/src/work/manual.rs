// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Executor driven by its owner.

use std::collections::VecDeque;
use std::sync::Arc;

use spin::Mutex;

use super::{Executor, Work};

/// Queues work until the owner calls [`run_pending`](Self::run_pending).
///
/// Useful for polled integrations and for tests that need to control
/// exactly when deferred work runs.
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Arc<Work>>>,
}

impl ManualExecutor {
    /// Empty executor.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Number of queued entries.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run everything that was queued when the call started.
    ///
    /// Work rescheduled by a job lands behind the snapshot and waits for the
    /// next call, so a job that always reschedules itself cannot spin here.
    /// Returns the number of entries taken off the queue.
    pub fn run_pending(&self) -> usize {
        let batch: VecDeque<Arc<Work>> = core::mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for work in batch {
            work.run();
        }
        count
    }

    /// Call [`run_pending`](Self::run_pending) until the queue stays empty
    /// or `max_rounds` rounds have run. Returns the number of rounds.
    pub fn run_until_idle(&self, max_rounds: usize) -> usize {
        let mut rounds = 0;
        while rounds < max_rounds && self.run_pending() > 0 {
            rounds += 1;
        }
        rounds
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, work: Arc<Work>) {
        self.queue.lock().push_back(work);
    }
}
