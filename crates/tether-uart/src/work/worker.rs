// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Dedicated worker thread.

use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, Thread};

use spin::Mutex;
use tracing::debug;

use super::{Executor, Work};

struct Shared {
    queue: Mutex<VecDeque<Arc<Work>>>,
    shutdown: AtomicBool,
    thread: OnceLock<Thread>,
}

impl Shared {
    fn wake(&self) {
        if let Some(thread) = self.thread.get() {
            thread.unpark();
        }
    }
}

/// Runs submitted work, one item at a time, on its own OS thread.
///
/// Submission only takes a spin lock around the run queue and unparks the
/// thread, so it is safe from contexts that must not sleep. Dropping the
/// executor drains nothing: queued work is abandoned and the thread exits.
pub struct WorkerThread {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    /// Spawn a worker thread called `name`.
    pub fn spawn(name: &str) -> io::Result<Arc<Self>> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            shutdown: AtomicBool::new(false),
            thread: OnceLock::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || worker_loop(&worker))?;
        // Nobody can submit before `spawn` returns, so the handle is in
        // place before the first wake-up is needed.
        let _ = shared.thread.set(handle.thread().clone());

        Ok(Arc::new(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }))
    }

    /// Number of queued entries, including ones that will turn out to be
    /// cancelled.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

impl Executor for WorkerThread {
    fn submit(&self, work: Arc<Work>) {
        self.shared.queue.lock().push_back(work);
        self.shared.wake();
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wake();
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        // The last reference can go away on the worker itself, when a job
        // held the final clone. Joining would then wait on ourselves.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            debug!("worker thread panicked");
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        let next = shared.queue.lock().pop_front();
        match next {
            Some(work) => work.run(),
            None => thread::park(),
        }
    }
}
