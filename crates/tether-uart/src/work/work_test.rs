// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for deferred work and executors.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

use core::sync::atomic::AtomicUsize;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn counting_work(executor: Arc<dyn Executor>) -> (Arc<Work>, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let work = Work::new("count", executor, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (work, runs)
}

#[test]
fn schedule_is_idempotent_while_pending() {
    let executor = ManualExecutor::new();
    let (work, runs) = counting_work(executor.clone());

    assert!(work.schedule());
    assert!(!work.schedule());
    assert!(!work.schedule());
    assert!(work.is_pending());
    assert_eq!(executor.queued(), 1);

    executor.run_pending();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!work.is_pending());
}

#[test]
fn schedule_after_run_queues_again() {
    let executor = ManualExecutor::new();
    let (work, runs) = counting_work(executor.clone());

    work.schedule();
    executor.run_pending();
    assert!(work.schedule());
    executor.run_pending();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn cancel_drops_queued_run() {
    let executor = ManualExecutor::new();
    let (work, runs) = counting_work(executor.clone());

    work.schedule();
    assert!(work.cancel_sync());
    executor.run_pending();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(!work.cancel_sync());
}

#[test]
fn stale_queue_entry_does_not_double_run() {
    let executor = ManualExecutor::new();
    let (work, runs) = counting_work(executor.clone());

    work.schedule();
    work.cancel_sync();
    work.schedule();
    // Two entries, one pending run.
    assert_eq!(executor.queued(), 2);
    executor.run_pending();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn self_rescheduling_job_runs_once_per_poll() {
    let executor = ManualExecutor::new();
    let slot: Arc<std::sync::OnceLock<Arc<Work>>> = Arc::new(std::sync::OnceLock::new());
    let runs = Arc::new(AtomicUsize::new(0));

    let job_slot = Arc::clone(&slot);
    let job_runs = Arc::clone(&runs);
    let work = Work::new("again", executor.clone(), move || {
        job_runs.fetch_add(1, Ordering::SeqCst);
        if let Some(me) = job_slot.get() {
            me.schedule();
        }
    });
    slot.set(Arc::clone(&work)).unwrap();

    work.schedule();
    assert_eq!(executor.run_pending(), 1);
    assert_eq!(executor.run_pending(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(work.is_pending());
    assert_eq!(executor.run_until_idle(3), 3);
}

#[test]
fn worker_thread_runs_work() {
    let executor = WorkerThread::spawn("test-worker").unwrap();
    let (tx, rx) = mpsc::channel();
    let tx = std::sync::Mutex::new(tx);
    let work = Work::new("signal", executor, move || {
        tx.lock().unwrap().send(()).unwrap();
    });

    work.schedule();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn cancel_sync_waits_for_running_job() {
    let executor = WorkerThread::spawn("test-worker").unwrap();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let finished = Arc::new(AtomicUsize::new(0));

    let started_tx = std::sync::Mutex::new(started_tx);
    let release_rx = std::sync::Mutex::new(release_rx);
    let job_finished = Arc::clone(&finished);
    let work = Work::new("slow", executor, move || {
        started_tx.lock().unwrap().send(()).unwrap();
        release_rx.lock().unwrap().recv().unwrap();
        job_finished.fetch_add(1, Ordering::SeqCst);
    });

    work.schedule();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(work.is_running());

    let canceller = {
        let work = Arc::clone(&work);
        thread::spawn(move || {
            work.cancel_sync();
        })
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!canceller.is_finished());

    release_tx.send(()).unwrap();
    canceller.join().unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!work.is_running());
}

#[test]
fn dropping_worker_thread_joins() {
    let executor = WorkerThread::spawn("test-worker").unwrap();
    assert_eq!(executor.queued(), 0);
    drop(executor);
}
