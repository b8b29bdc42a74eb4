// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-port byte and error counters.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::ldisc::RxFlag;

/// Snapshot of a port's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Bytes read from the RX FIFO.
    pub rx: u64,
    /// Bytes written to the TX FIFO.
    pub tx: u64,
    /// Bytes received with a framing error.
    pub frame: u64,
    /// Bytes received with a parity error.
    pub parity: u64,
    /// Overruns reported by the controller plus bytes the line discipline
    /// refused.
    pub overrun: u64,
    /// Break conditions and receiver hardware faults.
    pub brk: u64,
}

/// Live counters, updated by the engines.
#[derive(Debug, Default)]
pub(crate) struct PortCounters {
    rx: AtomicU64,
    tx: AtomicU64,
    frame: AtomicU64,
    parity: AtomicU64,
    overrun: AtomicU64,
    brk: AtomicU64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
}

impl PortCounters {
    pub(crate) fn add_rx(&self, bytes: usize) {
        bump(&self.rx, bytes);
    }

    pub(crate) fn add_tx(&self, bytes: usize) {
        bump(&self.tx, bytes);
    }

    pub(crate) fn add_overrun(&self, bytes: usize) {
        bump(&self.overrun, bytes);
    }

    /// Count one received byte's error class. Clean bytes count nothing.
    pub(crate) fn record(&self, flag: RxFlag) {
        let counter = match flag {
            RxFlag::Normal => return,
            RxFlag::Framing => &self.frame,
            RxFlag::Parity => &self.parity,
            RxFlag::Overrun => &self.overrun,
            RxFlag::Break => &self.brk,
        };
        bump(counter, 1);
    }

    pub(crate) fn snapshot(&self) -> Counters {
        Counters {
            rx: self.rx.load(Ordering::Relaxed),
            tx: self.tx.load(Ordering::Relaxed),
            frame: self.frame.load(Ordering::Relaxed),
            parity: self.parity.load(Ordering::Relaxed),
            overrun: self.overrun.load(Ordering::Relaxed),
            brk: self.brk.load(Ordering::Relaxed),
        }
    }
}
