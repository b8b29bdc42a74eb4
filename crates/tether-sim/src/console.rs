// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! A minimal terminal on top of the port.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tether_uart::{LineDiscipline, RxFlag, TxRing};

/// Most received bytes the console holds before refusing more.
pub const RX_CAPACITY: usize = 64 * 1024;

struct ConsoleState {
    tx: TxRing,
    rx: Vec<u8>,
    line_errors: usize,
    batches: usize,
    wakeups: usize,
}

/// Line discipline that buffers what it receives and feeds a transmit
/// ring.
pub struct Console {
    state: Mutex<ConsoleState>,
    changed: Condvar,
}

impl Console {
    /// Console with a transmit ring of [`TxRing::DEFAULT_CAPACITY`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                tx: TxRing::default(),
                rx: Vec::new(),
                line_errors: 0,
                batches: 0,
                wakeups: 0,
            }),
            changed: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue bytes for transmission. Returns how many fit; kick the port
    /// with `request_start_tx` afterwards.
    pub fn write(&self, data: &[u8]) -> usize {
        self.state().tx.write(data)
    }

    /// Everything received so far.
    #[must_use]
    pub fn received(&self) -> Vec<u8> {
        self.state().rx.clone()
    }

    /// Bytes that arrived with a line error.
    #[must_use]
    pub fn line_errors(&self) -> usize {
        self.state().line_errors
    }

    /// Completed receive batches.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.state().batches
    }

    /// Times the port reported room for writers.
    #[must_use]
    pub fn wakeups(&self) -> usize {
        self.state().wakeups
    }

    /// Wait until at least `len` bytes have been received or `timeout`
    /// passes. Returns what was received.
    #[must_use]
    pub fn wait_for(&self, len: usize, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while state.rx.len() < len {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.rx.clone()
    }

    /// Wait until the transmit ring is empty or `timeout` passes.
    #[must_use]
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let state = self.state();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |state| !state.tx.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        state.tx.is_empty()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDiscipline for Console {
    fn is_active(&self) -> bool {
        true
    }

    fn push(&self, byte: u8, flag: RxFlag) -> bool {
        let mut state = self.state();
        if state.rx.len() >= RX_CAPACITY {
            return false;
        }
        if flag != RxFlag::Normal {
            state.line_errors += 1;
        }
        state.rx.push(byte);
        true
    }

    fn flush_batch(&self) {
        self.state().batches += 1;
        self.changed.notify_all();
    }

    fn pending_tx(&self) -> usize {
        self.state().tx.pending()
    }

    fn read_tx_run(&self, buf: &mut [u8]) -> usize {
        self.state().tx.consume_into(buf)
    }

    fn notify_writable(&self) {
        self.state().wakeups += 1;
        self.changed.notify_all();
    }

    fn is_flow_stopped(&self) -> bool {
        false
    }
}
