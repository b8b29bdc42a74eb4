// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock line discipline for testing.
//!
//! Records every received byte and batch boundary, and serves transmit data
//! from a [`TxRing`] the test fills.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{LineDiscipline, RxFlag, TxRing, WAKEUP_CHARS};

struct MockState {
    received: Vec<(u8, RxFlag)>,
    flushes: usize,
    tx: TxRing,
    accept_budget: Option<usize>,
    active: bool,
    flow_stopped: bool,
    sysrq: Option<u8>,
    sysrq_hits: usize,
    wakeups: usize,
    low_water_mark: usize,
}

/// Line discipline backed by in-memory buffers.
pub struct MockLdisc {
    state: Mutex<MockState>,
}

impl MockLdisc {
    /// Active discipline with an empty transmit ring of the default size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tx_capacity(TxRing::DEFAULT_CAPACITY)
    }

    /// Active discipline with a transmit ring of at least `capacity` bytes.
    #[must_use]
    pub fn with_tx_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MockState {
                received: Vec::new(),
                flushes: 0,
                tx: TxRing::new(capacity),
                accept_budget: None,
                active: true,
                flow_stopped: false,
                sysrq: None,
                sysrq_hits: 0,
                wakeups: 0,
                low_water_mark: WAKEUP_CHARS,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes pushed so far, with their classification.
    #[must_use]
    pub fn received(&self) -> Vec<(u8, RxFlag)> {
        self.state().received.clone()
    }

    /// Bytes pushed so far, without classification.
    #[must_use]
    pub fn received_bytes(&self) -> Vec<u8> {
        self.state().received.iter().map(|&(byte, _)| byte).collect()
    }

    /// Number of `flush_batch` calls.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.state().flushes
    }

    /// Queue bytes for transmission. Returns how many fit.
    pub fn queue_tx(&self, data: &[u8]) -> usize {
        self.state().tx.write(data)
    }

    /// Accept `count` more bytes, then reject every push.
    pub fn reject_after(&self, count: usize) {
        self.state().accept_budget = Some(count);
    }

    /// Attach or detach the terminal.
    pub fn set_active(&self, active: bool) {
        self.state().active = active;
    }

    /// Pause or resume transmission.
    pub fn set_flow_stopped(&self, stopped: bool) {
        self.state().flow_stopped = stopped;
    }

    /// Consume `byte` as an out-of-band request instead of pushing it.
    pub fn set_sysrq(&self, byte: u8) {
        self.state().sysrq = Some(byte);
    }

    /// Number of bytes consumed as out-of-band requests.
    #[must_use]
    pub fn sysrq_hits(&self) -> usize {
        self.state().sysrq_hits
    }

    /// Change the wake-up threshold.
    pub fn set_low_water_mark(&self, mark: usize) {
        self.state().low_water_mark = mark;
    }

    /// Number of `notify_writable` calls.
    #[must_use]
    pub fn wakeups(&self) -> usize {
        self.state().wakeups
    }
}

impl Default for MockLdisc {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDiscipline for MockLdisc {
    fn is_active(&self) -> bool {
        self.state().active
    }

    fn push(&self, byte: u8, flag: RxFlag) -> bool {
        let mut state = self.state();
        if let Some(budget) = state.accept_budget.as_mut() {
            if *budget == 0 {
                return false;
            }
            *budget -= 1;
        }
        state.received.push((byte, flag));
        true
    }

    fn flush_batch(&self) {
        self.state().flushes += 1;
    }

    fn handle_sysrq(&self, byte: u8) -> bool {
        let mut state = self.state();
        if state.sysrq == Some(byte) {
            state.sysrq_hits += 1;
            return true;
        }
        false
    }

    fn pending_tx(&self) -> usize {
        self.state().tx.pending()
    }

    fn read_tx_run(&self, buf: &mut [u8]) -> usize {
        self.state().tx.consume_into(buf)
    }

    fn notify_writable(&self) {
        self.state().wakeups += 1;
    }

    fn low_water_mark(&self) -> usize {
        self.state().low_water_mark
    }

    fn is_flow_stopped(&self) -> bool {
        self.state().flow_stopped
    }
}
