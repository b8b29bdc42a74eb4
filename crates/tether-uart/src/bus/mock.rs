// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Mock register bus for testing.
//!
//! `MockBus` is a cheaply clonable handle onto a shared register file: the
//! port owns one clone while the test keeps another to script register
//! values, inject failures and inspect the transaction log.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{BusError, RegisterBus};
use crate::regs::Reg;

/// Kind of bus transaction, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Single register read.
    Read,
    /// Bulk read.
    BulkRead,
    /// Single register write.
    Write,
    /// Bulk write.
    BulkWrite,
    /// Read-modify-write.
    UpdateBits,
}

/// One recorded bus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// `read(reg)`.
    Read(Reg),
    /// `bulk_read(reg, len)`.
    BulkRead(Reg, usize),
    /// `write(reg, value)`.
    Write(Reg, u8),
    /// `bulk_write(reg, data)`.
    BulkWrite(Reg, Vec<u8>),
    /// `update_bits(reg, mask, value)`.
    UpdateBits {
        /// Target register.
        reg: Reg,
        /// Bits replaced.
        mask: u8,
        /// New values for the masked bits.
        value: u8,
    },
}

impl BusOp {
    /// Register this transaction targeted.
    #[must_use]
    pub const fn reg(&self) -> Reg {
        match self {
            Self::Read(reg)
            | Self::BulkRead(reg, _)
            | Self::Write(reg, _)
            | Self::BulkWrite(reg, _)
            | Self::UpdateBits { reg, .. } => *reg,
        }
    }

    /// Whether this transaction modifies the register file.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Write(..) | Self::BulkWrite(..) | Self::UpdateBits { .. }
        )
    }
}

#[derive(Default)]
struct MockState {
    regs: HashMap<Reg, u8>,
    windows: HashMap<Reg, Vec<u8>>,
    written: HashMap<Reg, Vec<u8>>,
    failures: VecDeque<(OpKind, Reg, BusError)>,
    log: Vec<BusOp>,
}

impl MockState {
    fn take_failure(&mut self, kind: OpKind, reg: Reg) -> Result<(), BusError> {
        let hit = self
            .failures
            .iter()
            .position(|&(k, r, _)| k == kind && r == reg);
        match hit.and_then(|index| self.failures.remove(index)) {
            Some((_, _, err)) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory register file with a transaction log.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    /// Create an empty register file (every register reads as zero).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the value a register reads as.
    pub fn set_reg(&self, reg: Reg, value: u8) {
        self.state().regs.insert(reg, value);
    }

    /// Current value of a register.
    #[must_use]
    pub fn reg(&self, reg: Reg) -> u8 {
        self.state().regs.get(&reg).copied().unwrap_or(0)
    }

    /// Set the bytes a bulk read of `reg` returns. Short windows pad with zero.
    pub fn set_window(&self, reg: Reg, data: &[u8]) {
        self.state().windows.insert(reg, data.to_vec());
    }

    /// All bytes bulk-written to `reg` so far.
    #[must_use]
    pub fn written(&self, reg: Reg) -> Vec<u8> {
        self.state().written.get(&reg).cloned().unwrap_or_default()
    }

    /// Make the next `times` transactions of `kind` on `reg` fail with `err`.
    pub fn fail_next(&self, kind: OpKind, reg: Reg, err: BusError, times: usize) {
        let mut state = self.state();
        for _ in 0..times {
            state.failures.push_back((kind, reg, err));
        }
    }

    /// Transactions issued so far, oldest first.
    #[must_use]
    pub fn log(&self) -> Vec<BusOp> {
        self.state().log.clone()
    }

    /// Transactions that modified the register file.
    #[must_use]
    pub fn writes(&self) -> Vec<BusOp> {
        self.state()
            .log
            .iter()
            .filter(|op| op.is_write())
            .cloned()
            .collect()
    }

    /// Forget the transaction log.
    pub fn clear_log(&self) {
        self.state().log.clear();
    }
}

impl RegisterBus for MockBus {
    fn read(&mut self, reg: Reg) -> Result<u8, BusError> {
        let mut state = self.state();
        state.log.push(BusOp::Read(reg));
        state.take_failure(OpKind::Read, reg)?;
        Ok(state.regs.get(&reg).copied().unwrap_or(0))
    }

    fn bulk_read(&mut self, reg: Reg, buf: &mut [u8]) -> Result<(), BusError> {
        let mut state = self.state();
        state.log.push(BusOp::BulkRead(reg, buf.len()));
        state.take_failure(OpKind::BulkRead, reg)?;
        let window = state.windows.get(&reg).map_or(&[][..], Vec::as_slice);
        for (index, slot) in buf.iter_mut().enumerate() {
            *slot = window.get(index).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn write(&mut self, reg: Reg, value: u8) -> Result<(), BusError> {
        let mut state = self.state();
        state.log.push(BusOp::Write(reg, value));
        state.take_failure(OpKind::Write, reg)?;
        state.regs.insert(reg, value);
        Ok(())
    }

    fn bulk_write(&mut self, reg: Reg, data: &[u8]) -> Result<(), BusError> {
        let mut state = self.state();
        state.log.push(BusOp::BulkWrite(reg, data.to_vec()));
        state.take_failure(OpKind::BulkWrite, reg)?;
        state.written.entry(reg).or_default().extend_from_slice(data);
        Ok(())
    }

    fn update_bits(&mut self, reg: Reg, mask: u8, value: u8) -> Result<(), BusError> {
        let mut state = self.state();
        state.log.push(BusOp::UpdateBits { reg, mask, value });
        state.take_failure(OpKind::UpdateBits, reg)?;
        let current = state.regs.get(&reg).copied().unwrap_or(0);
        state.regs.insert(reg, (current & !mask) | (value & mask));
        Ok(())
    }
}
