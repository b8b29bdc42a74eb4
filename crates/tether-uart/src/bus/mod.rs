// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Register bus abstraction.
//!
//! The UART's registers live in a companion controller reached over a slow
//! serial bus (I2C or SPI). Every access may sleep and may fail
//! transiently, so the engine only calls into a [`RegisterBus`] from
//! sleepable contexts while holding the port's bus lock.
//!
//! ```text
//! ┌──────────────┐   read / write / bulk   ┌───────────────────────┐
//! │  Port engine │ ──────────────────────▶ │  RegisterBus          │
//! │ (bus lock)   │                         │  I2C regmap, SPI, ... │
//! └──────────────┘                         └───────────────────────┘
//! ```


#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{BusOp, MockBus, OpKind};

use core::fmt;

use crate::regs::Reg;

/// Transient failure of a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The controller did not acknowledge the transfer.
    Nak,
    /// The transfer did not complete in time.
    Timeout,
    /// Any other transport failure.
    Io,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nak => write!(f, "transfer not acknowledged"),
            Self::Timeout => write!(f, "transfer timed out"),
            Self::Io => write!(f, "bus I/O error"),
        }
    }
}

impl core::error::Error for BusError {}

/// Synchronous access to a remote register file.
///
/// Implementations may block. None of the methods are called from atomic
/// context.
pub trait RegisterBus: Send {
    /// Read one register.
    fn read(&mut self, reg: Reg) -> Result<u8, BusError>;

    /// Read `buf.len()` bytes starting at `reg`.
    fn bulk_read(&mut self, reg: Reg, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write one register.
    fn write(&mut self, reg: Reg, value: u8) -> Result<(), BusError>;

    /// Write `data` starting at `reg`.
    fn bulk_write(&mut self, reg: Reg, data: &[u8]) -> Result<(), BusError>;

    /// Read-modify-write: replace the bits selected by `mask` with `value`.
    fn update_bits(&mut self, reg: Reg, mask: u8, value: u8) -> Result<(), BusError> {
        let current = self.read(reg)?;
        let updated = (current & !mask) | (value & mask);
        if updated == current {
            return Ok(());
        }
        self.write(reg, updated)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read(&mut self, reg: Reg) -> Result<u8, BusError> {
        (**self).read(reg)
    }

    fn bulk_read(&mut self, reg: Reg, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).bulk_read(reg, buf)
    }

    fn write(&mut self, reg: Reg, value: u8) -> Result<(), BusError> {
        (**self).write(reg, value)
    }

    fn bulk_write(&mut self, reg: Reg, data: &[u8]) -> Result<(), BusError> {
        (**self).bulk_write(reg, data)
    }

    fn update_bits(&mut self, reg: Reg, mask: u8, value: u8) -> Result<(), BusError> {
        (**self).update_bits(reg, mask, value)
    }
}
