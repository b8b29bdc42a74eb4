// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Errors surfaced by synchronous port operations.

use core::fmt;

use crate::bus::BusError;
use crate::regs::Reg;

/// Failure of a synchronous port operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// A register access failed.
    Bus {
        /// Register being accessed.
        reg: Reg,
        /// Transport failure.
        source: BusError,
    },
    /// The port configuration was rejected.
    InvalidConfig(&'static str),
}

impl UartError {
    /// Wrap a bus failure on `reg`.
    #[must_use]
    pub const fn bus(reg: Reg, source: BusError) -> Self {
        Self::Bus { reg, source }
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus { reg, source } => write!(f, "failed to access {reg}: {source}"),
            Self::InvalidConfig(reason) => write!(f, "invalid port configuration: {reason}"),
        }
    }
}

impl core::error::Error for UartError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Bus { source, .. } => Some(source),
            Self::InvalidConfig(_) => None,
        }
    }
}

/// Tag a bus result with the register it touched.
pub(crate) trait BusResultExt<T> {
    /// Convert a [`BusError`] into [`UartError::Bus`] for `reg`.
    fn on(self, reg: Reg) -> Result<T, UartError>;
}

impl<T> BusResultExt<T> for Result<T, BusError> {
    fn on(self, reg: Reg) -> Result<T, UartError> {
        self.map_err(|source| UartError::bus(reg, source))
    }
}
