// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Register map of the companion controller's UART block.
//!
//! All registers are 8 bits wide. The FIFO windows (`RHR`, `THR`,
//! `RX_ERRORS`) are read or written with bulk transfers; the controller
//! keeps the address fixed and pops/pushes one FIFO entry per byte.

use core::fmt;

use bitflags::bitflags;

/// Address of a register in the companion controller's register file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Reg(u16);

impl Reg {
    /// UART configuration 0: enables and FIFO resets.
    pub const CFG0: Self = Self(0x0080);
    /// UART configuration 1: framing, auto flow control, throttle.
    pub const CFG1: Self = Self(0x0081);
    /// Baud rate select.
    pub const BAUD: Self = Self(0x0082);
    /// Interrupt enable.
    pub const IER: Self = Self(0x0085);
    /// Interrupt identification (pending sources).
    pub const IIR: Self = Self(0x0086);
    /// Line status summary; non-zero when the RX FIFO holds errored bytes.
    pub const LSR: Self = Self(0x0087);
    /// Modem control/status.
    pub const MSR: Self = Self(0x0088);
    /// Number of bytes waiting in the RX FIFO.
    pub const RXLVL: Self = Self(0x0089);
    /// Number of free slots in the TX FIFO.
    pub const TXLVL: Self = Self(0x008A);
    /// Receive holding register (RX FIFO window).
    pub const RHR: Self = Self(0x0090);
    /// Transmit holding register (TX FIFO window).
    pub const THR: Self = Self(0x0091);
    /// Per-byte receive error codes, parallel to `RHR`.
    pub const RX_ERRORS: Self = Self(0x0092);

    /// Creates a register address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u16) -> Self {
        Self(addr)
    }

    /// Returns the raw address.
    #[inline]
    #[must_use]
    pub const fn addr(self) -> u16 {
        self.0
    }

    /// Human readable register name, for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CFG0 => "CFG0",
            Self::CFG1 => "CFG1",
            Self::BAUD => "BAUD",
            Self::IER => "IER",
            Self::IIR => "IIR",
            Self::LSR => "LSR",
            Self::MSR => "MSR",
            Self::RXLVL => "RXLVL",
            Self::TXLVL => "TXLVL",
            Self::RHR => "RHR",
            Self::THR => "THR",
            Self::RX_ERRORS => "RX_ERRORS",
            _ => "?",
        }
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reg({}@{:#06x})", self.name(), self.0)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// `CFG0` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cfg0: u8 {
        /// Transmitter enable.
        const TXEN = 1 << 0;
        /// Receiver enable.
        const RXEN = 1 << 1;
        /// Reset (clear) the TX FIFO.
        const CTX = 1 << 2;
        /// Reset (clear) the RX FIFO.
        const CRX = 1 << 3;
        /// UART block enable.
        const ENABLE = 1 << 7;
    }
}

impl Cfg0 {
    /// Bits `start()` sets and `stop()` clears or resets.
    pub const RUN_MASK: Self = Self::TXEN
        .union(Self::RXEN)
        .union(Self::CTX)
        .union(Self::CRX);

    /// FIFO reset bits.
    pub const FIFO_RESET: Self = Self::CTX.union(Self::CRX);
}

bitflags! {
    /// `CFG1` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cfg1: u8 {
        /// Two stop bits (one when clear).
        const TWO_STOPBITS = 1 << 0;
        /// Parity generation and checking.
        const PARITY_EN = 1 << 1;
        /// Odd parity (even when clear).
        const PARITY_ODD = 1 << 2;
        /// Automatic RTS driven by the RX FIFO level.
        const RTS_EN = 1 << 3;
        /// Automatic TX gating on CTS.
        const CTS_EN = 1 << 4;
        /// Deassert RTS / hold off the remote sender.
        const THROTTLE = 1 << 5;
    }
}

bitflags! {
    /// Interrupt sources, shared by `IER` (enable) and `IIR` (pending).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Irq: u8 {
        /// RX FIFO holds data.
        const RHR = 1 << 0;
        /// TX FIFO has room.
        const THR = 1 << 1;
        /// Line status: at least one received byte carries an error.
        const RLSE = 1 << 2;
    }
}

bitflags! {
    /// `MSR` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Msr: u8 {
        /// CTS input level.
        const CTS = 1 << 0;
        /// RTS output level.
        const RTS = 1 << 1;
    }
}

/// Per-byte error codes read from `RX_ERRORS`.
pub mod rx_error {
    /// Byte received cleanly.
    pub const NONE: u8 = 0x00;
    /// Stop bit missing.
    pub const FRAMING: u8 = 0x01;
    /// Parity mismatch.
    pub const PARITY: u8 = 0x02;
    /// The controller's own FIFO overflowed before this byte.
    pub const FIFO_OVERRUN: u8 = 0x03;
    /// Break condition on the line.
    pub const BREAK: u8 = 0x04;
    /// Receiver hardware overrun inside the controller's UART peripheral.
    pub const HW_OVERRUN: u8 = 0x05;
}

/// Values of the `BAUD` select register.
pub mod baud_select {
    /// 1200 baud.
    pub const B1200: u8 = 0x00;
    /// 2400 baud.
    pub const B2400: u8 = 0x01;
    /// 4800 baud.
    pub const B4800: u8 = 0x02;
    /// 9600 baud.
    pub const B9600: u8 = 0x03;
    /// 19200 baud.
    pub const B19200: u8 = 0x04;
    /// 38400 baud.
    pub const B38400: u8 = 0x05;
    /// 57600 baud.
    pub const B57600: u8 = 0x06;
    /// 115200 baud.
    pub const B115200: u8 = 0x07;
    /// 230400 baud.
    pub const B230400: u8 = 0x08;
}

// FIFO windows must not overlap the control registers.
const _: () = {
    assert!(Reg::TXLVL.addr() < Reg::RHR.addr());
    assert!(Cfg0::RUN_MASK.bits() & Cfg0::ENABLE.bits() == 0);
};
