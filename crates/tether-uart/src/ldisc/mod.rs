// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Line discipline contract.
//!
//! The layer above the engine owns character processing and buffering. The
//! engine only pushes received bytes into it and drains its transmit buffer;
//! it never writes into that buffer and only ever advances its tail.


#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockLdisc;

use crate::regs::rx_error;

/// Pending transmit count below which writers are woken.
pub const WAKEUP_CHARS: usize = 256;

/// Classification of a received byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RxFlag {
    /// Received cleanly.
    Normal,
    /// Framing error.
    Framing,
    /// Parity error.
    Parity,
    /// Data was lost before this byte.
    Overrun,
    /// Break condition or receiver hardware fault.
    Break,
}

impl RxFlag {
    /// Classify a per-byte code from the `RX_ERRORS` window.
    ///
    /// Unknown codes are treated as clean bytes.
    #[must_use]
    pub const fn from_error_code(code: u8) -> Self {
        match code {
            rx_error::FRAMING => Self::Framing,
            rx_error::PARITY => Self::Parity,
            rx_error::FIFO_OVERRUN => Self::Overrun,
            rx_error::BREAK | rx_error::HW_OVERRUN => Self::Break,
            _ => Self::Normal,
        }
    }
}

/// Byte sink and transmit source above a port.
///
/// Every method may be called while the port holds its bus lock, so
/// implementations must not call back into the port.
pub trait LineDiscipline: Send + Sync {
    /// Whether a terminal is attached. Transmission stops when it is not.
    fn is_active(&self) -> bool;

    /// Accept one received byte. Returns `false` if it had to be dropped.
    fn push(&self, byte: u8, flag: RxFlag) -> bool;

    /// A batch of received bytes is complete.
    fn flush_batch(&self);

    /// Offer a byte to the out-of-band request handler. Returns `true` if
    /// the byte was consumed and must not be pushed.
    fn handle_sysrq(&self, _byte: u8) -> bool {
        false
    }

    /// Bytes waiting in the transmit buffer.
    fn pending_tx(&self) -> usize;

    /// Move up to `buf.len()` bytes out of the transmit buffer, advancing
    /// its tail by exactly the count returned.
    fn read_tx_run(&self, buf: &mut [u8]) -> usize;

    /// There is room for writers again.
    fn notify_writable(&self);

    /// Threshold for [`notify_writable`](Self::notify_writable).
    fn low_water_mark(&self) -> usize {
        WAKEUP_CHARS
    }

    /// Whether transmission is paused by software flow control.
    fn is_flow_stopped(&self) -> bool;
}

/// Circular transmit buffer.
///
/// The capacity is a power of two so indices wrap with a mask. Head and
/// tail run freely and are only masked on access, which keeps "full" and
/// "empty" apart without sacrificing a slot.
#[derive(Debug, Clone)]
pub struct TxRing {
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
}

impl TxRing {
    /// Default capacity, one page.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Ring holding at least `capacity` bytes (rounded up to a power of two).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
        }
    }

    /// Total capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn mask(&self, index: usize) -> usize {
        index & (self.buf.len() - 1)
    }

    /// Bytes queued and not yet consumed.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.head.wrapping_sub(self.tail)
    }

    /// Free space.
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.pending()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Queue as much of `data` as fits. Returns the number of bytes queued.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.free());
        for &byte in &data[..count] {
            let slot = self.mask(self.head);
            self.buf[slot] = byte;
            self.head = self.head.wrapping_add(1);
        }
        count
    }

    /// Copy up to `out.len()` bytes out of the ring, advancing the tail by
    /// exactly the number copied.
    pub fn consume_into(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.pending());
        for slot in &mut out[..count] {
            *slot = self.buf[self.mask(self.tail)];
            self.tail = self.tail.wrapping_add(1);
        }
        count
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.tail = self.head;
    }
}

impl Default for TxRing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
