// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Pending control intents.
//!
//! Control requests arrive from contexts that must not block, so they are
//! only recorded here and applied later by the deferred control worker.
//! Recording is a single atomic OR. The worker takes a snapshot, applies
//! it, and then clears exactly the bits it observed: an intent recorded
//! while the worker is running survives into the next run.


use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Control operations waiting for the deferred worker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlIntent: u8 {
        /// Mask RX interrupts, reset and disable the receiver.
        const STOP_RX = 1 << 0;
        /// Mask TX interrupts, reset and disable the transmitter.
        const STOP_TX = 1 << 1;
        /// Drive RTS active.
        const ASSERT_RTS = 1 << 2;
        /// Drive RTS inactive.
        const DEASSERT_RTS = 1 << 3;
    }
}

impl ControlIntent {
    /// Either RTS intent.
    pub const RTS: Self = Self::ASSERT_RTS.union(Self::DEASSERT_RTS);

    /// Requested RTS level, if any. Assert wins when both are pending.
    #[must_use]
    pub const fn rts_level(self) -> Option<bool> {
        if self.contains(Self::ASSERT_RTS) {
            Some(true)
        } else if self.contains(Self::DEASSERT_RTS) {
            Some(false)
        } else {
            None
        }
    }
}

/// Lock-free accumulator of [`ControlIntent`]s.
#[derive(Debug, Default)]
pub struct ControlState {
    pending: AtomicU8,
}

impl ControlState {
    /// Empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
        }
    }

    /// Record `intent`. Safe from any context.
    ///
    /// Returns `true` if any of the bits were not already pending.
    pub fn request(&self, intent: ControlIntent) -> bool {
        let previous = self.pending.fetch_or(intent.bits(), Ordering::AcqRel);
        previous & intent.bits() != intent.bits()
    }

    /// Intents currently pending.
    #[must_use]
    pub fn snapshot(&self) -> ControlIntent {
        ControlIntent::from_bits_truncate(self.pending.load(Ordering::Acquire))
    }

    /// Clear the intents in `applied`, keeping anything recorded since the
    /// snapshot was taken.
    pub fn clear(&self, applied: ControlIntent) {
        self.pending.fetch_and(!applied.bits(), Ordering::AcqRel);
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
