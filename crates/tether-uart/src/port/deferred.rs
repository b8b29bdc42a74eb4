// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Deferred control work.

use tracing::{debug, error, trace};

use super::PortCore;
use crate::bus::RegisterBus;
use crate::control::ControlIntent;
use crate::ldisc::LineDiscipline;
use crate::regs::{Cfg0, Irq, Msr, Reg};

impl<B, L> PortCore<B, L>
where
    B: RegisterBus,
    L: LineDiscipline,
{
    /// Apply every pending control intent as one batch of register writes.
    ///
    /// The intents observed at entry are cleared after all writes have been
    /// attempted, failed or not. Intents recorded meanwhile stay pending.
    pub(super) fn run_control(&self) {
        let line = self.line();
        let mut io = self.lock_io();

        let intents = self.control.snapshot();
        if intents.is_empty() {
            debug!(line, "no control work pending");
            return;
        }
        if !io.started {
            debug!(line, ?intents, "port stopped, discarding control work");
            self.control.clear(intents);
            return;
        }
        trace!(line, ?intents, "control work");

        let mut ier_mask = Irq::empty();
        let mut cfg0_mask = Cfg0::empty();
        if intents.contains(ControlIntent::STOP_RX) {
            ier_mask |= Irq::RHR;
            cfg0_mask |= Cfg0::CRX | Cfg0::RXEN;
        }
        if intents.contains(ControlIntent::STOP_TX) {
            ier_mask |= Irq::THR;
            cfg0_mask |= Cfg0::CTX | Cfg0::TXEN;
            io.tx_halted = true;
        }

        if !ier_mask.is_empty() {
            if let Err(err) = io.bus.update_bits(Reg::IER, ier_mask.bits(), 0) {
                error!(line, %err, "failed to write IER");
            }
            // Reset bits set, enable bits cleared.
            let reset = cfg0_mask & Cfg0::FIFO_RESET;
            if let Err(err) = io
                .bus
                .update_bits(Reg::CFG0, cfg0_mask.bits(), reset.bits())
            {
                error!(line, %err, "failed to write CFG0");
            }
        }

        if let Some(asserted) = intents.rts_level() {
            let value = if asserted { Msr::RTS.bits() } else { 0 };
            if let Err(err) = io.bus.update_bits(Reg::MSR, Msr::RTS.bits(), value) {
                error!(line, %err, "failed to write MSR");
            }
        }

        self.control.clear(intents);
    }
}
