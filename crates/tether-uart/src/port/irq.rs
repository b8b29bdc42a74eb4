// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interrupt dispatch.

use tracing::{debug, error, trace};

use super::{IrqReturn, PortCore};
use crate::bus::RegisterBus;
use crate::ldisc::LineDiscipline;
use crate::regs::{Irq, Reg};

impl<B, L> PortCore<B, L>
where
    B: RegisterBus,
    L: LineDiscipline,
{
    /// Read `IIR` once and fan out. Holds the bus lock throughout.
    ///
    /// RX is serviced inline; TX is only scheduled so the interrupt thread
    /// does a bounded amount of work.
    pub(super) fn handle_irq(&self) -> IrqReturn {
        let line = self.line();
        let mut io = self.lock_io();
        if !io.started {
            debug!(line, "interrupt on stopped port");
            return IrqReturn::None;
        }

        let iir = match io.bus.read(Reg::IIR) {
            Ok(bits) => Irq::from_bits_truncate(bits),
            Err(err) => {
                // Still acknowledged; an unacknowledged level interrupt
                // would fire again immediately.
                error!(line, %err, "failed to read IIR");
                return IrqReturn::Handled;
            }
        };
        trace!(line, ?iir, "irq");

        if iir.contains(Irq::RHR) {
            self.handle_rx(&mut io, iir.contains(Irq::RLSE));
        }
        if iir.contains(Irq::THR) {
            self.tx_work.schedule();
        }
        IrqReturn::Handled
    }
}
