// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Transmit engine.

use tracing::{debug, error};

use super::{PortCore, PortIo};
use crate::bus::RegisterBus;
use crate::ldisc::LineDiscipline;
use crate::regs::{Cfg0, Irq, Reg};

impl<B, L> PortCore<B, L>
where
    B: RegisterBus,
    L: LineDiscipline,
{
    /// One TX work run: move as much pending data as the TX FIFO can take.
    ///
    /// Never waits for FIFO space. A full or unreadable FIFO reschedules the
    /// work and returns.
    pub(super) fn run_tx(&self) {
        let line = self.line();
        let mut io = self.lock_io();
        if !io.started {
            debug!(line, "tx work on stopped port");
            return;
        }
        if !self.ldisc.is_active() || self.ldisc.is_flow_stopped() {
            return;
        }
        let pending = self.ldisc.pending_tx();
        if pending == 0 {
            return;
        }

        if io.tx_halted {
            if let Err(err) = rearm_transmitter(&mut io.bus) {
                error!(line, %err, "failed to re-enable transmitter");
                self.tx_work.schedule();
                return;
            }
            io.tx_halted = false;
        }

        let headroom = match io.bus.read(Reg::TXLVL) {
            Ok(free) => usize::from(free),
            Err(err) => {
                error!(line, %err, "failed to read TXLVL");
                0
            }
        };
        if headroom == 0 {
            debug!(line, "TX FIFO is full");
            self.tx_work.schedule();
            return;
        }
        if headroom > io.tx_staging.len() {
            error!(
                line,
                headroom,
                capacity = io.tx_staging.len(),
                "invalid TXLVL value"
            );
            self.tx_work.schedule();
            return;
        }

        let PortIo {
            bus, tx_staging, ..
        } = &mut *io;
        let count = self
            .ldisc
            .read_tx_run(&mut tx_staging[..pending.min(headroom)]);
        self.counters.add_tx(count);
        if count > 0 {
            if let Err(err) = bus.bulk_write(Reg::THR, &tx_staging[..count]) {
                error!(line, %err, count, "failed to write THR");
            }
        }

        if self.ldisc.pending_tx() < self.ldisc.low_water_mark() {
            self.ldisc.notify_writable();
        }
    }
}

/// Undo a stop-TX: enable the transmitter and unmask TX-ready.
fn rearm_transmitter<B: RegisterBus>(bus: &mut B) -> Result<(), crate::bus::BusError> {
    bus.update_bits(Reg::CFG0, Cfg0::TXEN.bits(), Cfg0::TXEN.bits())?;
    bus.update_bits(Reg::IER, Irq::THR.bits(), Irq::THR.bits())
}
