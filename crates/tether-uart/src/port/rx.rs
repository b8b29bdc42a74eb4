// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Receive engine.

use tracing::{error, warn};

use super::{PortCore, PortIo};
use crate::bus::RegisterBus;
use crate::ldisc::{LineDiscipline, RxFlag};
use crate::regs::Reg;

impl<B, L> PortCore<B, L>
where
    B: RegisterBus,
    L: LineDiscipline,
{
    /// Drain the RX FIFO into the line discipline.
    ///
    /// `has_errors` is the line-status flag from `IIR`. Called with the bus
    /// lock held. Once a non-zero level has been read the batch is always
    /// flushed, whatever happens in between.
    pub(super) fn handle_rx(&self, io: &mut PortIo<B>, has_errors: bool) {
        let line = self.line();
        let level = match io.bus.read(Reg::RXLVL) {
            Ok(level) => usize::from(level),
            Err(err) => {
                error!(line, %err, "failed to read RXLVL");
                return;
            }
        };
        if level == 0 {
            return;
        }
        if level > io.rx_buf.len() {
            error!(line, level, capacity = io.rx_buf.len(), "invalid RXLVL value");
            return;
        }

        self.receive(io, level, has_errors);
        self.ldisc.flush_batch();
    }

    fn receive(&self, io: &mut PortIo<B>, level: usize, has_errors: bool) {
        let line = self.line();
        let PortIo {
            bus,
            rx_buf,
            rx_errors,
            ..
        } = io;

        let mut with_errors = false;
        if has_errors {
            match bus.read(Reg::LSR) {
                // Flag already cleared: skip the error vector.
                Ok(0) => {}
                Ok(_) => {
                    if let Err(err) = bus.bulk_read(Reg::RX_ERRORS, &mut rx_errors[..level]) {
                        error!(line, %err, "failed to read RX_ERRORS");
                        return;
                    }
                    with_errors = true;
                }
                Err(err) => {
                    error!(line, %err, "failed to read LSR");
                    return;
                }
            }
        }

        let data = &mut rx_buf[..level];
        if let Err(err) = bus.bulk_read(Reg::RHR, data) {
            warn!(line, %err, "failed to read RHR, retrying");
            if let Err(err) = bus.bulk_read(Reg::RHR, data) {
                error!(line, %err, level, "failed to read RHR, dropping batch");
                return;
            }
        }
        self.counters.add_rx(level);

        for (index, &byte) in data.iter().enumerate() {
            if self.ldisc.handle_sysrq(byte) {
                continue;
            }
            let flag = if with_errors {
                RxFlag::from_error_code(rx_errors[index])
            } else {
                RxFlag::Normal
            };
            self.counters.record(flag);
            if !self.ldisc.push(byte, flag) {
                let dropped = level - index;
                self.counters.add_overrun(dropped);
                error!(line, byte, dropped, "line discipline rejected byte");
                break;
            }
        }
    }
}
