// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Register-level model of the companion controller's UART block.
//!
//! The TX FIFO is wired back into the RX FIFO ("loopback"), so whatever the
//! engine transmits comes back as received data. Interrupt sources follow
//! the FIFO state and `IER`; TX-ready is an edge raised each time the wire
//! drains the TX FIFO and cleared by reading `IIR`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tether_uart::regs::{Cfg0, Irq, Reg, rx_error};
use tether_uart::{BusError, RegisterBus};
use tracing::trace;

/// FIFO depth of the modelled controller.
pub const FIFO_SIZE: usize = 128;

struct Model {
    cfg0: u8,
    cfg1: u8,
    baud: u8,
    ier: u8,
    msr: u8,
    /// Received bytes with their per-byte error code.
    rx: VecDeque<(u8, u8)>,
    tx: VecDeque<u8>,
    tx_ready: bool,
    wire_paused: bool,
    /// Error code attached to the next byte that reaches the RX FIFO.
    next_error: Option<u8>,
    failures: VecDeque<(Reg, BusError)>,
    transactions: u64,
}

impl Model {
    const fn new() -> Self {
        Self {
            cfg0: 0,
            cfg1: 0,
            baud: 0,
            ier: 0,
            msr: 0,
            rx: VecDeque::new(),
            tx: VecDeque::new(),
            tx_ready: false,
            wire_paused: false,
            next_error: None,
            failures: VecDeque::new(),
            transactions: 0,
        }
    }

    fn cfg0(&self) -> Cfg0 {
        Cfg0::from_bits_truncate(self.cfg0)
    }

    fn pending(&self) -> Irq {
        let enabled = Irq::from_bits_truncate(self.ier);
        let mut pending = Irq::empty();
        if !self.rx.is_empty() {
            pending |= Irq::RHR;
            if self.rx.iter().any(|&(_, code)| code != rx_error::NONE) {
                pending |= Irq::RLSE;
            }
        }
        if self.tx_ready {
            pending |= Irq::THR;
        }
        pending & enabled
    }

    fn take_failure(&mut self, reg: Reg) -> Result<(), BusError> {
        self.transactions += 1;
        match self.failures.iter().position(|&(r, _)| r == reg) {
            Some(index) => Err(self.failures.remove(index).map_or(BusError::Io, |(_, err)| err)),
            None => Ok(()),
        }
    }

    /// One byte arrives from the wire.
    fn receive(&mut self, byte: u8) {
        if !self.cfg0().contains(Cfg0::RXEN) {
            return;
        }
        if self.rx.len() >= FIFO_SIZE {
            // Mark the overflow on the newest byte still held.
            if let Some(last) = self.rx.back_mut() {
                last.1 = rx_error::FIFO_OVERRUN;
            }
            return;
        }
        let code = self.next_error.take().unwrap_or(rx_error::NONE);
        self.rx.push_back((byte, code));
    }

    /// Move the TX FIFO onto the wire.
    fn drain(&mut self) {
        if self.wire_paused || !self.cfg0().contains(Cfg0::TXEN) || self.tx.is_empty() {
            return;
        }
        while let Some(byte) = self.tx.pop_front() {
            self.receive(byte);
        }
        self.tx_ready = true;
    }

    fn write_cfg0(&mut self, value: u8) {
        let bits = Cfg0::from_bits_truncate(value);
        if bits.contains(Cfg0::CTX) {
            self.tx.clear();
        }
        if bits.contains(Cfg0::CRX) {
            self.rx.clear();
        }
        // Reset bits are self-clearing.
        self.cfg0 = (bits - Cfg0::FIFO_RESET).bits();
    }
}

struct Shared {
    model: Mutex<Model>,
    irq: Condvar,
}

/// Bus handle onto the modelled controller.
///
/// Clones share the same controller; the port owns one clone while the
/// harness keeps another to inject traffic and faults.
#[derive(Clone)]
pub struct LoopbackController {
    shared: Arc<Shared>,
}

impl LoopbackController {
    /// Controller in its reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                model: Mutex::new(Model::new()),
                irq: Condvar::new(),
            }),
        }
    }

    fn model(&self) -> MutexGuard<'_, Model> {
        self.shared
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the model and update the interrupt line.
    fn with_model<T>(&self, f: impl FnOnce(&mut Model) -> T) -> T {
        let mut model = self.model();
        let result = f(&mut model);
        if !model.pending().is_empty() {
            self.shared.irq.notify_all();
        }
        result
    }

    /// Interrupt line of this controller.
    #[must_use]
    pub fn irq_line(&self) -> IrqLine {
        IrqLine {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Bytes arriving from the remote end.
    pub fn inject_rx(&self, data: &[u8]) {
        self.with_model(|model| {
            for &byte in data {
                model.receive(byte);
            }
        });
    }

    /// Attach an error code (see [`rx_error`]) to the next received byte.
    pub fn inject_line_error(&self, code: u8) {
        self.model().next_error = Some(code);
    }

    /// Make the next access to `reg` fail with `err`.
    pub fn fail_next(&self, reg: Reg, err: BusError) {
        self.model().failures.push_back((reg, err));
    }

    /// Stop or resume draining the TX FIFO onto the wire.
    pub fn pause_wire(&self, paused: bool) {
        self.with_model(|model| {
            model.wire_paused = paused;
            model.drain();
        });
    }

    /// Bytes waiting in the TX FIFO.
    #[must_use]
    pub fn tx_level(&self) -> usize {
        self.model().tx.len()
    }

    /// Bytes waiting in the RX FIFO.
    #[must_use]
    pub fn rx_level(&self) -> usize {
        self.model().rx.len()
    }

    /// Current value of a control register.
    #[must_use]
    pub fn reg(&self, reg: Reg) -> u8 {
        let model = self.model();
        match reg {
            Reg::CFG0 => model.cfg0,
            Reg::CFG1 => model.cfg1,
            Reg::BAUD => model.baud,
            Reg::IER => model.ier,
            Reg::MSR => model.msr,
            _ => 0,
        }
    }

    /// Number of bus transactions served so far.
    #[must_use]
    pub fn transactions(&self) -> u64 {
        self.model().transactions
    }
}

impl Default for LoopbackController {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for LoopbackController {
    fn read(&mut self, reg: Reg) -> Result<u8, BusError> {
        self.with_model(|model| {
            model.take_failure(reg)?;
            let value = match reg {
                Reg::CFG0 => model.cfg0,
                Reg::CFG1 => model.cfg1,
                Reg::BAUD => model.baud,
                Reg::IER => model.ier,
                Reg::MSR => model.msr,
                Reg::IIR => {
                    let pending = model.pending();
                    model.tx_ready = false;
                    pending.bits()
                }
                Reg::LSR => u8::from(model.rx.iter().any(|&(_, code)| code != rx_error::NONE)),
                Reg::RXLVL => u8::try_from(model.rx.len()).unwrap_or(u8::MAX),
                Reg::TXLVL => u8::try_from(FIFO_SIZE - model.tx.len()).unwrap_or(u8::MAX),
                _ => 0,
            };
            trace!(%reg, value, "sim read");
            Ok(value)
        })
    }

    fn bulk_read(&mut self, reg: Reg, buf: &mut [u8]) -> Result<(), BusError> {
        self.with_model(|model| {
            model.take_failure(reg)?;
            match reg {
                Reg::RHR => {
                    for slot in buf.iter_mut() {
                        *slot = model.rx.pop_front().map_or(0, |(byte, _)| byte);
                    }
                }
                Reg::RX_ERRORS => {
                    for (slot, &(_, code)) in buf.iter_mut().zip(model.rx.iter()) {
                        *slot = code;
                    }
                }
                _ => buf.fill(0),
            }
            Ok(())
        })
    }

    fn write(&mut self, reg: Reg, value: u8) -> Result<(), BusError> {
        self.with_model(|model| {
            model.take_failure(reg)?;
            trace!(%reg, value, "sim write");
            match reg {
                Reg::CFG0 => {
                    model.write_cfg0(value);
                    model.drain();
                }
                Reg::CFG1 => model.cfg1 = value,
                Reg::BAUD => model.baud = value,
                Reg::IER => model.ier = value,
                Reg::MSR => model.msr = value,
                Reg::THR => {
                    if model.tx.len() < FIFO_SIZE {
                        model.tx.push_back(value);
                    }
                    model.drain();
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn bulk_write(&mut self, reg: Reg, data: &[u8]) -> Result<(), BusError> {
        self.with_model(|model| {
            model.take_failure(reg)?;
            if reg == Reg::THR {
                let room = FIFO_SIZE - model.tx.len();
                model.tx.extend(data.iter().take(room));
                model.drain();
            }
            Ok(())
        })
    }
}

/// Interrupt line of a [`LoopbackController`]. Level triggered.
#[derive(Clone)]
pub struct IrqLine {
    shared: Arc<Shared>,
}

impl IrqLine {
    /// Whether any enabled source is pending.
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        !self
            .shared
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending()
            .is_empty()
    }

    /// Wait up to `timeout` for the line to be asserted.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self
            .shared
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .shared
            .irq
            .wait_timeout_while(guard, timeout, |model| model.pending().is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        !guard.pending().is_empty()
    }
}
