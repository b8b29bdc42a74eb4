// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Port controller.
//!
//! A [`Port`] is what the line discipline talks to. Its operations fall in
//! two groups:
//!
//! - **Atomic-safe requests** ([`request_stop_tx`](Port::request_stop_tx),
//!   [`request_stop_rx`](Port::request_stop_rx),
//!   [`request_start_tx`](Port::request_start_tx),
//!   [`request_rts`](Port::request_rts)): record an intent and schedule
//!   deferred work. They never touch the bus and never take the bus lock.
//! - **Synchronous operations** ([`start`](Port::start),
//!   [`stop`](Port::stop), [`reconfigure`](Port::reconfigure), ...): may
//!   sleep, take the bus lock and surface bus errors.
//!
//! ```text
//!   line discipline ──▶ Port ──┬─▶ ControlState ──▶ control work ─┐
//!                              └─▶ tx work ───────────────────────┤
//!   interrupt thread ──▶ handle_irq ──▶ RX engine (inline)        │
//!                                   └─▶ tx work                   │
//!                                                                 ▼
//!                                          bus lock ──▶ RegisterBus
//! ```
//!
//! Every register access happens with the bus lock held, so accesses from
//! the interrupt thread, the deferred work and synchronous callers are
//! totally ordered. Engines check the started flag under the same lock and
//! do nothing on a stopped port.

#[cfg(test)]
mod deferred_test;
#[cfg(test)]
mod rx_test;
#[cfg(test)]
mod testing;

mod counters;
mod deferred;
mod irq;
mod rx;
mod tx;

pub use counters::Counters;

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bitflags::bitflags;
use tracing::{debug, error, trace, warn};

use crate::bus::RegisterBus;
use crate::config::{BaudRate, BaudSelection, FlowCaps, LineSettings, PortConfig};
use crate::control::{ControlIntent, ControlState};
use crate::error::{BusResultExt, UartError};
use crate::ldisc::LineDiscipline;
use crate::regs::{Cfg0, Cfg1, Irq, Reg};
use crate::work::{Executor, Work};
use counters::PortCounters;

bitflags! {
    /// Modem control and status lines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModemStatus: u16 {
        /// Request to send.
        const RTS = 1 << 0;
        /// Data terminal ready.
        const DTR = 1 << 1;
        /// Clear to send.
        const CTS = 1 << 2;
        /// Carrier detect.
        const CAR = 1 << 3;
        /// Ring indicator.
        const RNG = 1 << 4;
        /// Data set ready.
        const DSR = 1 << 5;
    }
}

/// Whether an interrupt belonged to this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Not ours: the port is stopped.
    None,
    /// Acknowledged, including when the status read failed.
    Handled,
}

/// State that may only be touched with the bus lock held.
struct PortIo<B> {
    bus: B,
    started: bool,
    /// A stop-TX intent disabled the transmitter; the TX engine re-enables
    /// it before the next write.
    tx_halted: bool,
    throttled: bool,
    settings: LineSettings,
    rx_buf: Box<[u8]>,
    rx_errors: Box<[u8]>,
    tx_staging: Box<[u8]>,
}

/// Everything the engines and deferred work share.
struct PortCore<B, L> {
    config: PortConfig,
    io: Mutex<PortIo<B>>,
    control: ControlState,
    /// CFG1 has RTS_EN set; read from atomic context.
    auto_rts: AtomicBool,
    counters: PortCounters,
    ldisc: Arc<L>,
    tx_work: Arc<Work>,
    control_work: Arc<Work>,
}

impl<B, L> PortCore<B, L> {
    fn lock_io(&self) -> MutexGuard<'_, PortIo<B>> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    const fn line(&self) -> u32 {
        self.config.line
    }

    fn request_control(&self, intent: ControlIntent) {
        self.control.request(intent);
        self.control_work.schedule();
    }
}

/// One UART channel on the companion controller.
pub struct Port<B, L>
where
    B: RegisterBus + 'static,
    L: LineDiscipline + 'static,
{
    core: Arc<PortCore<B, L>>,
}

impl<B, L> Port<B, L>
where
    B: RegisterBus + 'static,
    L: LineDiscipline + 'static,
{
    /// Bind a port to its bus and line discipline.
    ///
    /// Validates `config`, enables the UART block and registers the TX and
    /// control work on `executor`. The port starts out stopped.
    pub fn attach(
        mut bus: B,
        ldisc: Arc<L>,
        config: PortConfig,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, UartError> {
        config.validate().map_err(UartError::InvalidConfig)?;

        bus.write(Reg::CFG0, Cfg0::ENABLE.bits())
            .on(Reg::CFG0)
            .inspect_err(|err| error!(line = config.line, %err, "failed to enable UART"))?;

        let core = Arc::new_cyclic(|weak: &Weak<PortCore<B, L>>| {
            let tx_port = weak.clone();
            let tx_work = Work::new("tether-tx", Arc::clone(&executor), move || {
                if let Some(core) = tx_port.upgrade() {
                    core.run_tx();
                }
            });
            let control_port = weak.clone();
            let control_work = Work::new("tether-control", executor, move || {
                if let Some(core) = control_port.upgrade() {
                    core.run_control();
                }
            });

            PortCore {
                config,
                io: Mutex::new(PortIo {
                    bus,
                    started: false,
                    tx_halted: false,
                    throttled: false,
                    settings: LineSettings::default(),
                    rx_buf: vec![0; config.rx_fifo_size].into_boxed_slice(),
                    rx_errors: vec![0; config.rx_fifo_size].into_boxed_slice(),
                    tx_staging: vec![0; config.tx_fifo_size].into_boxed_slice(),
                }),
                control: ControlState::new(),
                auto_rts: AtomicBool::new(false),
                counters: PortCounters::default(),
                ldisc,
                tx_work,
                control_work,
            }
        });

        debug!(line = config.line, "port attached");
        Ok(Self { core })
    }

    /// Reset and enable both FIFOs and unmask RX, TX and line-status
    /// interrupts.
    ///
    /// The port only counts as started once both writes went through.
    pub fn start(&self) -> Result<(), UartError> {
        let line = self.core.line();
        trace!(line, "start");

        let mut io = self.core.lock_io();
        let run = Cfg0::RUN_MASK.bits();
        io.bus
            .update_bits(Reg::CFG0, run, run)
            .on(Reg::CFG0)
            .inspect_err(|err| error!(line, %err, "failed to enable FIFOs"))?;

        let irqs = (Irq::RHR | Irq::THR | Irq::RLSE).bits();
        io.bus
            .update_bits(Reg::IER, irqs, irqs)
            .on(Reg::IER)
            .inspect_err(|err| error!(line, %err, "failed to unmask interrupts"))?;

        io.started = true;
        io.tx_halted = false;
        let stale = self.core.control.snapshot();
        self.core.control.clear(stale);
        Ok(())
    }

    /// Reset and disable both FIFOs, mask every interrupt and wait for
    /// deferred work.
    ///
    /// Both writes are attempted even if the first fails; the first error is
    /// returned. Once this returns, no deferred work touches the bus until
    /// the port is started again.
    pub fn stop(&self) -> Result<(), UartError> {
        let line = self.core.line();
        trace!(line, "stop");

        let result = {
            let mut io = self.core.lock_io();
            io.started = false;

            let cfg0 = io
                .bus
                .update_bits(Reg::CFG0, Cfg0::RUN_MASK.bits(), Cfg0::FIFO_RESET.bits())
                .on(Reg::CFG0)
                .inspect_err(|err| error!(line, %err, "failed to disable FIFOs"));
            let ier = io
                .bus
                .write(Reg::IER, 0)
                .on(Reg::IER)
                .inspect_err(|err| error!(line, %err, "failed to mask interrupts"));
            cfg0.and(ier)
        };

        self.core.tx_work.cancel_sync();
        self.core.control_work.cancel_sync();
        result
    }

    /// Apply new line settings.
    ///
    /// Unsupported features are masked first (see [`LineSettings::masked`]),
    /// then `CFG1` and `BAUD` are written. An unsupported baud rate falls
    /// back to [`BaudRate::DEFAULT`] with a warning. Returns the settings
    /// actually in effect.
    pub fn reconfigure(&self, requested: LineSettings) -> Result<LineSettings, UartError> {
        let line = self.core.line();
        let caps = self.core.config.flow_caps;
        trace!(line, ?requested, "reconfigure");

        let mut effective = requested.masked(caps);
        if effective != requested {
            warn!(line, ?requested, ?effective, "masked unsupported line settings");
        }

        let mut io = self.core.lock_io();
        let mut cfg1 = effective.cfg1(caps);
        if io.throttled {
            cfg1 |= Cfg1::THROTTLE;
        }
        io.bus
            .write(Reg::CFG1, cfg1.bits())
            .on(Reg::CFG1)
            .inspect_err(|err| error!(line, %err, "failed to write CFG1"))?;
        self.core
            .auto_rts
            .store(cfg1.contains(Cfg1::RTS_EN), Ordering::Release);
        io.settings = LineSettings {
            baud: io.settings.baud,
            ..effective
        };

        let selection = BaudRate::select(requested.baud);
        if let BaudSelection::Fallback { requested } = selection {
            warn!(
                line,
                requested,
                default = BaudRate::DEFAULT.bps(),
                "baud rate not supported, using default"
            );
        }
        let rate = selection.rate();
        io.bus
            .write(Reg::BAUD, rate.register_value())
            .on(Reg::BAUD)
            .inspect_err(|err| error!(line, %err, "failed to write BAUD"))?;

        effective.baud = rate.bps();
        io.settings = effective;
        Ok(effective)
    }

    /// Ask for the transmitter to stop. Atomic-safe.
    pub fn request_stop_tx(&self) {
        trace!(line = self.core.line(), "stop tx");
        self.core.request_control(ControlIntent::STOP_TX);
    }

    /// Ask for the receiver to stop. Atomic-safe.
    pub fn request_stop_rx(&self) {
        trace!(line = self.core.line(), "stop rx");
        self.core.request_control(ControlIntent::STOP_RX);
    }

    /// Kick the TX engine. Atomic-safe.
    pub fn request_start_tx(&self) {
        trace!(line = self.core.line(), "start tx");
        self.core.tx_work.schedule();
    }

    /// Ask for RTS to be driven to `asserted`. Atomic-safe.
    ///
    /// Ignored when RTS is not wired or the controller's automatic flow
    /// control owns it.
    pub fn request_rts(&self, asserted: bool) {
        let line = self.core.line();
        trace!(line, asserted, "request rts");
        if !self.core.config.flow_caps.contains(FlowCaps::RTS)
            || self.core.auto_rts.load(Ordering::Acquire)
        {
            debug!(line, "RTS not under software control, ignoring");
            return;
        }
        let intent = if asserted {
            ControlIntent::ASSERT_RTS
        } else {
            ControlIntent::DEASSERT_RTS
        };
        self.core.request_control(intent);
    }

    /// Modem line status.
    ///
    /// DSR and carrier are not wired and CTS/RTS belong to the flow-control
    /// engine. Sampling them would need the bus, which callers in atomic
    /// context cannot wait for, so this reports DSR and carrier asserted.
    #[must_use]
    pub fn query_modem_status(&self) -> ModemStatus {
        trace!(line = self.core.line(), "get mctrl");
        ModemStatus::DSR | ModemStatus::CAR
    }

    /// Set modem control lines. Does nothing: RTS follows the controller's
    /// flow-control engine.
    pub fn set_modem_lines(&self, lines: ModemStatus) {
        trace!(line = self.core.line(), ?lines, "set mctrl");
    }

    /// Whether the TX FIFO has drained. A failed read reports empty.
    #[must_use]
    pub fn tx_empty(&self) -> bool {
        let line = self.core.line();
        trace!(line, "tx empty");
        let mut io = self.core.lock_io();
        match io.bus.read(Reg::TXLVL) {
            Ok(free) => usize::from(free) == self.core.config.tx_fifo_size,
            Err(err) => {
                error!(line, %err, "failed to read TXLVL");
                true
            }
        }
    }

    /// Hold off the remote sender.
    pub fn throttle(&self) -> Result<(), UartError> {
        self.set_throttle(true)
    }

    /// Let the remote sender resume.
    pub fn unthrottle(&self) -> Result<(), UartError> {
        self.set_throttle(false)
    }

    fn set_throttle(&self, throttled: bool) -> Result<(), UartError> {
        let line = self.core.line();
        trace!(line, throttled, "throttle");
        let mut io = self.core.lock_io();
        let value = if throttled { Cfg1::THROTTLE.bits() } else { 0 };
        io.bus
            .update_bits(Reg::CFG1, Cfg1::THROTTLE.bits(), value)
            .on(Reg::CFG1)
            .inspect_err(|err| error!(line, %err, "failed to write CFG1"))?;
        io.throttled = throttled;
        Ok(())
    }

    /// Break is not supported by the controller.
    pub fn break_ctl(&self, on: bool) {
        warn!(line = self.core.line(), on, "BREAK condition not supported");
    }

    /// Service an interrupt from the controller. Call from a context that
    /// may sleep.
    pub fn handle_irq(&self) -> IrqReturn {
        self.core.handle_irq()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn counters(&self) -> Counters {
        self.core.counters.snapshot()
    }

    /// Settings last applied by [`reconfigure`](Self::reconfigure).
    #[must_use]
    pub fn settings(&self) -> LineSettings {
        self.core.lock_io().settings
    }

    /// Whether [`start`](Self::start) succeeded and no
    /// [`stop`](Self::stop) followed.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.core.lock_io().started
    }

    /// Line index.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.core.line()
    }

    /// Attach-time configuration.
    #[must_use]
    pub fn config(&self) -> &PortConfig {
        &self.core.config
    }
}

impl<B, L> Drop for Port<B, L>
where
    B: RegisterBus + 'static,
    L: LineDiscipline + 'static,
{
    fn drop(&mut self) {
        self.core.tx_work.cancel_sync();
        self.core.control_work.cancel_sync();
    }
}
