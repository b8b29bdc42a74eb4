// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Simulator for the Tether UART engine.
//!
//! Models the companion controller at register level and wires it to a
//! real [`Port`] running on worker threads:
//!
//! ```text
//!  Console ──▶ Port ──▶ LoopbackController ──┐
//!     ▲                  TX FIFO ─▶ wire ─▶ RX FIFO
//!     │                                      │ IrqLine
//!     └────── Port::handle_irq ◀── IrqThread ◀┘
//! ```
//!
//! # Modules
//!
//! - [`controller`]: Register file, FIFOs and interrupt line
//! - [`console`]: Line discipline collecting what comes back
//! - [`irq`]: Interrupt thread

pub mod console;
pub mod controller;
pub mod irq;

pub use console::Console;
pub use controller::{IrqLine, LoopbackController};
pub use irq::IrqThread;

use core::fmt;
use std::io;
use std::sync::Arc;

use tether_uart::{Port, PortConfig, UartError, WorkerThread};
use tracing::info;

/// Port type driven by the simulator.
pub type SimPort = Port<LoopbackController, Console>;

/// Failure to bring up or tear down a simulation.
#[derive(Debug)]
pub enum SimError {
    /// A port operation failed.
    Uart(UartError),
    /// A thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uart(e) => write!(f, "{e}"),
            Self::Spawn(e) => write!(f, "failed to spawn thread: {e}"),
        }
    }
}

impl core::error::Error for SimError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Uart(e) => Some(e),
            Self::Spawn(e) => Some(e),
        }
    }
}

impl From<UartError> for SimError {
    fn from(e: UartError) -> Self {
        Self::Uart(e)
    }
}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        Self::Spawn(e)
    }
}

/// A started port on a loopback controller, serviced by its own worker
/// and interrupt threads.
pub struct Simulation {
    /// The modelled controller.
    pub controller: LoopbackController,
    /// Line discipline on top of the port.
    pub console: Arc<Console>,
    /// The port under test.
    pub port: Arc<SimPort>,
    irq: Option<IrqThread>,
}

impl Simulation {
    /// Attach and start a port described by `config`.
    pub fn start(config: PortConfig) -> Result<Self, SimError> {
        let controller = LoopbackController::new();
        let console = Arc::new(Console::new());
        let executor = WorkerThread::spawn(&format!("tether-work{}", config.line))?;

        let port = Arc::new(Port::attach(
            controller.clone(),
            Arc::clone(&console),
            config,
            executor,
        )?);
        port.start()?;
        let irq = IrqThread::spawn(Arc::clone(&port), controller.irq_line())?;
        info!(line = config.line, "simulation started");

        Ok(Self {
            controller,
            console,
            port,
            irq: Some(irq),
        })
    }

    /// Queue `data` on the console and kick the transmitter. Returns how
    /// many bytes were queued.
    pub fn send(&self, data: &[u8]) -> usize {
        let queued = self.console.write(data);
        self.port.request_start_tx();
        queued
    }

    /// Stop the port, then the interrupt thread.
    pub fn shutdown(mut self) -> Result<(), SimError> {
        let result = self.port.stop();
        drop(self.irq.take());
        info!(line = self.port.line(), "simulation stopped");
        result.map_err(SimError::from)
    }
}
