// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Interrupt-driven UART engine for UARTs behind a slow register bus.
//!
//! The UART lives in a companion controller whose registers are reached
//! over I2C or SPI: every register access can sleep and can fail. The line
//! discipline above still expects a classic UART contract, including
//! control calls from contexts that must not block. This crate bridges the
//! two:
//! - Atomic-safe requests only record intents and schedule deferred work
//! - One bus lock serializes the interrupt thread, the deferred work and
//!   synchronous callers
//! - RX is drained inline on interrupt, TX is pushed by rescheduling work
//!
//! # Modules
//!
//! - [`bus`]: `RegisterBus` trait and transport errors
//! - [`regs`]: Register map and bit layouts of the controller
//! - [`config`]: Attach-time `PortConfig` and runtime `LineSettings`
//! - [`control`]: Lock-free pending control intents
//! - [`work`]: Idempotently schedulable work and executors
//! - [`ldisc`]: Line discipline contract and transmit ring
//! - [`port`]: The `Port` controller and its engines
//!
//! # Example
//!
//! ```ignore
//! let executor = WorkerThread::spawn("tether-work")?;
//! let port = Port::attach(bus, ldisc, PortConfig::new(0), executor)?;
//! port.start()?;
//! port.reconfigure(LineSettings::new(115_200))?;
//! // From the interrupt thread:
//! port.handle_irq();
//! ```

pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod ldisc;
pub mod port;
pub mod regs;
pub mod work;

// Re-export commonly used types at crate root
pub use bus::{BusError, RegisterBus};
pub use config::{BaudRate, FlowCaps, LineSettings, PortConfig};
pub use error::UartError;
pub use ldisc::{LineDiscipline, RxFlag, TxRing};
pub use port::{Counters, IrqReturn, ModemStatus, Port};
pub use work::{Executor, ManualExecutor, Work, WorkerThread};
