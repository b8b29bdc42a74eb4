// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Threaded interrupt handler.

use core::sync::atomic::{AtomicBool, Ordering};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tether_uart::{IrqReturn, LineDiscipline, Port, RegisterBus};
use tracing::debug;

use crate::controller::IrqLine;

/// How long the handler sleeps on a quiet line before checking for
/// shutdown.
const POLL: Duration = Duration::from_millis(20);

/// Thread that services a port whenever its interrupt line is asserted.
pub struct IrqThread {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IrqThread {
    /// Start servicing `port` from `line`.
    pub fn spawn<B, L>(port: Arc<Port<B, L>>, line: IrqLine) -> io::Result<Self>
    where
        B: RegisterBus + 'static,
        L: LineDiscipline + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(format!("tether-irq{}", port.line()))
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    if line.wait(POLL) && port.handle_irq() == IrqReturn::None {
                        // Nobody claims the line; back off instead of spinning on it.
                        debug!(line = port.line(), "spurious interrupt");
                        thread::sleep(POLL);
                    }
                }
            })?;
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }
}

impl Drop for IrqThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("interrupt thread panicked");
            }
        }
    }
}
