// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Drive a port on the loopback controller from the command line.
//!
//! ```text
//! tether-sim [--baud <n>] [--message <text>]
//! ```
//!
//! Log output is controlled by `TETHER_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use tether_sim::{SimError, Simulation};
use tether_uart::{LineSettings, PortConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_MESSAGE: &str = "hello from tether";
const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

struct Options {
    baud: u32,
    message: String,
}

fn usage() -> ExitCode {
    eprintln!("Usage: tether-sim [--baud <n>] [--message <text>]");
    ExitCode::FAILURE
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Options> {
    let mut options = Options {
        baud: 115_200,
        message: DEFAULT_MESSAGE.into(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--baud" => options.baud = args.next()?.parse().ok()?,
            "--message" => options.message = args.next()?,
            _ => return None,
        }
    }
    Some(options)
}

fn run(options: &Options) -> Result<bool, SimError> {
    let sim = Simulation::start(PortConfig::new(0))?;
    let settings = sim.port.reconfigure(LineSettings::new(options.baud))?;
    info!(baud = settings.baud, "line configured");

    let message = options.message.as_bytes();
    let queued = sim.send(message);
    if queued < message.len() {
        warn!(queued, len = message.len(), "message truncated");
    }

    let echo = sim.console.wait_for(queued, ECHO_TIMEOUT);
    let matched = echo == message[..queued];
    println!("echo: {}", String::from_utf8_lossy(&echo));

    let counters = sim.port.counters();
    println!(
        "rx={} tx={} frame={} parity={} overrun={} brk={}",
        counters.rx, counters.tx, counters.frame, counters.parity, counters.overrun, counters.brk
    );

    sim.shutdown()?;
    Ok(matched)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(options) = parse_args(env::args().skip(1)) else {
        return usage();
    };

    match run(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("echo did not match the message");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
