// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Port and line configuration.
//!
//! [`PortConfig`] is fixed at attach time and describes the hardware.
//! [`LineSettings`] is what the line discipline asks for at runtime; the
//! controller only supports 8-bit frames and hardware flow control, so
//! requests are normalised before anything is written.

#[cfg(test)]
mod config_test;

use bitflags::bitflags;

use crate::regs::{Cfg1, baud_select};

/// Default RX FIFO size of the companion controller.
pub const DEFAULT_RX_FIFO_SIZE: usize = 128;

/// Default TX FIFO size of the companion controller.
pub const DEFAULT_TX_FIFO_SIZE: usize = 128;

/// Largest FIFO the 8-bit level registers can describe.
pub const MAX_FIFO_SIZE: usize = u8::MAX as usize;

bitflags! {
    /// Flow-control lines actually wired to the controller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlowCaps: u8 {
        /// RTS output present.
        const RTS = 1 << 0;
        /// CTS input present.
        const CTS = 1 << 1;
    }
}

/// Attach-time configuration of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// Line index (`ttyX` number).
    pub line: u32,
    /// RX FIFO depth; also the size of the engine's receive buffers.
    pub rx_fifo_size: usize,
    /// TX FIFO depth; also the size of the engine's staging buffer.
    pub tx_fifo_size: usize,
    /// Wired flow-control lines.
    pub flow_caps: FlowCaps,
}

impl PortConfig {
    /// Configuration for line `line` with the controller's default FIFOs and
    /// no flow-control lines.
    #[must_use]
    pub const fn new(line: u32) -> Self {
        Self {
            line,
            rx_fifo_size: DEFAULT_RX_FIFO_SIZE,
            tx_fifo_size: DEFAULT_TX_FIFO_SIZE,
            flow_caps: FlowCaps::empty(),
        }
    }

    /// Same configuration with the given flow-control lines.
    #[must_use]
    pub const fn with_flow_caps(mut self, caps: FlowCaps) -> Self {
        self.flow_caps = caps;
        self
    }

    /// Check the configuration for values the engine cannot work with.
    pub const fn validate(&self) -> Result<(), &'static str> {
        if self.rx_fifo_size == 0 || self.rx_fifo_size > MAX_FIFO_SIZE {
            return Err("rx fifo size must be in 1..=255");
        }
        if self.tx_fifo_size == 0 || self.tx_fifo_size > MAX_FIFO_SIZE {
            return Err("tx fifo size must be in 1..=255");
        }
        Ok(())
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    /// 5 bits.
    Five,
    /// 6 bits.
    Six,
    /// 7 bits.
    Seven,
    /// 8 bits.
    Eight,
}

/// Stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    /// One stop bit.
    One,
    /// Two stop bits.
    Two,
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit.
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
    /// Parity bit always set (sticky parity).
    Mark,
    /// Parity bit always clear (sticky parity).
    Space,
}

/// Flow-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// No flow control.
    None,
    /// RTS/CTS handled by the controller.
    Hardware,
    /// XON/XOFF.
    Software,
}

/// Runtime line configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Character size.
    pub data_bits: DataBits,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Parity.
    pub parity: Parity,
    /// Flow control.
    pub flow: FlowControl,
    /// Baud rate in bits per second.
    pub baud: u32,
}

impl LineSettings {
    /// 8N1 without flow control at `baud`.
    #[must_use]
    pub const fn new(baud: u32) -> Self {
        Self {
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow: FlowControl::None,
            baud,
        }
    }

    /// Same settings with a different parity.
    #[must_use]
    pub const fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Same settings with a different number of stop bits.
    #[must_use]
    pub const fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Same settings with a different flow-control mode.
    #[must_use]
    pub const fn with_flow(mut self, flow: FlowControl) -> Self {
        self.flow = flow;
        self
    }

    /// Same settings with a different character size.
    #[must_use]
    pub const fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Mask the features the controller cannot do.
    ///
    /// Forces 8 data bits, drops software flow control, folds sticky parity
    /// into plain odd/even and drops hardware flow control when no RTS/CTS
    /// line is wired. The baud rate is left alone; see [`BaudRate::select`].
    #[must_use]
    pub const fn masked(self, caps: FlowCaps) -> Self {
        let flow = match self.flow {
            FlowControl::Hardware if !caps.is_empty() => FlowControl::Hardware,
            _ => FlowControl::None,
        };
        let parity = match self.parity {
            Parity::Mark => Parity::Odd,
            Parity::Space => Parity::Even,
            other => other,
        };
        Self {
            data_bits: DataBits::Eight,
            stop_bits: self.stop_bits,
            parity,
            flow,
            baud: self.baud,
        }
    }

    /// Framing and auto-flow bits of `CFG1` for already masked settings.
    #[must_use]
    pub const fn cfg1(&self, caps: FlowCaps) -> Cfg1 {
        let mut cfg1 = Cfg1::empty();
        if matches!(self.stop_bits, StopBits::Two) {
            cfg1 = cfg1.union(Cfg1::TWO_STOPBITS);
        }
        match self.parity {
            Parity::Even | Parity::Space => cfg1 = cfg1.union(Cfg1::PARITY_EN),
            Parity::Odd | Parity::Mark => {
                cfg1 = cfg1.union(Cfg1::PARITY_EN).union(Cfg1::PARITY_ODD);
            }
            Parity::None => {}
        }
        if matches!(self.flow, FlowControl::Hardware) {
            if caps.contains(FlowCaps::CTS) {
                cfg1 = cfg1.union(Cfg1::CTS_EN);
            }
            if caps.contains(FlowCaps::RTS) {
                cfg1 = cfg1.union(Cfg1::RTS_EN);
            }
        }
        cfg1
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::new(BaudRate::DEFAULT.bps())
    }
}

/// Baud rates the controller supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BaudRate {
    /// 1200 baud.
    B1200,
    /// 2400 baud.
    B2400,
    /// 4800 baud.
    B4800,
    /// 9600 baud.
    B9600,
    /// 19200 baud.
    B19200,
    /// 38400 baud.
    B38400,
    /// 57600 baud.
    B57600,
    /// 115200 baud.
    B115200,
    /// 230400 baud.
    B230400,
}

/// Outcome of mapping a requested baud rate onto [`BaudRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudSelection {
    /// The request was supported as is (possibly after clamping into range).
    Supported(BaudRate),
    /// The request was not supported; the default rate is used instead.
    Fallback {
        /// Rate that was asked for, after clamping.
        requested: u32,
    },
}

impl BaudSelection {
    /// Rate that will be programmed.
    #[must_use]
    pub const fn rate(self) -> BaudRate {
        match self {
            Self::Supported(rate) => rate,
            Self::Fallback { .. } => BaudRate::DEFAULT,
        }
    }
}

impl BaudRate {
    /// Rate used when a request cannot be honoured.
    pub const DEFAULT: Self = Self::B9600;

    /// Slowest supported rate.
    pub const MIN: Self = Self::B1200;

    /// Fastest supported rate.
    pub const MAX: Self = Self::B230400;

    /// Every supported rate, slowest first.
    pub const ALL: [Self; 9] = [
        Self::B1200,
        Self::B2400,
        Self::B4800,
        Self::B9600,
        Self::B19200,
        Self::B38400,
        Self::B57600,
        Self::B115200,
        Self::B230400,
    ];

    /// Bits per second.
    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::B1200 => 1200,
            Self::B2400 => 2400,
            Self::B4800 => 4800,
            Self::B9600 => 9600,
            Self::B19200 => 19_200,
            Self::B38400 => 38_400,
            Self::B57600 => 57_600,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
        }
    }

    /// Value of the `BAUD` select register.
    #[must_use]
    pub const fn register_value(self) -> u8 {
        match self {
            Self::B1200 => baud_select::B1200,
            Self::B2400 => baud_select::B2400,
            Self::B4800 => baud_select::B4800,
            Self::B9600 => baud_select::B9600,
            Self::B19200 => baud_select::B19200,
            Self::B38400 => baud_select::B38400,
            Self::B57600 => baud_select::B57600,
            Self::B115200 => baud_select::B115200,
            Self::B230400 => baud_select::B230400,
        }
    }

    /// Exact match of a rate in bits per second.
    #[must_use]
    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bps() == bps)
    }

    /// Map a requested rate onto a supported one.
    ///
    /// Requests outside [`MIN`](Self::MIN)..=[`MAX`](Self::MAX) snap to the
    /// nearest bound. In-range rates the controller has no divisor for fall
    /// back to [`DEFAULT`](Self::DEFAULT). Zero means hang-up and selects the
    /// default without counting as a fallback.
    #[must_use]
    pub fn select(requested: u32) -> BaudSelection {
        if requested == 0 {
            return BaudSelection::Supported(Self::DEFAULT);
        }
        let clamped = requested.clamp(Self::MIN.bps(), Self::MAX.bps());
        Self::from_bps(clamped).map_or(
            BaudSelection::Fallback { requested: clamped },
            BaudSelection::Supported,
        )
    }
}
