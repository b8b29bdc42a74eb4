// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for port and line configuration.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use proptest::prelude::*;

#[test]
fn default_port_config_is_valid() {
    let config = PortConfig::default();
    assert_eq!(config.rx_fifo_size, 128);
    assert_eq!(config.tx_fifo_size, 128);
    assert!(config.validate().is_ok());
}

#[test]
fn fifo_sizes_outside_level_register_range_are_rejected() {
    let mut config = PortConfig::new(0);
    config.rx_fifo_size = 0;
    assert!(config.validate().is_err());

    let mut config = PortConfig::new(0);
    config.tx_fifo_size = 256;
    assert!(config.validate().is_err());

    let mut config = PortConfig::new(0);
    config.tx_fifo_size = 255;
    assert!(config.validate().is_ok());
}

#[test]
fn masking_forces_eight_bit_frames() {
    let requested = LineSettings::new(9600).with_data_bits(DataBits::Seven);
    let effective = requested.masked(FlowCaps::empty());
    assert_eq!(effective.data_bits, DataBits::Eight);
}

#[test]
fn masking_drops_software_flow_control() {
    let requested = LineSettings::new(9600).with_flow(FlowControl::Software);
    let effective = requested.masked(FlowCaps::RTS | FlowCaps::CTS);
    assert_eq!(effective.flow, FlowControl::None);
}

#[test]
fn masking_drops_hardware_flow_without_lines() {
    let requested = LineSettings::new(9600).with_flow(FlowControl::Hardware);
    assert_eq!(
        requested.masked(FlowCaps::empty()).flow,
        FlowControl::None
    );
    assert_eq!(
        requested.masked(FlowCaps::CTS).flow,
        FlowControl::Hardware
    );
}

#[test]
fn masking_folds_sticky_parity() {
    let caps = FlowCaps::empty();
    assert_eq!(
        LineSettings::new(9600)
            .with_parity(Parity::Mark)
            .masked(caps)
            .parity,
        Parity::Odd
    );
    assert_eq!(
        LineSettings::new(9600)
            .with_parity(Parity::Space)
            .masked(caps)
            .parity,
        Parity::Even
    );
}

#[test]
fn cfg1_framing_bits() {
    let caps = FlowCaps::empty();
    assert_eq!(LineSettings::new(9600).cfg1(caps), Cfg1::empty());

    let two_stop_odd = LineSettings::new(9600)
        .with_stop_bits(StopBits::Two)
        .with_parity(Parity::Odd);
    assert_eq!(
        two_stop_odd.cfg1(caps),
        Cfg1::TWO_STOPBITS | Cfg1::PARITY_EN | Cfg1::PARITY_ODD
    );

    let even = LineSettings::new(9600).with_parity(Parity::Even);
    assert_eq!(even.cfg1(caps), Cfg1::PARITY_EN);
}

#[test]
fn cfg1_auto_flow_follows_wired_lines() {
    let hw = LineSettings::new(9600).with_flow(FlowControl::Hardware);
    assert_eq!(hw.cfg1(FlowCaps::CTS), Cfg1::CTS_EN);
    assert_eq!(hw.cfg1(FlowCaps::RTS), Cfg1::RTS_EN);
    assert_eq!(
        hw.cfg1(FlowCaps::RTS | FlowCaps::CTS),
        Cfg1::RTS_EN | Cfg1::CTS_EN
    );
}

#[test]
fn default_baud_register_value() {
    assert_eq!(BaudRate::DEFAULT.bps(), 9600);
    assert_eq!(
        BaudRate::select(9600),
        BaudSelection::Supported(BaudRate::B9600)
    );
    assert_eq!(
        BaudRate::select(9600).rate().register_value(),
        crate::regs::baud_select::B9600
    );
}

#[test]
fn unsupported_baud_falls_back_to_default() {
    let selection = BaudRate::select(4000);
    assert_eq!(selection, BaudSelection::Fallback { requested: 4000 });
    assert_eq!(selection.rate(), BaudRate::B9600);
}

#[test]
fn out_of_range_baud_snaps_to_bounds() {
    assert_eq!(
        BaudRate::select(300),
        BaudSelection::Supported(BaudRate::B1200)
    );
    assert_eq!(
        BaudRate::select(921_600),
        BaudSelection::Supported(BaudRate::B230400)
    );
}

#[test]
fn hangup_baud_selects_default_quietly() {
    assert_eq!(
        BaudRate::select(0),
        BaudSelection::Supported(BaudRate::DEFAULT)
    );
}

#[test]
fn register_values_are_distinct() {
    for (i, a) in BaudRate::ALL.iter().enumerate() {
        for b in &BaudRate::ALL[i + 1..] {
            assert_ne!(a.register_value(), b.register_value());
        }
    }
}

proptest! {
    #[test]
    fn supported_rates_map_to_themselves(index in 0..BaudRate::ALL.len()) {
        let rate = BaudRate::ALL[index];
        prop_assert_eq!(BaudRate::select(rate.bps()), BaudSelection::Supported(rate));
    }

    #[test]
    fn any_request_selects_a_supported_rate(requested in any::<u32>()) {
        let rate = BaudRate::select(requested).rate();
        prop_assert!(BaudRate::ALL.contains(&rate));
        if BaudRate::from_bps(requested).is_none()
            && (BaudRate::MIN.bps()..=BaudRate::MAX.bps()).contains(&requested)
        {
            prop_assert_eq!(rate, BaudRate::DEFAULT);
        }
    }

    #[test]
    fn masked_settings_are_always_eight_bit_without_software_flow(
        bits in 0u8..4,
        flow in 0u8..3,
        caps in 0u8..4,
    ) {
        let data_bits = [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight][usize::from(bits)];
        let flow = [FlowControl::None, FlowControl::Hardware, FlowControl::Software][usize::from(flow)];
        let caps = FlowCaps::from_bits_truncate(caps);
        let effective = LineSettings::new(9600)
            .with_data_bits(data_bits)
            .with_flow(flow)
            .masked(caps);
        prop_assert_eq!(effective.data_bits, DataBits::Eight);
        prop_assert_ne!(effective.flow, FlowControl::Software);
        if caps.is_empty() {
            prop_assert_eq!(effective.flow, FlowControl::None);
        }
    }
}
