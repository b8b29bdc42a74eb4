// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the receive engine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::testing::{Harness, capture_logs, count_matching};
use super::*;

use proptest::prelude::*;
use tracing::Level;

use crate::bus::{BusError, BusOp, OpKind};
use crate::ldisc::RxFlag;
use crate::regs::rx_error;

/// Started harness with `data` waiting in the RX FIFO.
fn with_rx(data: &[u8], line_status: bool) -> Harness {
    let h = Harness::started();
    let iir = if line_status {
        Irq::RHR | Irq::RLSE
    } else {
        Irq::RHR
    };
    h.bus.set_reg(Reg::IIR, iir.bits());
    h.bus.set_reg(Reg::RXLVL, u8::try_from(data.len()).unwrap());
    h.bus.set_window(Reg::RHR, data);
    h
}

fn bulk_reads(h: &Harness, reg: Reg) -> usize {
    h.bus
        .log()
        .iter()
        .filter(|op| matches!(op, BusOp::BulkRead(r, _) if *r == reg))
        .count()
}

#[test]
fn error_vector_classifies_each_byte() {
    let h = with_rx(b"hello", true);
    h.bus.set_reg(Reg::LSR, 0x01);
    h.bus.set_window(
        Reg::RX_ERRORS,
        &[
            rx_error::NONE,
            rx_error::NONE,
            rx_error::FRAMING,
            rx_error::NONE,
            rx_error::FIFO_OVERRUN,
        ],
    );

    h.port.handle_irq();

    assert_eq!(
        h.ldisc.received(),
        vec![
            (b'h', RxFlag::Normal),
            (b'e', RxFlag::Normal),
            (b'l', RxFlag::Framing),
            (b'l', RxFlag::Normal),
            (b'o', RxFlag::Overrun),
        ]
    );
    assert_eq!(h.ldisc.flushes(), 1);
    let counters = h.port.counters();
    assert_eq!(counters.rx, 5);
    assert_eq!(counters.frame, 1);
    assert_eq!(counters.overrun, 1);
    assert_eq!(counters.parity, 0);
    assert_eq!(counters.brk, 0);
}

#[test]
fn break_and_hardware_overrun_count_as_break() {
    let h = with_rx(b"ab", true);
    h.bus.set_reg(Reg::LSR, 0x01);
    h.bus
        .set_window(Reg::RX_ERRORS, &[rx_error::BREAK, rx_error::HW_OVERRUN]);

    h.port.handle_irq();

    assert_eq!(
        h.ldisc.received(),
        vec![(b'a', RxFlag::Break), (b'b', RxFlag::Break)]
    );
    assert_eq!(h.port.counters().brk, 2);
}

#[test]
fn clear_line_status_skips_error_vector() {
    let h = with_rx(b"abc", true);
    h.bus.set_reg(Reg::LSR, 0);
    h.bus.set_window(Reg::RX_ERRORS, &[rx_error::PARITY; 3]);

    h.port.handle_irq();

    assert_eq!(bulk_reads(&h, Reg::RX_ERRORS), 0);
    assert!(h.ldisc.received().iter().all(|&(_, flag)| flag == RxFlag::Normal));
}

#[test]
fn empty_fifo_does_nothing() {
    let h = with_rx(b"", false);
    h.port.handle_irq();
    assert_eq!(bulk_reads(&h, Reg::RHR), 0);
    assert_eq!(h.ldisc.flushes(), 0);
}

#[test]
fn level_read_failure_does_nothing() {
    let h = with_rx(b"abc", false);
    h.bus.fail_next(OpKind::Read, Reg::RXLVL, BusError::Io, 1);
    h.port.handle_irq();
    assert_eq!(bulk_reads(&h, Reg::RHR), 0);
    assert_eq!(h.ldisc.flushes(), 0);
}

#[test]
fn oversized_level_is_rejected() {
    let h = Harness::started();
    h.bus.set_reg(Reg::IIR, Irq::RHR.bits());
    h.bus.set_reg(Reg::RXLVL, 200);

    let ((), events) = capture_logs(|| {
        h.port.handle_irq();
    });

    assert_eq!(bulk_reads(&h, Reg::RHR), 0);
    assert!(h.ldisc.received().is_empty());
    assert_eq!(count_matching(&events, Level::ERROR, "invalid RXLVL"), 1);
}

#[test]
fn data_read_is_retried_once() {
    let h = with_rx(b"retry", false);
    h.bus.fail_next(OpKind::BulkRead, Reg::RHR, BusError::Timeout, 1);

    let ((), events) = capture_logs(|| {
        h.port.handle_irq();
    });

    assert_eq!(bulk_reads(&h, Reg::RHR), 2);
    assert_eq!(h.ldisc.received_bytes(), b"retry");
    assert_eq!(h.port.counters().rx, 5);
    assert_eq!(count_matching(&events, Level::WARN, "retrying"), 1);
}

#[test]
fn second_read_failure_drops_batch_but_flushes() {
    let h = with_rx(b"lost", false);
    h.bus.fail_next(OpKind::BulkRead, Reg::RHR, BusError::Timeout, 2);

    let ((), events) = capture_logs(|| {
        h.port.handle_irq();
    });

    assert_eq!(bulk_reads(&h, Reg::RHR), 2);
    assert!(h.ldisc.received().is_empty());
    assert_eq!(h.ldisc.flushes(), 1);
    assert_eq!(h.port.counters().rx, 0);
    assert_eq!(count_matching(&events, Level::ERROR, "dropping batch"), 1);
}

#[test]
fn line_status_failure_flushes_without_data() {
    let h = with_rx(b"abc", true);
    h.bus.fail_next(OpKind::Read, Reg::LSR, BusError::Nak, 1);

    h.port.handle_irq();

    assert_eq!(bulk_reads(&h, Reg::RHR), 0);
    assert_eq!(h.ldisc.flushes(), 1);
}

#[test]
fn error_vector_failure_flushes_without_data() {
    let h = with_rx(b"abc", true);
    h.bus.set_reg(Reg::LSR, 1);
    h.bus
        .fail_next(OpKind::BulkRead, Reg::RX_ERRORS, BusError::Nak, 1);

    h.port.handle_irq();

    assert_eq!(bulk_reads(&h, Reg::RHR), 0);
    assert_eq!(h.ldisc.flushes(), 1);
}

#[test]
fn rejected_byte_truncates_batch() {
    let h = with_rx(b"abcde", false);
    h.ldisc.reject_after(2);

    h.port.handle_irq();

    assert_eq!(h.ldisc.received_bytes(), b"ab");
    assert_eq!(h.ldisc.flushes(), 1);
    let counters = h.port.counters();
    assert_eq!(counters.rx, 5);
    assert_eq!(counters.overrun, 3);
}

#[test]
fn sysrq_byte_is_consumed() {
    let h = with_rx(b"a\x03b", false);
    h.ldisc.set_sysrq(0x03);

    h.port.handle_irq();

    assert_eq!(h.ldisc.received_bytes(), b"ab");
    assert_eq!(h.ldisc.sysrq_hits(), 1);
}

proptest! {
    #[test]
    fn forwarded_plus_overruns_equals_level(
        data in proptest::collection::vec(any::<u8>(), 1..=128),
        accept in 0usize..140,
    ) {
        let h = with_rx(&data, false);
        h.ldisc.reject_after(accept);

        h.port.handle_irq();

        let forwarded = h.ldisc.received().len();
        let counters = h.port.counters();
        prop_assert_eq!(forwarded, accept.min(data.len()));
        prop_assert_eq!(forwarded as u64 + counters.overrun, data.len() as u64);
        prop_assert_eq!(counters.rx, data.len() as u64);
        prop_assert_eq!(h.ldisc.flushes(), 1);
    }
}
