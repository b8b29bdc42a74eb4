// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the deferred control worker.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::testing::Harness;
use super::*;

use proptest::prelude::*;

use crate::bus::{BusError, BusOp, OpKind};
use crate::regs::Msr;

fn rts_harness() -> Harness {
    let h = Harness::with_config(PortConfig::new(0).with_flow_caps(FlowCaps::RTS));
    h.port.start().unwrap();
    h.bus.clear_log();
    h
}

#[test]
fn stop_requests_coalesce_into_one_batch() {
    let h = Harness::started();
    h.port.request_stop_tx();
    h.port.request_stop_rx();
    h.port.request_stop_tx();
    assert_eq!(h.executor.queued(), 1);

    assert_eq!(h.run_work(), 1);
    assert_eq!(
        h.bus.writes(),
        vec![
            BusOp::UpdateBits {
                reg: Reg::IER,
                mask: (Irq::RHR | Irq::THR).bits(),
                value: 0,
            },
            BusOp::UpdateBits {
                reg: Reg::CFG0,
                mask: Cfg0::RUN_MASK.bits(),
                value: Cfg0::FIFO_RESET.bits(),
            },
        ]
    );
    assert!(h.port.core.control.is_empty());
}

#[test]
fn stop_rx_leaves_transmitter_alone() {
    let h = Harness::started();
    h.port.request_stop_rx();
    h.run_work();
    assert_eq!(
        h.bus.writes(),
        vec![
            BusOp::UpdateBits {
                reg: Reg::IER,
                mask: Irq::RHR.bits(),
                value: 0,
            },
            BusOp::UpdateBits {
                reg: Reg::CFG0,
                mask: (Cfg0::CRX | Cfg0::RXEN).bits(),
                value: Cfg0::CRX.bits(),
            },
        ]
    );
}

#[test]
fn empty_run_has_no_side_effects() {
    let h = Harness::started();
    h.port.core.control_work.schedule();
    h.run_work();
    assert!(h.bus.log().is_empty());
}

#[test]
fn rts_assert_wins_over_deassert() {
    let h = rts_harness();
    h.port.request_rts(false);
    h.port.request_rts(true);
    h.run_work();
    assert_eq!(
        h.bus.writes(),
        vec![BusOp::UpdateBits {
            reg: Reg::MSR,
            mask: Msr::RTS.bits(),
            value: Msr::RTS.bits(),
        }]
    );
}

#[test]
fn rts_deassert_clears_line() {
    let h = rts_harness();
    h.bus.set_reg(Reg::MSR, Msr::RTS.bits());
    h.port.request_rts(false);
    h.run_work();
    assert_eq!(h.bus.reg(Reg::MSR), 0);
}

#[test]
fn rts_request_needs_wired_line() {
    let h = Harness::started();
    h.port.request_rts(true);
    assert_eq!(h.executor.queued(), 0);
    assert!(h.port.core.control.is_empty());
}

#[test]
fn failed_write_still_clears_intents() {
    let h = rts_harness();
    h.bus
        .fail_next(OpKind::UpdateBits, Reg::IER, BusError::Nak, 1);
    h.port.request_stop_tx();
    h.port.request_rts(true);
    h.run_work();

    let log = h.bus.log();
    assert!(log.iter().any(|op| op.reg() == Reg::CFG0));
    assert!(log.iter().any(|op| op.reg() == Reg::MSR));
    assert!(h.port.core.control.is_empty());

    // Not retried.
    h.bus.clear_log();
    h.run_work();
    assert!(h.bus.log().is_empty());
}

#[test]
fn intents_recorded_after_run_get_their_own_run() {
    let h = Harness::started();
    h.port.request_stop_rx();
    h.run_work();
    h.bus.clear_log();

    h.port.request_stop_tx();
    assert_eq!(h.executor.queued(), 1);
    h.run_work();
    assert_eq!(
        h.bus.writes()[0],
        BusOp::UpdateBits {
            reg: Reg::IER,
            mask: Irq::THR.bits(),
            value: 0,
        }
    );
}

#[derive(Debug, Clone, Copy)]
enum Request {
    StopTx,
    StopRx,
    StartTx,
}

fn request() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::StopTx),
        Just(Request::StopRx),
        Just(Request::StartTx),
    ]
}

proptest! {
    #[test]
    fn burst_applies_union_once(requests in proptest::collection::vec(request(), 0..32)) {
        let h = Harness::started();
        let mut ier = Irq::empty();
        let mut cfg0 = Cfg0::empty();
        for request in &requests {
            match request {
                Request::StopTx => {
                    h.port.request_stop_tx();
                    ier |= Irq::THR;
                    cfg0 |= Cfg0::CTX | Cfg0::TXEN;
                }
                Request::StopRx => {
                    h.port.request_stop_rx();
                    ier |= Irq::RHR;
                    cfg0 |= Cfg0::CRX | Cfg0::RXEN;
                }
                Request::StartTx => h.port.request_start_tx(),
            }
        }
        prop_assert!(h.executor.queued() <= 2);

        h.run_work();

        let expected = if ier.is_empty() {
            Vec::new()
        } else {
            vec![
                BusOp::UpdateBits { reg: Reg::IER, mask: ier.bits(), value: 0 },
                BusOp::UpdateBits {
                    reg: Reg::CFG0,
                    mask: cfg0.bits(),
                    value: (cfg0 & Cfg0::FIFO_RESET).bits(),
                },
            ]
        };
        prop_assert_eq!(h.bus.writes(), expected);
        prop_assert!(h.port.core.control.is_empty());
    }
}
