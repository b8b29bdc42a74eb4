// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared fixtures for the port tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use super::Port;
use crate::bus::MockBus;
use crate::config::PortConfig;
use crate::ldisc::MockLdisc;
use crate::work::ManualExecutor;

pub type TestPort = Port<MockBus, MockLdisc>;

/// Port on a mock bus whose deferred work runs when the test says so.
pub struct Harness {
    pub port: TestPort,
    pub bus: MockBus,
    pub ldisc: Arc<MockLdisc>,
    pub executor: Arc<ManualExecutor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PortConfig::new(0))
    }

    pub fn with_config(config: PortConfig) -> Self {
        let bus = MockBus::new();
        let ldisc = Arc::new(MockLdisc::new());
        let executor = ManualExecutor::new();
        let port = Port::attach(bus.clone(), Arc::clone(&ldisc), config, executor.clone())
            .expect("attach");
        Self {
            port,
            bus,
            ldisc,
            executor,
        }
    }

    /// Attached, started, and with an empty transaction log.
    pub fn started() -> Self {
        let harness = Self::new();
        harness.port.start().expect("start");
        harness.bus.clear_log();
        harness
    }

    pub fn run_work(&self) -> usize {
        self.executor.run_pending()
    }
}

/// A captured log event.
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub message: String,
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn core::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

/// Run `f` with a subscriber that records every event.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<Captured>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap().clone();
    (result, events)
}

/// Captured events at `level` whose message contains `needle`.
pub fn count_matching(events: &[Captured], level: Level, needle: &str) -> usize {
    events
        .iter()
        .filter(|event| event.level == level && event.message.contains(needle))
        .count()
}
