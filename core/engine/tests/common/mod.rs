//! Shared helpers for the engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use debuglet_engine::{
    BreakpointEvent, BreakpointEventKind, CodeUnit, Debuglet, EventHandler, Frame, InterceptMode,
    QuotaConfig,
};

/// Collects every event delivered to a breakpoint handler.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<BreakpointEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> EventHandler {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &BreakpointEvent| {
            events.lock().unwrap().push(event.clone());
        })
    }

    pub fn events(&self) -> Vec<BreakpointEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<BreakpointEventKind> {
        self.events().iter().map(|event| event.kind).collect()
    }

    pub fn hit_count(&self) -> usize {
        self.kinds()
            .iter()
            .filter(|kind| **kind == BreakpointEventKind::Hit)
            .count()
    }
}

/// Engine with default quotas, attached to the calling thread.
pub fn engine(mode: InterceptMode) -> Arc<Debuglet> {
    let engine = detached_engine(mode);
    engine.attach_native_thread();
    engine
}

/// Engine with custom quotas, attached to the calling thread.
pub fn engine_with_quota(mode: InterceptMode, quota: QuotaConfig) -> Arc<Debuglet> {
    let _ = simple_logger::SimpleLogger::new().init();
    let engine = Arc::new(Debuglet::builder().strategy(mode).quota(quota).build());
    engine.attach_native_thread();
    engine
}

/// Engine whose calling thread is deliberately left unattached.
pub fn detached_engine(mode: InterceptMode) -> Arc<Debuglet> {
    let _ = simple_logger::SimpleLogger::new().init();
    Arc::new(Debuglet::builder().strategy(mode).build())
}

/// Executes one pass over every statement line of `unit`, the way the
/// host interpreter loop reports lines to the engine.
pub fn run_pass(engine: &Debuglet, unit: &Arc<CodeUnit>, frame: &Frame) {
    for &line in unit.lines() {
        engine.on_line(unit, line, frame);
    }
}
