//! The engine facade embedded into the host runtime.
//!
//! A [`Debuglet`] is built once, with the interception strategy and the
//! quota rate constants fixed before any breakpoint can be registered.
//! The debugging agent talks to the facade (`set_breakpoint`,
//! `clear_breakpoint`, thread attachment); the host interpreter talks to
//! it through a single integration seam, [`Debuglet::on_line`], invoked
//! for each line it is about to execute.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;

use crate::error::DebugError;
use crate::events::{BreakpointEventKind, Cookie, EventHandler};
use crate::frame::Frame;
use crate::isolation::ConditionExpr;
use crate::quota::{LeakyBucket, QuotaConfig};
use crate::registry::Registry;
use crate::strategy::InterceptMode;
use crate::thread;
use crate::unit::CodeUnit;

/// Builder for a [`Debuglet`].
///
/// The interception strategy and quota configuration are fixed at build
/// time; switching strategies after breakpoints exist is unsupported.
#[derive(Debug, Clone, Copy)]
pub struct EngineBuilder {
    strategy: InterceptMode,
    quota: QuotaConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            strategy: InterceptMode::EmulatedTracing,
            quota: QuotaConfig::default(),
        }
    }
}

impl EngineBuilder {
    /// Selects the line-interception strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: InterceptMode) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the quota rate constants.
    #[must_use]
    pub fn quota(mut self, quota: QuotaConfig) -> Self {
        self.quota = quota;
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> Debuglet {
        Debuglet {
            strategy: self.strategy,
            quota: self.quota,
            registry: Registry::default(),
            global_bucket: OnceCell::new(),
            emulator_bucket: OnceCell::new(),
            emulator_exhausted: AtomicBool::new(false),
        }
    }
}

/// The breakpoint engine.
#[derive(Debug)]
pub struct Debuglet {
    strategy: InterceptMode,
    quota: QuotaConfig,
    registry: Registry,
    /// Shared condition/diagnostic budget. Created lazily on first
    /// registration so runtime-configured rate constants are honored.
    global_bucket: OnceCell<LeakyBucket>,
    /// Budget for the emulated tracer's own per-line bookkeeping.
    emulator_bucket: OnceCell<LeakyBucket>,
    /// Once set, emulation has given up for good and the tracer is
    /// quiescent.
    emulator_exhausted: AtomicBool,
}

impl Debuglet {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The interception strategy this engine was built with.
    #[must_use]
    pub fn strategy(&self) -> InterceptMode {
        self.strategy
    }

    /// Sets a breakpoint at `line` of `unit`.
    ///
    /// The breakpoint does not expire after a hit; it stays armed until
    /// [`clear_breakpoint`](Self::clear_breakpoint) is called with the
    /// returned cookie, which must happen exactly once.
    ///
    /// # Errors
    ///
    /// [`DebugError::InvalidArgument`] if `line` maps to no statement in
    /// `unit`.
    pub fn set_breakpoint(
        &self,
        unit: &Arc<CodeUnit>,
        line: u32,
        condition: Option<ConditionExpr>,
        handler: EventHandler,
    ) -> Result<Cookie, DebugError> {
        if !unit.has_source_line(line) {
            return Err(DebugError::InvalidArgument(format!(
                "line {line} maps to no statement in `{}`",
                unit.name()
            )));
        }

        // Forces the buckets into existence before the first hit can race
        // them; deferring to here keeps runtime-configured rate constants
        // honored.
        self.global_bucket();
        self.emulator_bucket();

        let cookie = self.registry.insert(
            unit,
            line,
            condition,
            handler,
            self.quota.condition_cost_micros / 2,
        );
        self.strategy.install(unit, line);

        log::debug!("set breakpoint {cookie} at {}:{line}", unit.name());
        Ok(cookie)
    }

    /// Clears the breakpoint identified by `cookie`.
    ///
    /// Must be called exactly once per successful
    /// [`set_breakpoint`](Self::set_breakpoint). The registry drops its
    /// reference here; a dispatch already in flight keeps its own and the
    /// breakpoint object is released once both are gone.
    ///
    /// # Errors
    ///
    /// [`DebugError::NotFound`] if `cookie` is unknown, including the
    /// second of two clears for the same cookie.
    pub fn clear_breakpoint(&self, cookie: Cookie) -> Result<(), DebugError> {
        let breakpoint = self
            .registry
            .remove(cookie)
            .ok_or(DebugError::NotFound(cookie))?;

        self.strategy.uninstall(&breakpoint.unit, breakpoint.line);
        log::debug!(
            "cleared breakpoint {cookie} at {}:{}",
            breakpoint.unit.name(),
            breakpoint.line
        );
        Ok(())
    }

    /// Returns `true` iff `line` maps to an executable statement in
    /// `unit`.
    #[must_use]
    pub fn has_source_line(&self, unit: &CodeUnit, line: u32) -> bool {
        unit.has_source_line(line)
    }

    /// Attaches the debugger to the calling thread.
    ///
    /// Only needed for native-origin threads, which the runtime is not
    /// aware of; idempotent if the thread is already attached. A no-op
    /// under code-patching, since patched locations trigger regardless of
    /// thread origin.
    pub fn attach_native_thread(&self) {
        if self.strategy == InterceptMode::CodePatching {
            return;
        }
        if thread::attach_current_thread() {
            log::debug!("attached line-trace hook to current thread");
        }
    }

    /// Opts the calling thread out of the debugger. A no-op under
    /// code-patching.
    pub fn disable_debugger_on_current_thread(&self) {
        if self.strategy == InterceptMode::CodePatching {
            return;
        }
        thread::disable_current_thread();
    }

    /// Host-runtime integration seam: the interpreter reports each line
    /// it is about to execute.
    ///
    /// Under code-patching this is the entry reached through a patched
    /// location and fires only for armed lines. Under emulated tracing it
    /// is the per-thread line-trace hook; it fires for every line on an
    /// attached thread and its bookkeeping cost is charged to the
    /// emulator budget.
    pub fn on_line(&self, unit: &Arc<CodeUnit>, line: u32, frame: &Frame) {
        // A line reached while a condition evaluates on this thread must
        // not dispatch and must not double-charge quota.
        if thread::in_evaluation() {
            return;
        }

        match self.strategy {
            InterceptMode::CodePatching => {
                if unit.trap_armed(line) {
                    self.dispatch(unit, line, frame);
                }
            }
            InterceptMode::EmulatedTracing => self.trace_line(unit, line, frame),
        }
    }

    fn trace_line(&self, unit: &Arc<CodeUnit>, line: u32, frame: &Frame) {
        if self.registry.is_empty()
            || self.emulator_exhausted.load(Ordering::Acquire)
            || !thread::is_attached()
            || thread::is_disabled()
        {
            return;
        }

        // Only the lookup is charged to the emulator budget; condition
        // cost has its own buckets.
        let started = Instant::now();
        let hits = self.registry.breakpoints_at(unit.id(), line);
        let within = self.emulator_bucket().charge(started.elapsed());

        if !within {
            self.exhaust_emulator();
            return;
        }

        if !hits.is_empty() {
            let global = self.global_bucket();
            for breakpoint in &hits {
                self.registry.process(breakpoint, frame, global);
            }
        }
    }

    fn dispatch(&self, unit: &Arc<CodeUnit>, line: u32, frame: &Frame) {
        let hits = self.registry.breakpoints_at(unit.id(), line);
        if hits.is_empty() {
            return;
        }

        let global = self.global_bucket();
        for breakpoint in &hits {
            self.registry.process(breakpoint, frame, global);
        }
    }

    /// The emulated tracer exhausted its own budget: give up on emulation
    /// entirely rather than keep taxing every executed line.
    fn exhaust_emulator(&self) {
        if self.emulator_exhausted.swap(true, Ordering::AcqRel) {
            return;
        }

        log::warn!("emulated tracing budget exhausted, disabling all breakpoints");
        for breakpoint in self.registry.all() {
            if breakpoint.disable() {
                breakpoint.emit(BreakpointEventKind::EmulatorQuotaExceeded, None);
            }
        }
    }

    /// Charges diagnostic-logging cost against the shared global budget.
    ///
    /// Dynamic-logging collaborators share the condition budget by
    /// contract; returns `false` once the charge overflows it, at which
    /// point the caller is expected to drop its log statement.
    pub fn charge_diagnostic_cost(&self, cost: Duration) -> bool {
        self.global_bucket().charge(cost)
    }

    fn global_bucket(&self) -> &LeakyBucket {
        self.global_bucket
            .get_or_init(|| LeakyBucket::new(self.quota.condition_cost_micros))
    }

    fn emulator_bucket(&self) -> &LeakyBucket {
        self.emulator_bucket
            .get_or_init(|| LeakyBucket::new(self.quota.emulator_cost_micros))
    }
}
