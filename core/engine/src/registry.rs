//! Cookie-keyed table of active breakpoints and hit processing.
//!
//! The registry owns the breakpoint objects behind `Arc`s: registration
//! and clearing may race hit processing on another thread, so an in-flight
//! dispatch keeps its own reference and a racing clear can never
//! invalidate the object mid-dispatch. A breakpoint cleared between hit
//! detection and dispatch is treated as a lookup miss, not a fault.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::events::{BreakpointEvent, BreakpointEventKind, Cookie, EventHandler};
use crate::frame::{Frame, FrameSnapshot};
use crate::isolation::{self, ConditionExpr, Outcome};
use crate::quota::LeakyBucket;
use crate::thread;
use crate::unit::{CodeUnit, CodeUnitId};

/// A registered breakpoint.
///
/// Shared between the registry tables and any in-flight hit processing;
/// destroyed only once both release it.
pub(crate) struct Breakpoint {
    pub(crate) cookie: Cookie,
    pub(crate) unit: Arc<CodeUnit>,
    pub(crate) line: u32,
    condition: Option<ConditionExpr>,
    handler: EventHandler,
    /// Cleared on quota disable and on clear; a disabled breakpoint never
    /// fires again.
    enabled: AtomicBool,
    /// Per-breakpoint evaluation budget: half the global rate.
    bucket: LeakyBucket,
}

impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breakpoint")
            .field("cookie", &self.cookie)
            .field("unit", &self.unit.name())
            .field("line", &self.line)
            .field("conditional", &self.condition.is_some())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Breakpoint {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Permanently disables the breakpoint. Returns `true` only for the
    /// caller that actually flipped the flag, so disable events are
    /// emitted exactly once.
    pub(crate) fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn emit(&self, kind: BreakpointEventKind, snapshot: Option<FrameSnapshot>) {
        (self.handler)(&BreakpointEvent {
            kind,
            cookie: self.cookie,
            snapshot,
        });
    }

    fn emit_hit(&self, frame: &Frame) {
        self.emit(
            BreakpointEventKind::Hit,
            Some(frame.snapshot(self.unit.name(), self.line)),
        );
    }
}

/// Table of active breakpoints, keyed by cookie and by (unit, line).
#[derive(Debug, Default)]
pub(crate) struct Registry {
    by_cookie: DashMap<Cookie, Arc<Breakpoint>, FxBuildHasher>,
    /// Breakpoints per location, in registration order.
    by_location: DashMap<(CodeUnitId, u32), Vec<Arc<Breakpoint>>, FxBuildHasher>,
    next_cookie: AtomicU64,
}

impl Registry {
    /// Inserts a new breakpoint and returns its cookie.
    pub(crate) fn insert(
        &self,
        unit: &Arc<CodeUnit>,
        line: u32,
        condition: Option<ConditionExpr>,
        handler: EventHandler,
        per_breakpoint_capacity: u64,
    ) -> Cookie {
        let cookie = Cookie(self.next_cookie.fetch_add(1, Ordering::Relaxed) + 1);
        let breakpoint = Arc::new(Breakpoint {
            cookie,
            unit: Arc::clone(unit),
            line,
            condition,
            handler,
            enabled: AtomicBool::new(true),
            bucket: LeakyBucket::new(per_breakpoint_capacity),
        });

        self.by_location
            .entry((unit.id(), line))
            .or_default()
            .push(Arc::clone(&breakpoint));
        self.by_cookie.insert(cookie, breakpoint);
        cookie
    }

    /// Removes the breakpoint for `cookie`, dropping the registry's
    /// references. Returns the breakpoint so the caller can uninstall
    /// interception; `None` if the cookie is unknown.
    pub(crate) fn remove(&self, cookie: Cookie) -> Option<Arc<Breakpoint>> {
        let (_, breakpoint) = self.by_cookie.remove(&cookie)?;

        // An in-flight dispatch that already holds the Arc sees the clear
        // as a lookup miss through this flag.
        breakpoint.enabled.store(false, Ordering::Release);

        let key = (breakpoint.unit.id(), breakpoint.line);
        if let Some(mut entry) = self.by_location.get_mut(&key) {
            entry.retain(|bp| bp.cookie != cookie);
        }
        self.by_location.remove_if(&key, |_, list| list.is_empty());

        Some(breakpoint)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_cookie.is_empty()
    }

    /// Active breakpoints at (`unit_id`, `line`) in registration order.
    ///
    /// The list is cloned out of the table so no shard lock is held while
    /// handlers run; a handler is free to register or clear breakpoints.
    pub(crate) fn breakpoints_at(&self, unit_id: CodeUnitId, line: u32) -> Vec<Arc<Breakpoint>> {
        self.by_location
            .get(&(unit_id, line))
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Every registered breakpoint, for whole-engine disables.
    pub(crate) fn all(&self) -> Vec<Arc<Breakpoint>> {
        self.by_cookie
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Processes a single breakpoint hit: quota check, guarded condition
    /// evaluation and event dispatch. Never propagates a fault.
    pub(crate) fn process(
        &self,
        breakpoint: &Arc<Breakpoint>,
        frame: &Frame,
        global: &LeakyBucket,
    ) {
        if !breakpoint.is_enabled() || !self.by_cookie.contains_key(&breakpoint.cookie) {
            return;
        }

        let Some(condition) = &breakpoint.condition else {
            breakpoint.emit_hit(frame);
            return;
        };

        let (outcome, cost) = {
            // Nested hits reached while the condition runs are suppressed
            // through this marker and charge no quota.
            let Some(_guard) = thread::EvalGuard::enter() else {
                return;
            };
            isolation::evaluate(condition, frame)
        };

        // Cost is charged to both buckets regardless of outcome.
        let within_own = breakpoint.bucket.charge(cost);
        let within_global = global.charge(cost);

        if !within_own {
            if breakpoint.disable() {
                log::warn!(
                    "breakpoint {} at {}:{} disabled: condition exceeded its own budget",
                    breakpoint.cookie,
                    breakpoint.unit.name(),
                    breakpoint.line
                );
                breakpoint.emit(BreakpointEventKind::BreakpointConditionQuotaExceeded, None);
            }
            return;
        }

        if !within_global {
            if breakpoint.disable() {
                log::warn!(
                    "breakpoint {} at {}:{} disabled: global condition budget exhausted",
                    breakpoint.cookie,
                    breakpoint.unit.name(),
                    breakpoint.line
                );
                breakpoint.emit(BreakpointEventKind::GlobalConditionQuotaExceeded, None);
            }
            return;
        }

        match outcome {
            Outcome::Value(value) => {
                if value.is_truthy() {
                    breakpoint.emit_hit(frame);
                }
            }
            Outcome::Mutation => {
                breakpoint.emit(BreakpointEventKind::ConditionExpressionMutable, None);
            }
            Outcome::Fault(message) => {
                log::debug!(
                    "condition of breakpoint {} failed: {message}",
                    breakpoint.cookie
                );
                breakpoint.emit(BreakpointEventKind::Error, None);
            }
        }
    }
}
