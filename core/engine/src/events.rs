//! Breakpoint events delivered to the registered handler.
//!
//! Every outcome of hit processing travels through the same channel: a
//! plain hit, a fault in the condition, a mutation attempt, or a quota
//! disable. Registration-time failures never appear here; they surface as
//! [`DebugError`](crate::error::DebugError) instead.

use std::fmt;
use std::sync::Arc;

use crate::frame::FrameSnapshot;

/// Opaque integer handle identifying a registered breakpoint.
///
/// Returned by `set_breakpoint` and required to clear the breakpoint
/// later. Cookies are unique for the lifetime of the process and are
/// never reused, even after a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cookie(pub(crate) u64);

impl Cookie {
    /// Raw integer value of the cookie.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happened at a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointEventKind {
    /// The breakpoint was reached and its condition (if any) held.
    Hit,
    /// The condition raised a fault unrelated to mutation or quota. The
    /// breakpoint stays armed for future hits.
    Error,
    /// The emulated tracer exhausted its own overhead budget and gave up
    /// on emulation; the breakpoint will not fire again.
    EmulatorQuotaExceeded,
    /// This breakpoint's evaluation crossed the shared global condition
    /// budget and was permanently disabled.
    GlobalConditionQuotaExceeded,
    /// This breakpoint's cumulative condition cost crossed its own budget
    /// and was permanently disabled.
    BreakpointConditionQuotaExceeded,
    /// The condition attempted to mutate program state; no hit was
    /// dispatched for this occurrence. The breakpoint stays armed.
    ConditionExpressionMutable,
}

/// Event delivered to a breakpoint's handler.
#[derive(Debug, Clone)]
pub struct BreakpointEvent {
    /// What happened.
    pub kind: BreakpointEventKind,
    /// The breakpoint this event belongs to.
    pub cookie: Cookie,
    /// Frame state at the hit. Present only for [`BreakpointEventKind::Hit`].
    pub snapshot: Option<FrameSnapshot>,
}

/// Callback invoked on every breakpoint event.
///
/// Shared ownership lets both the registry and an in-flight dispatch hold
/// the handler across a racing clear.
pub type EventHandler = Arc<dyn Fn(&BreakpointEvent) + Send + Sync>;
