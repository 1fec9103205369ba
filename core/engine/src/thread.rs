//! Per-thread debugger markers.
//!
//! The emulated-tracing strategy only sees threads whose line-trace hook
//! has been installed. Threads that originate inside the runtime are
//! attached when interpreted execution starts on them; native-origin
//! threads are invisible until explicitly attached. A separate marker
//! opts a thread out of tracing entirely, and a third one suppresses
//! re-entrant hits while a condition is being evaluated on the thread.
//!
//! The markers live in one explicit thread-local object rather than
//! free-floating globals.

use std::cell::Cell;

#[derive(Debug)]
struct ThreadMarkers {
    /// Line-trace hook installed for this thread.
    attached: Cell<bool>,
    /// Debugger opted out on this thread.
    disabled: Cell<bool>,
    /// A condition is currently being evaluated on this thread.
    evaluating: Cell<bool>,
}

thread_local! {
    static MARKERS: ThreadMarkers = const {
        ThreadMarkers {
            attached: Cell::new(false),
            disabled: Cell::new(false),
            evaluating: Cell::new(false),
        }
    };
}

/// Installs the trace hook for the calling thread. Returns `false` if the
/// thread was already attached.
pub(crate) fn attach_current_thread() -> bool {
    MARKERS.with(|m| !m.attached.replace(true))
}

pub(crate) fn is_attached() -> bool {
    MARKERS.with(|m| m.attached.get())
}

/// Marks the calling thread as opted out of the debugger.
pub(crate) fn disable_current_thread() {
    MARKERS.with(|m| m.disabled.set(true));
}

pub(crate) fn is_disabled() -> bool {
    MARKERS.with(|m| m.disabled.get())
}

pub(crate) fn in_evaluation() -> bool {
    MARKERS.with(|m| m.evaluating.get())
}

/// Scoped re-entrancy marker held while a condition evaluates on the
/// calling thread. Released on every exit path by `Drop`.
#[derive(Debug)]
pub(crate) struct EvalGuard(());

impl EvalGuard {
    /// Acquires the marker, or returns `None` if the thread is already
    /// inside an evaluation.
    pub(crate) fn enter() -> Option<Self> {
        MARKERS.with(|m| {
            if m.evaluating.replace(true) {
                None
            } else {
                Some(Self(()))
            }
        })
    }
}

impl Drop for EvalGuard {
    fn drop(&mut self) {
        MARKERS.with(|m| m.evaluating.set(false));
    }
}
