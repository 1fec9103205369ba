//! Line-interception strategies.
//!
//! The engine can intercept line execution in two ways. Both notify the
//! registry through the identical hit contract, so everything past the
//! interception point is strategy-agnostic. The strategy is selected once
//! when the engine is built and is immutable afterwards; switching after
//! breakpoints exist is unsupported.

use crate::unit::CodeUnit;

/// How line execution is intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptMode {
    /// Rewrites the executable representation at the target line so that
    /// reaching it transfers control directly to the engine. Overhead is
    /// independent of how many breakpoints exist elsewhere, and patched
    /// locations trigger regardless of thread origin.
    CodePatching,
    /// Piggybacks on the runtime's per-thread line-trace hook. Works
    /// uniformly across all attached threads without mutating executable
    /// state, but pays a constant cost per executed line.
    EmulatedTracing,
}

impl InterceptMode {
    /// Activates interception for a breakpoint at (`unit`, `line`).
    ///
    /// Under code-patching this arms the shared, reference-counted trap
    /// point; under emulated tracing the per-thread hook already covers
    /// every line, so there is nothing to install per unit.
    pub(crate) fn install(self, unit: &CodeUnit, line: u32) {
        if self == Self::CodePatching && unit.arm_trap(line) {
            log::debug!("patched {}:{line}", unit.name());
        }
    }

    /// Deactivates interception installed by [`install`](Self::install).
    /// The original representation is restored exactly once the last
    /// breakpoint on the line is gone.
    pub(crate) fn uninstall(self, unit: &CodeUnit, line: u32) {
        if self == Self::CodePatching && unit.disarm_trap(line) {
            log::debug!("unpatched {}:{line}", unit.name());
        }
    }
}
