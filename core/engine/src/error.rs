//! Error taxonomy for engine operations.
//!
//! Only registration-time failures surface through `Result`; faults raised
//! while processing a hit are converted into [`BreakpointEvent`]s so they
//! can never disrupt the host program's control flow.
//!
//! [`BreakpointEvent`]: crate::events::BreakpointEvent

use thiserror::Error;

use crate::events::Cookie;

/// Errors surfaced synchronously to the debugging agent.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DebugError {
    /// Malformed registration input, such as a line that maps to no
    /// statement in the target code unit.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The cookie does not identify a live breakpoint. Also raised on a
    /// second clear of the same cookie, which is a caller contract
    /// violation rather than an idempotent no-op.
    #[error("breakpoint cookie {0} not found")]
    NotFound(Cookie),

    /// A condition attempted to mutate program state during evaluation.
    #[error("condition expression attempted to mutate program state")]
    ConditionExpressionMutable,

    /// A quota bucket was exhausted.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Opaque internal fault.
    #[error("internal error: {0}")]
    Internal(String),
}
