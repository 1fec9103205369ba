//! Debuglet's breakpoint engine
//!
//! This crate provides a breakpoint engine that embeds inside an
//! interpreted-language runtime. An external debugging agent registers
//! breakpoints against compiled code units; the engine intercepts line
//! execution, evaluates an optional side-effect-free condition and reports
//! the hit through a callback, while a leaky-bucket quota bounds the
//! performance tax imposed on the host program.
//!
//! # Overview
//!
//! The engine consists of several key components:
//!
//! - [`Debuglet`]: The engine facade attached to the host runtime
//! - [`CodeUnit`]: The executable representation breakpoints are set against
//! - [`EvalScope`]: Read-only view of the paused frame handed to conditions
//! - [`LeakyBucket`]: Continuous-decay rate limiter for evaluation cost
//! - [`BreakpointEvent`]: What the registered handler receives on a hit
//!
//! # Architecture
//!
//! Line interception is strategy-based and fixed when the engine is built:
//!
//! - [`InterceptMode::CodePatching`]: arms a trap in the executable
//!   representation of the target line; reaching it transfers control to
//!   the engine with near-zero overhead elsewhere
//! - [`InterceptMode::EmulatedTracing`]: piggybacks on the runtime's
//!   per-thread line-trace hook; works on every attached thread but pays a
//!   constant cost per executed line
//!
//! A hit flows through strategy -> registry lookup -> quota check ->
//! guarded condition evaluation -> event dispatch. Faults raised along the
//! way never propagate into the host program; they are converted into
//! events delivered through the same handler channel as a hit.
//!
//! # Example
//!
//! ```rust,ignore
//! use debuglet_engine::{CodeUnit, Debuglet, Frame, InterceptMode};
//!
//! let engine = Debuglet::builder()
//!     .strategy(InterceptMode::CodePatching)
//!     .build();
//!
//! let unit = CodeUnit::new("app.py:main", [10, 11, 14]);
//! let cookie = engine.set_breakpoint(&unit, 11, None, handler)?;
//!
//! // The interpreter loop reports each line it is about to execute.
//! engine.on_line(&unit, 11, &Frame::new());
//!
//! engine.clear_breakpoint(cookie)?;
//! ```

pub mod diag;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod isolation;
pub mod quota;
pub mod strategy;
pub mod unit;

mod registry;
mod thread;

pub use diag::Severity;
pub use engine::{Debuglet, EngineBuilder};
pub use error::DebugError;
pub use events::{BreakpointEvent, BreakpointEventKind, Cookie, EventHandler};
pub use frame::{Frame, FrameSnapshot, Value};
pub use isolation::{ConditionExpr, EvalError, EvalScope};
pub use quota::{LeakyBucket, QuotaConfig};
pub use strategy::InterceptMode;
pub use unit::{CodeUnit, CodeUnitId};

/// Result type for engine operations.
pub type DebugResult<T> = Result<T, DebugError>;
