//! Isolation guard for condition evaluation.
//!
//! A breakpoint condition must be side-effect free. Conditions do not get
//! the raw [`Frame`]; they evaluate against an [`EvalScope`] that exposes
//! reads, rejects every write and disallows unsafe builtin calls outside a
//! small safelist. Any attempt trips a mutation flag on the scope, so a
//! condition that swallows the error is still caught after the fact.
//!
//! Evaluation cost is measured here as wall-clock time and reported to the
//! caller regardless of outcome, so the quota enforcer can charge it.

use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::frame::{Frame, Value};

/// Builtins a condition is allowed to call. Everything else is treated as
/// a potential state mutation.
const SAFE_BUILTINS: &[&str] = &["len", "abs", "str"];

/// Faults raised while evaluating a condition.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The condition attempted to write program state.
    #[error("attempted to mutate `{0}` during condition evaluation")]
    MutationAttempt(String),

    /// The condition invoked a builtin outside the safelist.
    #[error("call to unsafe builtin `{0}` during condition evaluation")]
    UnsafeCall(String),

    /// Any other fault, e.g. a type error inside the guard expression.
    #[error("condition evaluation failed: {0}")]
    Fault(String),
}

/// Executable guard expression attached to a breakpoint.
///
/// Held by shared ownership so the registry and in-flight hit processing
/// can both outlive a concurrent clear.
pub type ConditionExpr = Arc<dyn Fn(&EvalScope<'_>) -> Result<Value, EvalError> + Send + Sync>;

/// Read-only view of a [`Frame`] handed to a condition.
#[derive(Debug)]
pub struct EvalScope<'f> {
    frame: &'f Frame,
    mutated: Cell<bool>,
}

impl<'f> EvalScope<'f> {
    pub(crate) fn new(frame: &'f Frame) -> Self {
        Self {
            frame,
            mutated: Cell::new(false),
        }
    }

    /// Reads a local variable of the paused frame.
    #[must_use]
    pub fn local(&self, name: &str) -> Option<Value> {
        self.frame.local(name).cloned()
    }

    /// Reads a global variable.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        self.frame.global(name).cloned()
    }

    /// Writes are always rejected during condition evaluation.
    pub fn set_local(&self, name: &str, _value: Value) -> Result<(), EvalError> {
        self.mutated.set(true);
        Err(EvalError::MutationAttempt(name.to_owned()))
    }

    /// Writes are always rejected during condition evaluation.
    pub fn set_global(&self, name: &str, _value: Value) -> Result<(), EvalError> {
        self.mutated.set(true);
        Err(EvalError::MutationAttempt(name.to_owned()))
    }

    /// Invokes a builtin. Only the safelisted, known side-effect-free
    /// builtins are allowed; anything else counts as a mutation attempt.
    pub fn call_builtin(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        if !SAFE_BUILTINS.contains(&name) {
            self.mutated.set(true);
            return Err(EvalError::UnsafeCall(name.to_owned()));
        }

        match (name, args) {
            ("len", [Value::Str(s)]) => Ok(Value::Int(s.len() as i64)),
            ("abs", [Value::Int(i)]) => Ok(Value::Int(i.abs())),
            ("str", [v]) => Ok(Value::Str(match v {
                Value::Null => "null".to_owned(),
                Value::Bool(b) => b.to_string(),
                Value::Int(i) => i.to_string(),
                Value::Str(s) => s.clone(),
            })),
            _ => Err(EvalError::Fault(format!("bad arguments to `{name}`"))),
        }
    }

    pub(crate) fn mutated(&self) -> bool {
        self.mutated.get()
    }
}

/// Outcome of one guarded evaluation.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The condition produced a value; truthiness decides the hit.
    Value(Value),
    /// A state mutation was attempted and evaluation was aborted.
    Mutation,
    /// The condition raised a fault unrelated to mutation.
    Fault(String),
}

/// Evaluates `condition` against `frame` under the isolation guard,
/// returning the outcome and the wall-clock cost of the evaluation.
pub(crate) fn evaluate(condition: &ConditionExpr, frame: &Frame) -> (Outcome, Duration) {
    let started = Instant::now();
    let scope = EvalScope::new(frame);
    let result = condition(&scope);
    let cost = started.elapsed();

    let outcome = if scope.mutated() {
        Outcome::Mutation
    } else {
        match result {
            Ok(value) => Outcome::Value(value),
            Err(EvalError::MutationAttempt(_) | EvalError::UnsafeCall(_)) => Outcome::Mutation,
            Err(EvalError::Fault(message)) => Outcome::Fault(message),
        }
    };

    (outcome, cost)
}
