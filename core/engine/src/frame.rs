//! Execution-context state visible to conditions and snapshots.

use rustc_hash::FxHashMap;

/// A value in the interpreted program.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Str(String),
}

impl Value {
    /// Truthiness under the host language's rules: `Null`, `false`, `0`
    /// and the empty string are falsy, everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

/// The execution context a line hit occurred in.
///
/// The host interpreter passes the current frame into
/// [`Debuglet::on_line`](crate::engine::Debuglet::on_line); conditions
/// read it through an [`EvalScope`](crate::isolation::EvalScope) and hit
/// snapshots clone out of it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    locals: FxHashMap<String, Value>,
    globals: FxHashMap<String, Value>,
}

impl Frame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a local variable.
    #[must_use]
    pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
        self.locals.insert(name.into(), value);
        self
    }

    /// Builder-style insertion of a global variable.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    /// Sets a local variable.
    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    /// Looks up a local variable.
    #[must_use]
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Looks up a global variable.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Captures the frame for delivery inside a hit event.
    pub(crate) fn snapshot(&self, unit_name: &str, line: u32) -> FrameSnapshot {
        let mut locals: Vec<(String, Value)> = self
            .locals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        locals.sort_by(|a, b| a.0.cmp(&b.0));

        FrameSnapshot {
            unit: unit_name.to_owned(),
            line,
            locals,
        }
    }
}

/// Immutable capture of the frame state at a hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// Name of the code unit the hit occurred in.
    pub unit: String,
    /// Source line of the hit.
    pub line: u32,
    /// Local variables at the hit, sorted by name.
    pub locals: Vec<(String, Value)>,
}
