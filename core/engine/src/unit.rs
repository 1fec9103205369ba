//! Compiled code units.
//!
//! A [`CodeUnit`] is the executable representation of a function or module
//! body against which breakpoints are set. The engine does not prescribe
//! how source lines map to executable offsets; the contract is only that
//! the set of statement lines is queryable, and that the representation
//! can be patched at a statement line and restored exactly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a code unit, valid for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeUnitId(u64);

/// Executable representation of a function or module body.
#[derive(Debug)]
pub struct CodeUnit {
    id: CodeUnitId,
    name: String,
    /// Sorted, deduplicated statement lines.
    lines: Vec<u32>,
    /// Armed trap points, reference-counted so that multiple breakpoints
    /// on the same line share a single patch point.
    traps: Mutex<FxHashMap<u32, usize>>,
}

impl CodeUnit {
    /// Creates a code unit with the given statement-line set.
    ///
    /// Lines are sorted and deduplicated; the order they are supplied in
    /// does not matter.
    pub fn new(name: impl Into<String>, lines: impl IntoIterator<Item = u32>) -> Arc<Self> {
        let mut lines: Vec<u32> = lines.into_iter().collect();
        lines.sort_unstable();
        lines.dedup();

        Arc::new(Self {
            id: CodeUnitId(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            lines,
            traps: Mutex::new(FxHashMap::default()),
        })
    }

    /// The unit's process-unique identifier.
    #[must_use]
    pub fn id(&self) -> CodeUnitId {
        self.id
    }

    /// Human-readable name, e.g. `"app.py:main"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statement lines of this unit, sorted ascending.
    #[must_use]
    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    /// Returns `true` iff `line` maps to an executable statement in this
    /// unit. Lines before the first and after the last statement are both
    /// `false`.
    #[must_use]
    pub fn has_source_line(&self, line: u32) -> bool {
        self.lines.binary_search(&line).is_ok()
    }

    /// Arms a trap at `line`, patching the executable representation so
    /// that reaching the line transfers control to the engine. Returns
    /// `true` if the line was newly patched, `false` if an existing patch
    /// point gained a reference.
    pub(crate) fn arm_trap(&self, line: u32) -> bool {
        let mut traps = self.traps.lock().unwrap();
        let refs = traps.entry(line).or_insert(0);
        *refs += 1;
        *refs == 1
    }

    /// Releases one reference to the trap at `line`, restoring the
    /// original representation once the last reference is gone. Returns
    /// `true` if the line was fully unpatched.
    pub(crate) fn disarm_trap(&self, line: u32) -> bool {
        let mut traps = self.traps.lock().unwrap();
        match traps.get_mut(&line) {
            Some(refs) if *refs > 1 => {
                *refs -= 1;
                false
            }
            Some(_) => {
                traps.remove(&line);
                true
            }
            None => {
                debug_assert!(false, "disarming a line that was never armed");
                false
            }
        }
    }

    /// Whether `line` currently carries a trap.
    pub(crate) fn trap_armed(&self, line: u32) -> bool {
        self.traps.lock().unwrap().contains_key(&line)
    }
}
