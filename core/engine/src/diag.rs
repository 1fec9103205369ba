//! Diagnostic logging bridge.
//!
//! Lets the interpreted side of the agent emit records through the
//! process-wide `log` facade, tagged with the originating interpreted
//! source location. This is a collaborator convenience, not part of the
//! engine's correctness contract; dynamic-logging cost accounting goes
//! through [`Debuglet::charge_diagnostic_cost`].
//!
//! [`Debuglet::charge_diagnostic_cost`]: crate::engine::Debuglet::charge_diagnostic_cost

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational.
    Info,
    /// Something unexpected but recoverable.
    Warning,
    /// A real problem.
    Error,
}

/// Emits a diagnostic record tagged with the interpreted source location
/// it originates from. Only the file base name is kept, not the full
/// path.
pub fn log_message(severity: Severity, file: &str, line: u32, message: &str) {
    let file = file.rsplit('/').next().unwrap_or(file);
    let level = match severity {
        Severity::Info => log::Level::Info,
        Severity::Warning => log::Level::Warn,
        Severity::Error => log::Level::Error,
    };
    log::log!(target: "debuglet", level, "[{file}:{line}] {message}");
}
