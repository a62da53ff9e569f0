//! The logging collaborator the compiler reports progress and soft-failures through.
//!
//! Kept as a narrow trait (rather than a direct dependency on the `log` crate
//! throughout the compiler) so callers that don't care can pass [`NullLog`], and tests
//! can assert on captured messages without a global logger.

/// Severity of a logged message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Verbose,
    Warning,
}

/// A sink for compiler diagnostics. Logging is best-effort and must never affect the
/// computation.
pub trait Log {
    fn log(&self, severity: Severity, message: &str);
}

/// A `Log` that discards every message. Useful for tests and for callers with no
/// logging infrastructure.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLog;

impl Log for NullLog {
    fn log(&self, _severity: Severity, _message: &str) {}
}

/// A `Log` that forwards to the `log` crate, so a host application wires up its own
/// subscriber (`env_logger`, `tracing-log`, ...) exactly as with any other `log`-based
/// library.
///
/// # Examples
///
/// ```no_run
/// env_logger::init();
/// let log = mnasolve::StandardLog;
/// # let _ = log;
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardLog;

impl Log for StandardLog {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{message}"),
            Severity::Verbose => log::debug!("{message}"),
            Severity::Warning => log::warn!("{message}"),
        }
    }
}
