//! Logging sink used by the dispatch loop.
//!
//! [`BotLogger`] is the narrow capability the loop logs through: info and
//! error, each in a plain (space-joined values) and a formatted flavour.
//! Structured instrumentation elsewhere in Courier goes straight to `tracing`;
//! this sink exists so callers can capture or redirect the loop's own
//! lifecycle and diagnostic lines.
//!
//! A sink is normally injected into the runner. For callers that do not
//! inject one, a process-wide default [`LoggerHandle`] is available through
//! [`logger`] and replaceable with [`set_logger`].

use std::fmt::{self, Display, Write as _};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use crate::error::{LoggerError, LoggerResult};

/// The methods Courier needs to log data.
pub trait BotLogger: Send + Sync {
    /// Logs the values separated by spaces at info level.
    fn info(&self, args: &[&dyn Display]);

    /// Logs a formatted line at info level.
    fn info_fmt(&self, args: fmt::Arguments<'_>);

    /// Logs the values separated by spaces at error level.
    fn error(&self, args: &[&dyn Display]);

    /// Logs a formatted line at error level.
    fn error_fmt(&self, args: fmt::Arguments<'_>);
}

fn join_args(args: &[&dyn Display]) -> String {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{arg}");
    }
    line
}

// =============================================================================
// Implementations
// =============================================================================

/// Forwards every line to `tracing` under the `courier` target.
///
/// With the runtime's default subscriber this produces timestamped lines on
/// standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl BotLogger for TracingLogger {
    fn info(&self, args: &[&dyn Display]) {
        info!(target: "courier", "{}", join_args(args));
    }

    fn info_fmt(&self, args: fmt::Arguments<'_>) {
        info!(target: "courier", "{args}");
    }

    fn error(&self, args: &[&dyn Display]) {
        error!(target: "courier", "{}", join_args(args));
    }

    fn error_fmt(&self, args: fmt::Arguments<'_>) {
        error!(target: "courier", "{args}");
    }
}

/// Severity of a captured line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Keeps every line in memory. Useful for asserting on loop output.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the captured lines.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    /// Returns `true` if any captured line at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }

    fn push(&self, level: LogLevel, line: String) {
        self.lines.lock().push((level, line));
    }
}

impl BotLogger for MemoryLogger {
    fn info(&self, args: &[&dyn Display]) {
        self.push(LogLevel::Info, join_args(args));
    }

    fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.push(LogLevel::Info, args.to_string());
    }

    fn error(&self, args: &[&dyn Display]) {
        self.push(LogLevel::Error, join_args(args));
    }

    fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.push(LogLevel::Error, args.to_string());
    }
}

// =============================================================================
// Replaceable handle
// =============================================================================

/// A shareable slot holding the active logger.
///
/// Clones share the same slot, so replacing the logger through one clone is
/// seen by all of them.
#[derive(Clone)]
pub struct LoggerHandle {
    inner: Arc<RwLock<Arc<dyn BotLogger>>>,
}

impl LoggerHandle {
    pub fn new(logger: Arc<dyn BotLogger>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(logger)),
        }
    }

    /// Installs a new logger.
    ///
    /// Passing `None` is rejected and the current logger stays active.
    pub fn replace(&self, logger: Option<Arc<dyn BotLogger>>) -> LoggerResult<()> {
        let logger = logger.ok_or(LoggerError::Missing)?;
        *self.inner.write() = logger;
        Ok(())
    }

    /// Returns the currently active logger.
    pub fn current(&self) -> Arc<dyn BotLogger> {
        Arc::clone(&*self.inner.read())
    }
}

impl Default for LoggerHandle {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

impl BotLogger for LoggerHandle {
    fn info(&self, args: &[&dyn Display]) {
        self.current().info(args);
    }

    fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.current().info_fmt(args);
    }

    fn error(&self, args: &[&dyn Display]) {
        self.current().error(args);
    }

    fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.current().error_fmt(args);
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle").finish_non_exhaustive()
    }
}

static GLOBAL_LOGGER: LazyLock<LoggerHandle> = LazyLock::new(LoggerHandle::default);

/// Returns the process-wide default logger handle.
pub fn logger() -> LoggerHandle {
    GLOBAL_LOGGER.clone()
}

/// Replaces the process-wide default logger.
///
/// Returns [`LoggerError::Missing`] and leaves the current logger in place if
/// `logger` is `None`.
pub fn set_logger(logger: Option<Arc<dyn BotLogger>>) -> LoggerResult<()> {
    GLOBAL_LOGGER.replace(logger)
}
