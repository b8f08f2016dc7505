//! Per-run log buffer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::log::{level, LogLine};

/// Accumulates the log lines of one task or command execution.
///
/// Clones share the same buffer so the driver and the task body can both
/// append to the run's log. Separate executions must construct separate
/// loggers with [`EvalLogger::new`].
#[derive(Debug, Clone, Default)]
pub struct EvalLogger {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl EvalLogger {
    /// Create a logger with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at its own level.
    pub fn log(&self, line: LogLine) {
        let line = Self::prepare(line);
        Self::mirror(&line);
        self.buffer().push(line);
    }

    /// Append a line at error level, whatever level it was built with.
    pub fn error(&self, mut line: LogLine) {
        line.level = level::ERROR;
        self.log(line);
    }

    /// Append a warning. Warnings are stored at info level.
    pub fn warn(&self, mut line: LogLine) {
        line.level = level::INFO;
        let line = Self::prepare(line);
        warn!(category = ?line.category, "{}", line.message);
        self.buffer().push(line);
    }

    /// Snapshot of every line appended so far, in emission order.
    pub fn get_logs(&self) -> Vec<LogLine> {
        self.buffer().clone()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffered line.
    pub fn clear(&self) {
        self.buffer().clear();
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<LogLine>> {
        // A panic while holding the lock cannot leave a Vec half-pushed.
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prepare(mut line: LogLine) -> LogLine {
        if line.timestamp.is_none() {
            line.timestamp = Some(Utc::now().to_rfc3339());
        }
        if !line.auxiliary.is_empty() {
            let parsed: BTreeMap<_, _> = line
                .auxiliary
                .iter()
                .map(|(k, v)| (k.clone(), v.parsed()))
                .collect();
            line.parsed_auxiliary = Some(parsed);
        }
        line
    }

    fn mirror(line: &LogLine) {
        match line.level {
            level::ERROR => error!(category = ?line.category, "{}", line.message),
            level::INFO => info!(category = ?line.category, "{}", line.message),
            _ => debug!(category = ?line.category, "{}", line.message),
        }
    }
}
