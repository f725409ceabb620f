//! Log entries handed to the downstream log pipeline
//!
//! Collectors do not write these through `tracing`: they are data, not
//! diagnostics. Each entry carries the operation tag the pipeline routes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Operation tags
pub const OP_SCHEMA_DETECTION: &str = "schema_detection";
pub const OP_TABLE_DETECTION: &str = "table_detection";
pub const OP_CREATE_STATEMENT: &str = "create_statement";
pub const OP_EXPLAIN_PLAN_OUTPUT: &str = "explain_plan_output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single leveled, operation-tagged entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub op: String,
    pub line: String,
}

/// Build an entry whose line is prefixed with the level in logfmt style
pub fn build_log_entry(level: LogLevel, op: &str, line: impl AsRef<str>) -> LogEntry {
    LogEntry {
        timestamp: Utc::now(),
        level,
        op: op.to_string(),
        line: format!(r#"level="{}" {}"#, level, line.as_ref()),
    }
}

/// Sending half of the log entry channel
#[derive(Clone, Debug)]
pub struct EntryHandler {
    sender: mpsc::Sender<LogEntry>,
}

impl EntryHandler {
    pub fn new(sender: mpsc::Sender<LogEntry>) -> Self {
        Self { sender }
    }

    /// Create a bounded channel and return the handler with its receiver
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LogEntry>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }

    /// Send an entry, waiting for channel capacity.
    ///
    /// A closed receiver is reported and otherwise ignored: losing log entries
    /// must never stop a collector.
    pub async fn send(&self, entry: LogEntry) {
        if let Err(e) = self.sender.send(entry).await {
            tracing::warn!(op = %e.0.op, "Log entry receiver closed, dropping entry");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
