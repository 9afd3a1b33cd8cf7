//! Engine log stream.
//!
//! Every log line is written to stderr and fanned out to SSE clients at
//! `GET /api/logs`, so a renderer can show import and save notices.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::broadcast::Broadcaster;

/// Log level for renderer display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for grouped messages
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console form: indentation, level prefix, message.
    pub fn render(&self) -> String {
        format!(
            "{}{} {}",
            "   ".repeat(self.indent as usize),
            self.level.prefix(),
            self.message
        )
    }
}

/// Global log stream
pub static LOGS: Lazy<Broadcaster<LogEntry>> = Lazy::new(Broadcaster::new);

/// Print an entry and broadcast it to subscribers
pub fn log(entry: LogEntry) {
    eprintln!("{}", entry.render());
    LOGS.send(entry);
}

pub fn log_info(msg: impl Into<String>) {
    log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_indent() {
        let entry = LogEntry::new(LogLevel::Success, "saved").with_indent(1);
        assert_eq!(entry.render(), "      ✓ saved");
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::new(LogLevel::Warning, "careful");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["message"], "careful");
        assert_eq!(json["indent"], 0);
    }

    #[test]
    fn test_log_reaches_subscribers() {
        let mut rx = LOGS.subscribe();
        log_info("import started");

        // Other tests may log concurrently; scan for ours.
        let mut found = false;
        while let Ok(entry) = rx.try_recv() {
            if entry.message == "import started" {
                found = true;
            }
        }
        assert!(found);
    }
}
