//! `LogEntry` and `LogLevel`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub service: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(rename = "fromStderr")]
    pub from_stderr: bool,
}

impl LogEntry {
    pub fn new(service: impl Into<String>, message: impl Into<String>, from_stderr: bool) -> Self {
        let message = message.into();
        let level = infer_level(&message, from_stderr);
        Self {
            service: service.into(),
            message,
            timestamp: Utc::now(),
            level,
            from_stderr,
        }
    }
}

/// Level inference: keyword heuristics on the message, with `from_stderr`
/// forcing at least `error`.
fn infer_level(message: &str, from_stderr: bool) -> LogLevel {
    let lower = message.to_lowercase();
    let heuristic = if ["error", "fail", "exception", "fatal", "panic"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warn
    } else if lower.contains("debug") || lower.contains("trace") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    if from_stderr && heuristic != LogLevel::Error {
        LogLevel::Error
    } else {
        heuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_error_from_keyword() {
        let entry = LogEntry::new("web", "Unhandled exception in handler", false);
        assert_eq!(entry.level, LogLevel::Error);
    }

    #[test]
    fn infers_warn_from_keyword() {
        let entry = LogEntry::new("web", "Warning: deprecated flag", false);
        assert_eq!(entry.level, LogLevel::Warn);
    }

    #[test]
    fn defaults_to_info() {
        let entry = LogEntry::new("web", "Listening on port 3000", false);
        assert_eq!(entry.level, LogLevel::Info);
    }

    #[test]
    fn stderr_forces_at_least_error() {
        let entry = LogEntry::new("web", "connection refused", true);
        assert_eq!(entry.level, LogLevel::Error);
    }
}
