// Per-line log parsing.
// Strips a leading timestamp and assigns a severity by keyword.

use std::sync::LazyLock;

use regex::Regex;

use super::{LogEntry, LogLevel};

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z").expect("valid regex")
});

/// Parse one raw log line. Lines without a timestamp are kept as-is.
pub fn parse_line(line: &str) -> LogEntry {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);

    let (timestamp, message) = match TIMESTAMP.find(line) {
        Some(found) => {
            let rest = &line[found.end()..];
            (
                Some(found.as_str().to_string()),
                rest.strip_prefix(' ').unwrap_or(rest),
            )
        }
        None => (None, line),
    };

    LogEntry {
        timestamp,
        level: classify(message),
        message: message.to_string(),
    }
}

/// Case-insensitive keyword match: "error" wins over "warn", anything else is info.
pub fn classify(message: &str) -> LogLevel {
    let lower = message.to_lowercase();
    if lower.contains("error") {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warning
    } else {
        LogLevel::Info
    }
}
