// Log extraction module.
// Turns a run attempt's raw log archive plus step metadata into ordered, displayable step logs.

pub mod archive;
pub mod line;

use serde::{Deserialize, Serialize};

pub use archive::{parse_archive, step_duration, step_status};
pub use line::{classify, parse_line};

/// Severity assigned to a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One line of a step's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Leading RFC 3339 timestamp, when the line carried one.
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

/// A job step reconciled with its extracted log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    /// 1-based step number.
    pub number: u64,
    pub title: String,
    /// Step conclusion as reported by the API (`success`, `failure`, ...).
    pub status: String,
    pub duration: String,
    pub logs: Vec<LogEntry>,
    /// Whether the UI shows this step folded.
    pub collapsed: bool,
}

/// Render an elapsed time like `1h2m3s`, `2m5s`, `1.5s` or `500ms`.
pub fn format_duration(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    if millis > 0 && millis < 1000 {
        return format!("{}ms", millis);
    }
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let secs = (millis / 1000) % 60;
    let frac = millis % 1000;

    let seconds = if frac == 0 {
        format!("{}s", secs)
    } else {
        let frac = format!("{:03}", frac);
        format!("{}.{}s", secs, frac.trim_end_matches('0'))
    };

    if hours > 0 {
        format!("{}h{}m{}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}", minutes, seconds)
    } else {
        seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::zero()), "0s");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(Duration::milliseconds(1500)), "1.5s");
        assert_eq!(format_duration(Duration::milliseconds(61_250)), "1m1.25s");
    }

    #[test]
    fn test_sub_second_duration_in_millis() {
        assert_eq!(format_duration(Duration::milliseconds(500)), "500ms");
        assert_eq!(format_duration(Duration::milliseconds(1)), "1ms");
        assert_eq!(format_duration(Duration::milliseconds(1000)), "1s");
    }

    #[test]
    fn test_negative_duration_is_zero() {
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"warning\"");
    }
}
