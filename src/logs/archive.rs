// Log archive parsing.
// Selects a job's step files from the run log zip and reconciles them with step metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::Result;
use crate::github::Step;

use super::{StepLog, format_duration, line::parse_line};

static STEP_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)_([\w\s\-\.]+)\.txt$").expect("valid regex"));

/// Parse a run attempt's log archive into the step logs of `job_name`.
///
/// Steps present in `steps` but missing from the archive get an empty log;
/// steps without a status are dropped. Output is sorted by step number, then title.
/// Only a corrupt archive is an error; unreadable entries are skipped.
pub fn parse_archive(
    data: &[u8],
    steps: &BTreeMap<u64, Step>,
    job_name: &str,
) -> Result<Vec<StepLog>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut step_logs = Vec::new();

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                warn!(index, error = %e, "skipping unreadable archive entry");
                continue;
            }
        };

        let name = file.name().to_string();
        if !name.contains(job_name) || !name.ends_with(".txt") {
            continue;
        }
        let Some((number, title)) = parse_entry_name(&name) else {
            debug!(entry = %name, "log file name does not match step pattern");
            continue;
        };

        let mut raw = Vec::new();
        if let Err(e) = file.read_to_end(&mut raw) {
            warn!(entry = %name, error = %e, "skipping unreadable log entry");
            continue;
        }

        let logs = String::from_utf8_lossy(&raw).lines().map(parse_line).collect();
        let meta = steps.get(&number);

        step_logs.push(StepLog {
            number,
            title,
            status: meta.map(step_status).unwrap_or_default(),
            duration: meta.map(step_duration).unwrap_or_default(),
            logs,
            collapsed: false,
        });
    }

    // Skipped steps have no log file
    let present: BTreeSet<u64> = step_logs.iter().map(|log| log.number).collect();
    for step in steps.values().filter(|step| !present.contains(&step.number)) {
        step_logs.push(StepLog {
            number: step.number,
            title: step.name.clone(),
            status: step_status(step),
            duration: step_duration(step),
            logs: Vec::new(),
            collapsed: false,
        });
    }

    step_logs.retain(|log| !log.status.is_empty());
    step_logs.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.title.cmp(&b.title)));

    Ok(step_logs)
}

/// Status string shown for a step: its conclusion, or empty while unconcluded.
pub fn step_status(step: &Step) -> String {
    step.conclusion
        .as_ref()
        .map(|conclusion| conclusion.as_str().to_string())
        .unwrap_or_default()
}

/// Formatted run time of a step, empty unless both ends are known.
pub fn step_duration(step: &Step) -> String {
    match (step.started_at, step.completed_at) {
        (Some(started), Some(completed)) => format_duration(completed - started),
        _ => String::new(),
    }
}

/// Split `<n>_<title>.txt` into its step number and a space-separated title.
fn parse_entry_name(name: &str) -> Option<(u64, String)> {
    let captures = STEP_FILE.captures(name)?;
    let number = captures[1].parse().ok()?;
    let title = captures[2].replace('_', " ");
    Some((number, title))
}
