//! Split a GitHub Actions job log into per-step segments.
//!
//! Every log line starts with an RFC 3339 timestamp
//! (`2024-05-01T10:00:03.1234567Z message`). Step boundaries are not marked
//! in the log, so a line is attributed to the last step (by number) that had
//! already started at that second. Step timestamps from the jobs API only
//! have second precision, hence the truncation of line timestamps.

use chrono::{DateTime, SubsecRound, Utc};

use crate::types::{JobStep, StepLogSegment};

/// A log line split into its timestamp and message.
fn split_line(line: &str) -> (Option<DateTime<Utc>>, &str) {
    let line = line.trim_start_matches('\u{feff}');
    match line.split_once(' ') {
        Some((stamp, rest)) => match DateTime::parse_from_rfc3339(stamp) {
            Ok(ts) => (Some(ts.with_timezone(&Utc)), rest),
            Err(_) => (None, line),
        },
        None => match DateTime::parse_from_rfc3339(line) {
            Ok(ts) => (Some(ts.with_timezone(&Utc)), ""),
            Err(_) => (None, line),
        },
    }
}

/// Index into `steps` of the step running at `ts`.
fn step_at(steps: &[JobStep], ts: DateTime<Utc>) -> Option<usize> {
    let ts = ts.trunc_subsecs(0);
    steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.started_at.is_some_and(|start| start <= ts))
        .max_by_key(|(_, s)| s.number)
        .map(|(i, _)| i)
}

#[derive(Default)]
struct Collecting<'a> {
    first_line: usize,
    lines: Vec<&'a str>,
}

/// Attach a [`StepLogSegment`] to every step that produced output.
///
/// Failed steps keep the last `excerpt_lines` lines of their output. The log
/// text itself is not retained.
pub fn attach_step_logs(steps: &mut [JobStep], log: &str, excerpt_lines: usize) {
    let mut segments: Vec<Option<Collecting<'_>>> = steps.iter().map(|_| None).collect();
    let mut current: Option<usize> = None;

    for (idx, raw) in log.lines().enumerate() {
        let (ts, message) = split_line(raw);
        if let Some(ts) = ts {
            current = step_at(steps, ts).or(current);
        }
        let Some(step_idx) = current else {
            continue;
        };
        let segment = segments[step_idx].get_or_insert_with(|| Collecting {
            first_line: idx + 1,
            lines: Vec::new(),
        });
        segment.lines.push(message);
    }

    for (step, segment) in steps.iter_mut().zip(segments) {
        let Some(segment) = segment else {
            continue;
        };
        let excerpt = if step.is_failure() {
            let visible: Vec<&str> = segment
                .lines
                .iter()
                .copied()
                .filter(|l| *l != "##[endgroup]")
                .collect();
            let skip = visible.len().saturating_sub(excerpt_lines);
            visible[skip..].iter().map(|l| (*l).to_owned()).collect()
        } else {
            Vec::new()
        };
        step.log = Some(StepLogSegment {
            first_line: segment.first_line,
            line_count: segment.lines.len(),
            excerpt,
        });
    }
}
