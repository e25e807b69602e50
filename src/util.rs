use chrono::{DateTime, Utc};

/// Format the elapsed duration between two optional timestamps.
///
/// Returns e.g. `"12s"`, `"2m 05s"`, or an empty string when either timestamp
/// is `None`.
pub(crate) fn format_duration(
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
) -> String {
    let (Some(start), Some(end)) = (started_at, completed_at) else {
        return String::new();
    };
    let secs = (end - start).num_seconds().max(0).cast_unsigned();
    if secs < 60 {
        format!("{secs}s")
    } else {
        let m = secs / 60;
        let s = secs % 60;
        format!("{m}m {s:02}s")
    }
}

/// Keep the first `max_chars` characters of `text`, appending `…` when
/// anything was cut.
pub(crate) fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_owned(),
        Some((cut, _)) => format!("{}…", &text[..cut]),
    }
}

/// Abbreviated commit sha, as GitHub shows it.
pub(crate) fn short_sha(sha: &str) -> &str {
    sha.get(..9).unwrap_or(sha)
}
