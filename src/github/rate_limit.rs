//! Rate-limit detection for GitHub REST responses.
//!
//! GitHub signals rate limits through HTTP 403 with "API rate limit exceeded"
//! in the body, or HTTP 429 for the secondary limit. Retrying is left to the
//! user.

/// Check whether an error message indicates a GitHub rate limit.
pub(crate) fn is_rate_limited(error: &anyhow::Error) -> bool {
    let msg = format!("{error:#}").to_lowercase();
    msg.contains("rate limit") || msg.contains("status code: 429")
}

/// Message to surface for a failed remote call: a short rate-limit notice,
/// or the full error chain otherwise.
pub(crate) fn user_message(error: &anyhow::Error) -> String {
    if !is_rate_limited(error) {
        return format!("{error:#}");
    }
    if format!("{error:#}")
        .to_lowercase()
        .contains("secondary rate limit")
    {
        "Secondary rate limit hit, wait a moment then run the command again".to_owned()
    } else {
        "API rate limit exceeded, try again later".to_owned()
    }
}
