use crate::types::{CheckRun, GitHubRepository, JobStep};

/// Pull request page, used when a check has no detail page of its own.
fn pull_request_url(repository: &GitHubRepository, number: u64) -> Option<String> {
    let base = repository.html_url.as_deref()?;
    Some(format!("{}/pull/{number}", base.trim_end_matches('/')))
}

/// Detail page for a check run.
///
/// Legacy commit statuses have no checks page; those fall back to the pull
/// request itself. `None` when neither is known.
pub fn check_url(check: &CheckRun, repository: &GitHubRepository, number: u64) -> Option<String> {
    check
        .html_url
        .clone()
        .or_else(|| pull_request_url(repository, number))
}

/// Deep link to one step of an Actions job, falling back to the pull request.
pub fn step_url(
    check: &CheckRun,
    step: &JobStep,
    repository: &GitHubRepository,
    number: u64,
) -> Option<String> {
    let job_page = check.html_url.as_deref().or_else(|| {
        check
            .actions_job
            .as_ref()
            .and_then(|job| job.job_html_url.as_deref())
    });
    match job_page {
        Some(page) => Some(format!(
            "{}/#step:{}:1",
            page.trim_end_matches('/'),
            step.number
        )),
        None => pull_request_url(repository, number),
    }
}
