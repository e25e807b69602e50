use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use octocrab::Octocrab;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::types::{
    CheckRun, CheckStatus, GitHubRepository, JobStep, PullRequestRef, parse_conclusion,
    parse_status,
};

// ---------------------------------------------------------------------------
// Domain types for Actions runs and jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct WorkflowJob {
    pub id: u64,
    pub run_id: u64,
    pub name: String,
    pub html_url: Option<String>,
    pub steps: Vec<JobStep>,
}

// ---------------------------------------------------------------------------
// Raw API response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawWorkflowRunsResponse {
    workflow_runs: Vec<RawWorkflowRun>,
}

#[derive(Deserialize)]
struct RawWorkflowRun {
    id: u64,
    #[serde(default)]
    workflow_id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawJobsResponse {
    jobs: Vec<RawJob>,
}

#[derive(Deserialize)]
struct RawJob {
    id: u64,
    #[serde(default)]
    run_id: u64,
    name: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Deserialize)]
struct RawStep {
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    number: u32,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawCheckRunsResponse {
    check_runs: Vec<RawCheckRun>,
}

#[derive(Deserialize)]
struct RawCheckRun {
    id: u64,
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    check_suite: Option<RawId>,
    #[serde(default)]
    app: Option<RawApp>,
    #[serde(default)]
    output: Option<RawOutput>,
}

#[derive(Deserialize)]
struct RawId {
    id: u64,
}

#[derive(Deserialize)]
struct RawApp {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawOutput {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    #[serde(default)]
    draft: bool,
    head: RawBranch,
    base: RawBranch,
}

#[derive(Deserialize)]
struct RawBranch {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
    #[serde(default)]
    repo: Option<RawRepo>,
}

#[derive(Deserialize)]
struct RawRepo {
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct RawCommitResponse {
    commit: RawCommit,
}

#[derive(Deserialize)]
struct RawCommit {
    message: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn step_into_domain(s: RawStep) -> JobStep {
    JobStep {
        name: s.name,
        number: s.number,
        status: s.status.as_deref().map_or(CheckStatus::Unknown, parse_status),
        conclusion: s.conclusion.as_deref().map(parse_conclusion),
        started_at: s.started_at,
        completed_at: s.completed_at,
        log: None,
    }
}

fn job_into_domain(j: RawJob) -> WorkflowJob {
    WorkflowJob {
        id: j.id,
        run_id: j.run_id,
        name: j.name,
        html_url: j.html_url,
        steps: j.steps.into_iter().map(step_into_domain).collect(),
    }
}

fn check_run_into_domain(raw: RawCheckRun) -> CheckRun {
    let output_summary = raw.output.and_then(|o| {
        o.summary
            .filter(|s| !s.is_empty())
            .or(o.title.filter(|t| !t.is_empty()))
    });
    CheckRun {
        id: raw.id,
        name: raw.name,
        status: raw
            .status
            .as_deref()
            .map_or(CheckStatus::Unknown, parse_status),
        conclusion: raw.conclusion.as_deref().map(parse_conclusion),
        html_url: raw.html_url,
        check_suite_id: raw.check_suite.map(|s| s.id),
        app_name: raw.app.and_then(|a| a.name),
        output_summary,
        actions_job: None,
        action_job_steps: None,
    }
}

/// GET `route` as JSON, going through `cache` when one is given.
async fn get_json_cached<T: DeserializeOwned>(
    octocrab: &Arc<Octocrab>,
    route: String,
    params: Option<&HashMap<&str, String>>,
    cache: Option<&Cache<String, String>>,
) -> Result<T> {
    let key = match params {
        Some(p) => {
            let mut pairs: Vec<_> = p.iter().map(|(k, v)| format!("{k}={v}")).collect();
            pairs.sort();
            format!("{route}?{}", pairs.join("&"))
        }
        None => route.clone(),
    };

    if let Some(cache) = cache
        && let Some(hit) = cache.get(&key).await
    {
        tracing::debug!("github: cache hit {key}");
        return serde_json::from_str(&hit).context("decoding cached response");
    }

    let value: JsonValue = octocrab
        .get(route, params)
        .await
        .with_context(|| format!("GET {key}"))?;
    if let Some(cache) = cache {
        cache.insert(key, value.to_string()).await;
    }
    serde_json::from_value(value).context("decoding response")
}

// ---------------------------------------------------------------------------
// Workflow runs and jobs
// ---------------------------------------------------------------------------

/// Pull-request workflow runs for `branch`, newest first.
pub async fn fetch_workflow_runs_for_branch(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Result<Vec<WorkflowRun>> {
    let mut params: HashMap<&str, String> = HashMap::new();
    params.insert("branch", branch.to_owned());
    params.insert("event", "pull_request".to_owned());
    params.insert("per_page", "100".to_owned());

    let route = format!("/repos/{owner}/{repo}/actions/runs");
    let response: RawWorkflowRunsResponse = get_json_cached(octocrab, route, Some(&params), None)
        .await
        .context("fetching workflow runs")?;

    Ok(response
        .workflow_runs
        .into_iter()
        .map(|r| WorkflowRun {
            id: r.id,
            workflow_id: r.workflow_id,
            name: r.name.unwrap_or_default(),
            created_at: r.created_at,
        })
        .collect())
}

/// Fetch the jobs for a specific workflow run.
pub async fn fetch_run_jobs(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    run_id: u64,
    cache: Option<&Cache<String, String>>,
) -> Result<Vec<WorkflowJob>> {
    let mut params: HashMap<&str, String> = HashMap::new();
    params.insert("per_page", "100".to_owned());

    let route = format!("/repos/{owner}/{repo}/actions/runs/{run_id}/jobs");
    let response: RawJobsResponse = get_json_cached(octocrab, route, Some(&params), cache)
        .await
        .context("fetching run jobs")?;

    Ok(response.jobs.into_iter().map(job_into_domain).collect())
}

/// Fetch a single job, including its steps.
pub async fn fetch_job(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    job_id: u64,
) -> Result<WorkflowJob> {
    let route = format!("/repos/{owner}/{repo}/actions/jobs/{job_id}");
    let raw: RawJob = get_json_cached(octocrab, route, None, None)
        .await
        .context("fetching job")?;
    Ok(job_into_domain(raw))
}

/// API route of a job's plain-text log.
pub fn job_logs_route(owner: &str, repo: &str, job_id: u64) -> String {
    format!("/repos/{owner}/{repo}/actions/jobs/{job_id}/logs")
}

/// Download a job log as text. GitHub answers with a redirect to blob
/// storage, which octocrab follows.
pub async fn fetch_job_log(octocrab: &Arc<Octocrab>, logs_route: &str) -> Result<String> {
    let response = octocrab
        ._get(logs_route)
        .await
        .context("requesting job log")?;
    if response.status() == http::StatusCode::GONE {
        bail!("job log has expired");
    }
    let response = octocrab::map_github_error(response)
        .await
        .context("fetching job log")?;
    octocrab
        .body_to_string(response)
        .await
        .context("reading job log")
}

// ---------------------------------------------------------------------------
// Pull request and check runs (initial set for the dialog)
// ---------------------------------------------------------------------------

/// Fetch a pull request and the repository's web URL from its base.
pub async fn fetch_pull_request(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    number: u64,
) -> Result<(PullRequestRef, Option<String>)> {
    let route = format!("/repos/{owner}/{repo}/pulls/{number}");
    let raw: RawPullRequest = get_json_cached(octocrab, route, None, None)
        .await
        .context("fetching pull request")?;
    let html_url = raw.base.repo.and_then(|r| r.html_url);
    Ok((
        PullRequestRef {
            number: raw.number,
            title: raw.title,
            draft: raw.draft,
            head_ref: raw.head.git_ref,
            head_sha: raw.head.sha,
        },
        html_url,
    ))
}

/// Full commit message of `sha`.
pub async fn fetch_commit_message(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    sha: &str,
) -> Result<String> {
    let route = format!("/repos/{owner}/{repo}/commits/{sha}");
    let raw: RawCommitResponse = get_json_cached(octocrab, route, None, None)
        .await
        .context("fetching commit")?;
    Ok(raw.commit.message)
}

/// Check runs reported for a commit.
pub async fn fetch_check_runs(
    octocrab: &Arc<Octocrab>,
    repository: &GitHubRepository,
    sha: &str,
    cache: Option<&Cache<String, String>>,
) -> Result<Vec<CheckRun>> {
    let mut params: HashMap<&str, String> = HashMap::new();
    params.insert("per_page", "100".to_owned());
    params.insert("filter", "latest".to_owned());

    let route = format!(
        "/repos/{}/{}/commits/{sha}/check-runs",
        repository.owner, repository.name
    );
    let response: RawCheckRunsResponse = get_json_cached(octocrab, route, Some(&params), cache)
        .await
        .context("fetching check runs")?;

    Ok(response
        .check_runs
        .into_iter()
        .map(check_run_into_domain)
        .collect())
}

// ---------------------------------------------------------------------------
// Re-run
// ---------------------------------------------------------------------------

/// Re-request a check suite, which re-runs all of its checks.
pub async fn rerequest_check_suite(
    octocrab: &Arc<Octocrab>,
    owner: &str,
    repo: &str,
    check_suite_id: u64,
) -> Result<()> {
    let route = format!("/repos/{owner}/{repo}/check-suites/{check_suite_id}/rerequest");
    // 201 with an empty body: only the status matters.
    let response = octocrab
        ._post(route, None::<&()>)
        .await
        .context("re-requesting check suite")?;
    octocrab::map_github_error(response)
        .await
        .with_context(|| format!("re-requesting check suite {check_suite_id}"))?;
    Ok(())
}
