use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use moka::future::Cache;
use octocrab::Octocrab;

use crate::checks::CheckResolver;
use crate::types::{ActionsJobRef, CheckRun, JobStep};

use super::actions::{self, WorkflowJob, WorkflowRun};
use super::logs;

/// [`CheckResolver`] backed by the GitHub REST API.
pub struct GitHubResolver {
    octocrab: Arc<Octocrab>,
    cache: Cache<String, String>,
    log_excerpt_lines: usize,
}

impl GitHubResolver {
    pub fn new(octocrab: Arc<Octocrab>, cache: Cache<String, String>, log_excerpt_lines: usize) -> Self {
        Self {
            octocrab,
            cache,
            log_excerpt_lines,
        }
    }

    /// Jobs of the latest run of every workflow on `git_ref`, keyed by job id.
    ///
    /// Actions check runs share their id with the job that produced them.
    async fn jobs_by_id(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<IndexMap<u64, (WorkflowRun, WorkflowJob)>> {
        let runs = actions::fetch_workflow_runs_for_branch(&self.octocrab, owner, repo, git_ref)
            .await?;

        let mut jobs = IndexMap::new();
        for run in latest_run_per_workflow(runs) {
            match actions::fetch_run_jobs(&self.octocrab, owner, repo, run.id, Some(&self.cache))
                .await
            {
                Ok(run_jobs) => {
                    for job in run_jobs {
                        jobs.insert(job.id, (run.clone(), job));
                    }
                }
                Err(e) => {
                    tracing::warn!("github: jobs for run {} unavailable: {e:#}", run.id);
                }
            }
        }
        Ok(jobs)
    }

    /// Steps of one job, with log segments when the log can be read.
    async fn job_steps(&self, owner: &str, repo: &str, job: &ActionsJobRef) -> Result<Vec<JobStep>> {
        let mut steps = actions::fetch_job(&self.octocrab, owner, repo, job.job_id)
            .await
            .with_context(|| format!("job {}", job.job_id))?
            .steps;
        steps.sort_by_key(|s| s.number);

        match actions::fetch_job_log(&self.octocrab, &job.logs_url).await {
            Ok(log) => logs::attach_step_logs(&mut steps, &log, self.log_excerpt_lines),
            Err(e) => tracing::debug!("github: log for job {} unavailable: {e:#}", job.job_id),
        }
        Ok(steps)
    }
}

/// Keep the most recent run of each workflow. The API lists runs newest
/// first; `created_at` breaks the tie when it does not.
fn latest_run_per_workflow(runs: Vec<WorkflowRun>) -> Vec<WorkflowRun> {
    let mut latest: IndexMap<u64, WorkflowRun> = IndexMap::new();
    for run in runs {
        match latest.get(&run.workflow_id) {
            Some(existing) if existing.created_at >= run.created_at => {}
            _ => {
                latest.insert(run.workflow_id, run);
            }
        }
    }
    latest.into_values().collect()
}

impl CheckResolver for GitHubResolver {
    async fn resolve_workflow_metadata(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>> {
        let jobs = self.jobs_by_id(owner, repo, git_ref).await?;
        tracing::debug!("github: {} jobs on {git_ref}", jobs.len());

        Ok(checks
            .iter()
            .map(|check| {
                let mut check = check.clone();
                if let Some((run, job)) = jobs.get(&check.id) {
                    check.actions_job = Some(ActionsJobRef {
                        run_id: run.id,
                        job_id: job.id,
                        workflow_name: run.name.clone(),
                        job_html_url: job.html_url.clone(),
                        logs_url: actions::job_logs_route(owner, repo, job.id),
                    });
                }
                check
            })
            .collect())
    }

    async fn resolve_latest_logs(
        &self,
        owner: &str,
        repo: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>> {
        let mut resolved = Vec::with_capacity(checks.len());
        for check in checks {
            let mut check = check.clone();
            if let Some(job) = check.actions_job.as_ref() {
                match self.job_steps(owner, repo, job).await {
                    Ok(steps) => check.action_job_steps = Some(steps),
                    Err(e) => tracing::warn!("github: steps for {} unavailable: {e:#}", check.name),
                }
            }
            resolved.push(check);
        }
        Ok(resolved)
    }
}
