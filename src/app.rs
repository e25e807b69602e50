use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexSet;

use crate::actions::{browser, local};
use crate::checks::{ChecksDialog, Host};
use crate::config::types::AppConfig;
use crate::engine::{EngineHandle, Event, Request};
use crate::git;
use crate::types::{CheckRun, GitHubRepository, PullRequestRef};

/// The command-line application seen from the checks dialog.
///
/// Remote commands go through the engine thread and report back on
/// `events_tx`; local commands run `git`/`gh` in the active repository.
pub struct CliHost {
    engine: EngineHandle,
    events_tx: Sender<Event>,
    open_browser: bool,
    /// Web host of the pull request, e.g. `github.com`.
    web_host: String,
    repo_paths: HashMap<String, PathBuf>,
    cwd: Option<PathBuf>,
    active_repo: RefCell<Option<PathBuf>>,
    dismissed: Cell<bool>,
}

impl CliHost {
    pub fn new(
        engine: EngineHandle,
        events_tx: Sender<Event>,
        config: &AppConfig,
        web_host: impl Into<String>,
        cwd: Option<PathBuf>,
    ) -> Self {
        Self {
            engine,
            events_tx,
            open_browser: config.defaults.open_browser,
            web_host: web_host.into(),
            repo_paths: config.repo_paths.clone(),
            cwd,
            active_repo: RefCell::new(None),
            dismissed: Cell::new(false),
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed.get()
    }

    /// Work tree the dialog switched to, if any.
    pub fn active_repository(&self) -> Option<PathBuf> {
        self.active_repo.borrow().clone()
    }
}

/// Distinct check suites of `checks`, in first-seen order.
pub fn check_suite_ids(checks: &[CheckRun]) -> Vec<u64> {
    checks
        .iter()
        .filter_map(|c| c.check_suite_id)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Wait for the engine's next reply.
pub fn recv_event(rx: &Receiver<Event>, timeout: Duration) -> Result<Event> {
    match rx.recv_timeout(timeout) {
        Ok(event) => Ok(event),
        Err(RecvTimeoutError::Timeout) => bail!("timed out waiting for GitHub"),
        Err(RecvTimeoutError::Disconnected) => bail!("engine stopped unexpectedly"),
    }
}

/// Re-run the dialog's check suites and wait for the engine's verdict.
/// Nothing is awaited when no check belongs to a suite.
pub fn rerun(
    dialog: &ChecksDialog<CliHost>,
    events_rx: &Receiver<Event>,
    timeout: Duration,
) -> Result<String> {
    let has_suites = !check_suite_ids(&dialog.snapshot().checks).is_empty();
    if !has_suites || !dialog.rerun_jobs() {
        return Ok("No check suites to re-run".to_owned());
    }
    match recv_event(events_rx, timeout)? {
        Event::MutationOk { description } => Ok(description),
        Event::MutationError {
            description,
            message,
        } => Err(anyhow!("{description}: {message}")),
        Event::RevisionFetched { .. } | Event::FetchError { .. } => {
            Err(anyhow!("unexpected engine reply"))
        }
    }
}

impl Host for CliHost {
    fn open_external(&self, url: &str) {
        if !self.open_browser {
            println!("{url}");
            return;
        }
        if let Err(e) = browser::open_in_browser(url) {
            tracing::warn!("app: cannot open browser: {e:#}");
            println!("{url}");
        }
    }

    fn request_rerun(&self, repository: &GitHubRepository, checks: &[CheckRun]) {
        let ids = check_suite_ids(checks);
        if ids.is_empty() {
            tracing::debug!("app: no check suite to re-run in {}", repository.full_name());
            return;
        }
        self.engine.send(Request::RerequestCheckSuites {
            repository: repository.clone(),
            check_suite_ids: ids,
            reply_tx: self.events_tx.clone(),
        });
    }

    async fn switch_active_repository(&self, repository: &GitHubRepository) -> Result<()> {
        let full_name = repository.full_name();
        let top_level = match self.cwd.as_deref() {
            Some(cwd) if !git::is_other_repository(Some(cwd), &full_name) => cwd.to_path_buf(),
            _ => {
                let path = local::repo_path_for(&full_name, &self.repo_paths)?;
                local::switch_to_repository(&full_name, path, &self.web_host).await?
            }
        };
        tracing::debug!("app: active repository {}", top_level.display());
        *self.active_repo.borrow_mut() = Some(top_level);
        Ok(())
    }

    async fn checkout_change(
        &self,
        repository: &GitHubRepository,
        pull_request: &PullRequestRef,
    ) -> Result<()> {
        let path = self
            .active_repository()
            .with_context(|| format!("{} is not the active repository", repository.full_name()))?;
        let message =
            local::checkout_pull_request(&path, pull_request.number, &pull_request.head_ref)
                .await?;
        println!("{message}");
        Ok(())
    }

    fn dismiss(&self) {
        tracing::debug!("app: dialog dismissed");
        self.dismissed.set(true);
    }
}
