use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;

use crate::types::{Account, CheckRun, CheckRunId, JobStep, Revision, account_for};

use super::cancel::CancellationGuard;
use super::host::Host;
use super::resolver::{CheckResolver, ResolveError, ResolverFactory, align_to_ids};
use super::state::{ChecksSnapshot, LoadState};
use super::urls;

/// Default per-phase timeout for the resolver pipeline.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Which step of [`ChecksDialog::switch_to_pull_request`] failed.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("switching repository: {0:#}")]
    SwitchRepository(#[source] anyhow::Error),
    #[error("checking out pull request: {0:#}")]
    Checkout(#[source] anyhow::Error),
}

/// Failed-checks dialog for one revision.
///
/// Owns the [`ChecksSnapshot`] and is its only writer. Background loading
/// ([`Self::load_check_runs`]), selection, re-run and the context switch all
/// take `&self`, so they can be interleaved on a single-threaded runtime.
/// Every commit consults the [`CancellationGuard`]; once it is raised the
/// snapshot no longer changes.
pub struct ChecksDialog<H: Host> {
    revision: Revision,
    should_change_repository: bool,
    host: H,
    state: watch::Sender<ChecksSnapshot>,
    guard: CancellationGuard,
    resolve_timeout: Duration,
}

impl<H: Host> ChecksDialog<H> {
    pub fn new(revision: Revision, checks: Vec<CheckRun>, host: H, guard: CancellationGuard) -> Self {
        Self {
            revision,
            should_change_repository: false,
            host,
            state: watch::Sender::new(ChecksSnapshot::new(checks)),
            guard,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// The confirm action also has to switch the active repository.
    pub fn with_repository_change(mut self, should_change_repository: bool) -> Self {
        self.should_change_repository = should_change_repository;
        self
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn should_change_repository(&self) -> bool {
        self.should_change_repository
    }

    pub fn snapshot(&self) -> ChecksSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChecksSnapshot> {
        self.state.subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_cancelled()
    }

    /// Raise the cancellation guard. Pending loads finish but commit nothing.
    pub fn teardown(&self) {
        self.guard.cancel();
    }

    /// Apply `update` unless the dialog has been torn down.
    fn commit(&self, what: &str, update: impl FnOnce(&mut ChecksSnapshot)) -> bool {
        if self.guard.is_cancelled() {
            tracing::debug!("checks: dropping {what}, dialog torn down");
            return false;
        }
        self.state.send_modify(update);
        true
    }

    // -----------------------------------------------------------------------
    // Loading pipeline
    // -----------------------------------------------------------------------

    /// Enrich the check set in two phases: workflow metadata, then job steps
    /// and logs. Each phase result is committed as a whole and clears its
    /// load flag. A missing account clears both flags and leaves the set
    /// untouched; a failed or timed-out phase keeps the previous set.
    pub async fn load_check_runs<F: ResolverFactory>(&self, accounts: &[Account], factory: &F) {
        let repository = &self.revision.repository;
        let Some(account) = account_for(accounts, &repository.endpoint) else {
            tracing::debug!(
                "checks: no account for {}, skipping check details",
                repository.endpoint
            );
            self.commit("load state", |s| s.load = LoadState::done());
            return;
        };

        let resolver = match factory.resolver_for(account) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("checks: cannot build API client: {e:#}");
                self.commit("load state", |s| s.load = LoadState::done());
                return;
            }
        };

        self.load_with(&resolver).await;
    }

    async fn load_with<R: CheckResolver>(&self, resolver: &R) {
        let owner = self.revision.repository.owner.as_str();
        let repo = self.revision.repository.name.as_str();
        let head_ref = self.revision.pull_request.head_ref.as_str();

        let initial = Arc::clone(&self.state.borrow().checks);
        let with_jobs = self
            .run_phase(
                "workflow metadata",
                &initial,
                resolver.resolve_workflow_metadata(owner, repo, head_ref, &initial),
            )
            .await;

        let committed = self.commit("workflow metadata", |s| {
            s.checks = Arc::clone(&with_jobs);
            s.load = s.load.finish_workflows();
        });
        if !committed {
            return;
        }

        let with_logs = self
            .run_phase(
                "job logs",
                &with_jobs,
                resolver.resolve_latest_logs(owner, repo, &with_jobs),
            )
            .await;

        self.commit("job logs", |s| {
            s.checks = with_logs;
            s.load = s.load.finish_logs();
        });
    }

    /// Await one phase under the timeout. Any failure yields `input` back.
    async fn run_phase(
        &self,
        phase: &str,
        input: &Arc<Vec<CheckRun>>,
        resolve: impl Future<Output = Result<Vec<CheckRun>>>,
    ) -> Arc<Vec<CheckRun>> {
        let outcome = match tokio::time::timeout(self.resolve_timeout, resolve).await {
            Ok(Ok(checks)) => align_to_ids(input, checks),
            Ok(Err(e)) => Err(ResolveError::Remote(e)),
            Err(_) => Err(ResolveError::Timeout(self.resolve_timeout)),
        };
        match outcome {
            Ok(checks) => {
                tracing::debug!("checks: {phase} resolved for {} checks", checks.len());
                Arc::new(checks)
            }
            Err(e) => {
                tracing::warn!("checks: {phase} unavailable: {e:#}");
                Arc::clone(input)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Focus a check. The id is taken as-is; an unknown id simply resolves
    /// to no selected check.
    pub fn select(&self, id: CheckRunId) {
        self.commit("selection", |s| s.selected_check_id = Some(id));
    }

    pub fn selected_check(&self) -> Option<CheckRun> {
        self.state.borrow().selected_check().cloned()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn can_rerun(&self) -> bool {
        !self.state.borrow().checks.is_empty()
    }

    /// Ask the host to re-run every check. Returns `false` (and does
    /// nothing) when there are no checks.
    pub fn rerun_jobs(&self) -> bool {
        let checks = Arc::clone(&self.state.borrow().checks);
        if checks.is_empty() {
            return false;
        }
        self.host.request_rerun(&self.revision.repository, &checks);
        true
    }

    pub fn view_check_details(&self, check: &CheckRun) {
        let number = self.revision.pull_request.number;
        if let Some(url) = urls::check_url(check, &self.revision.repository, number) {
            self.host.open_external(&url);
        }
    }

    pub fn view_selected_check_details(&self) {
        if let Some(check) = self.selected_check() {
            self.view_check_details(&check);
        }
    }

    pub fn view_job_step(&self, step: &JobStep) {
        let Some(check) = self.selected_check() else {
            return;
        };
        let number = self.revision.pull_request.number;
        if let Some(url) = urls::step_url(&check, step, &self.revision.repository, number) {
            self.host.open_external(&url);
        }
    }

    /// Switch to the repository, then check out the pull request. The busy
    /// flag is up for the duration and the dialog is dismissed afterwards,
    /// whatever the outcome.
    pub async fn switch_to_pull_request(&self) -> Result<(), SwitchError> {
        self.set_switching(true);
        let result = self.switch_then_checkout().await;
        self.set_switching(false);
        if let Err(ref e) = result {
            tracing::debug!("checks: switch to pull request failed: {e}");
        }
        self.host.dismiss();
        result
    }

    async fn switch_then_checkout(&self) -> Result<(), SwitchError> {
        let repository = &self.revision.repository;
        self.host
            .switch_active_repository(repository)
            .await
            .map_err(SwitchError::SwitchRepository)?;
        self.host
            .checkout_change(repository, &self.revision.pull_request)
            .await
            .map_err(SwitchError::Checkout)
    }

    // The busy flag bypasses the guard so the dialog always leaves its busy
    // state.
    fn set_switching(&self, switching: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.switching_to_pull_request != switching;
            s.switching_to_pull_request = switching;
            changed
        });
    }

    /// User dismissed the dialog without switching.
    pub fn dismiss(&self) {
        self.host.dismiss();
    }
}

impl<H: Host> Drop for ChecksDialog<H> {
    fn drop(&mut self) {
        self.guard.cancel();
    }
}
