use std::sync::Arc;

use crate::types::{CheckRun, CheckRunId, JobStep};

// ---------------------------------------------------------------------------
// Load phases
// ---------------------------------------------------------------------------

/// Progress of the two resolver phases.
///
/// Both flags start `true` and only ever move to `false`. Logs can never be
/// done while workflows are still loading: [`LoadState::finish_logs`] clears
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadState {
    pub workflows_loading: bool,
    pub logs_loading: bool,
}

impl LoadState {
    pub const fn loading() -> Self {
        Self {
            workflows_loading: true,
            logs_loading: true,
        }
    }

    pub const fn done() -> Self {
        Self {
            workflows_loading: false,
            logs_loading: false,
        }
    }

    pub const fn finish_workflows(self) -> Self {
        Self {
            workflows_loading: false,
            logs_loading: self.logs_loading,
        }
    }

    pub const fn finish_logs(self) -> Self {
        Self::done()
    }

    /// Whether any placeholder should still be shown.
    pub const fn is_loading(self) -> bool {
        self.workflows_loading || self.logs_loading
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::loading()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// What the step pane should show for the selected check.
#[derive(Debug, PartialEq, Eq)]
pub enum StepsView<'a> {
    /// No check is selected (empty check set).
    Hidden,
    Loading,
    NoSteps,
    Steps(&'a [JobStep]),
}

/// The state bundle observed by views: check set, load phases, selection and
/// the busy flag of the context switch. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksSnapshot {
    pub checks: Arc<Vec<CheckRun>>,
    pub load: LoadState,
    pub selected_check_id: Option<CheckRunId>,
    pub switching_to_pull_request: bool,
}

impl ChecksSnapshot {
    pub fn new(checks: Vec<CheckRun>) -> Self {
        let selected_check_id = initial_selection(&checks);
        Self {
            checks: Arc::new(checks),
            load: LoadState::loading(),
            selected_check_id,
            switching_to_pull_request: false,
        }
    }

    /// Look the selected id up in the current set. `None` when nothing is
    /// selected or the id is not part of the set.
    pub fn selected_check(&self) -> Option<&CheckRun> {
        let id = self.selected_check_id?;
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.load.is_loading()
    }

    /// Busy while checks are loading or the context switch is running.
    pub fn is_busy(&self) -> bool {
        self.is_loading() || self.switching_to_pull_request
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckRun> {
        self.checks.iter().filter(|c| c.is_failure())
    }

    pub fn steps_view(&self) -> StepsView<'_> {
        let Some(check) = self.selected_check() else {
            return StepsView::Hidden;
        };
        if self.is_loading() {
            return StepsView::Loading;
        }
        match check.action_job_steps.as_deref() {
            None => StepsView::NoSteps,
            Some(steps) => StepsView::Steps(steps),
        }
    }
}

/// First failing check, else the first check, else nothing.
pub fn initial_selection(checks: &[CheckRun]) -> Option<CheckRunId> {
    checks
        .iter()
        .find(|c| c.is_failure())
        .or_else(|| checks.first())
        .map(|c| c.id)
}
