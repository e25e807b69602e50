use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::{Notify, watch};

use gh_checks::checks::{
    CancellationGuard, CheckResolver, ChecksDialog, ChecksSnapshot, Host, ResolverFactory,
    StepsView, SwitchError,
};
use gh_checks::types::{
    Account, ActionsJobRef, CheckConclusion, CheckRun, CheckStatus, GitHubRepository, JobStep,
    PullRequestRef, Revision,
};

const ENDPOINT: &str = "https://api.github.com";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn revision() -> Revision {
    Revision {
        repository: GitHubRepository {
            owner: "octo".into(),
            name: "widgets".into(),
            endpoint: ENDPOINT.into(),
            html_url: Some("https://github.com/octo/widgets".into()),
        },
        pull_request: PullRequestRef {
            number: 12,
            title: "Add gizmo".into(),
            draft: false,
            head_ref: "gizmo".into(),
            head_sha: "0123456789abcdef".into(),
        },
        commit_message: "Add gizmo".into(),
        commit_sha: "0123456789abcdef".into(),
    }
}

fn check(id: u64, name: &str, conclusion: CheckConclusion) -> CheckRun {
    CheckRun {
        id,
        name: name.into(),
        status: CheckStatus::Completed,
        conclusion: Some(conclusion),
        html_url: Some(format!("https://github.com/octo/widgets/runs/{id}")),
        check_suite_id: Some(100 + id % 2),
        app_name: Some("GitHub Actions".into()),
        output_summary: None,
        actions_job: None,
        action_job_steps: None,
    }
}

fn checks() -> Vec<CheckRun> {
    vec![
        check(1, "lint", CheckConclusion::Success),
        check(2, "test", CheckConclusion::Failure),
        check(3, "docs", CheckConclusion::Failure),
    ]
}

fn accounts() -> Vec<Account> {
    vec![Account {
        endpoint: ENDPOINT.into(),
        token: "t0ken".into(),
    }]
}

fn ids(checks: &[CheckRun]) -> HashSet<u64> {
    checks.iter().map(|c| c.id).collect()
}

fn order(checks: &[CheckRun]) -> Vec<u64> {
    checks.iter().map(|c| c.id).collect()
}

fn step(number: u32, name: &str) -> JobStep {
    JobStep {
        name: name.into(),
        number,
        status: CheckStatus::Completed,
        conclusion: Some(CheckConclusion::Success),
        started_at: None,
        completed_at: None,
        log: None,
    }
}

// ---------------------------------------------------------------------------
// Scripted resolver
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Phase {
    Resolve,
    Fail,
    DropFirst,
    Hang,
}

#[derive(Clone)]
struct ScriptedResolver {
    metadata: Phase,
    logs: Phase,
    /// When set, each phase waits for a permit before answering.
    gates: Option<(Rc<Notify>, Rc<Notify>)>,
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl ScriptedResolver {
    fn new(metadata: Phase, logs: Phase) -> Self {
        Self {
            metadata,
            logs,
            gates: None,
            calls: Rc::default(),
        }
    }

    fn gated(mut self) -> (Self, Rc<Notify>, Rc<Notify>) {
        let metadata_gate = Rc::new(Notify::new());
        let logs_gate = Rc::new(Notify::new());
        self.gates = Some((Rc::clone(&metadata_gate), Rc::clone(&logs_gate)));
        (self, metadata_gate, logs_gate)
    }

    async fn answer(
        &self,
        phase: Phase,
        checks: &[CheckRun],
        enrich: impl Fn(&mut CheckRun),
    ) -> Result<Vec<CheckRun>> {
        match phase {
            Phase::Resolve => {
                // Reversed on purpose: the dialog restores the original order.
                let mut out: Vec<CheckRun> = checks.iter().rev().cloned().collect();
                out.iter_mut().for_each(enrich);
                Ok(out)
            }
            Phase::Fail => bail!("HTTP 502"),
            Phase::DropFirst => Ok(checks.iter().skip(1).cloned().collect()),
            Phase::Hang => std::future::pending().await,
        }
    }
}

impl CheckResolver for ScriptedResolver {
    async fn resolve_workflow_metadata(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>> {
        assert_eq!((owner, repo, git_ref), ("octo", "widgets", "gizmo"));
        self.calls.borrow_mut().push("metadata");
        if let Some((gate, _)) = &self.gates {
            gate.notified().await;
        }
        self.answer(self.metadata, checks, |c| {
            c.actions_job = Some(ActionsJobRef {
                run_id: 900,
                job_id: c.id,
                workflow_name: "CI".into(),
                job_html_url: None,
                logs_url: format!("/repos/octo/widgets/actions/jobs/{}/logs", c.id),
            });
        })
        .await
    }

    async fn resolve_latest_logs(
        &self,
        _owner: &str,
        _repo: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>> {
        self.calls.borrow_mut().push("logs");
        if let Some((_, gate)) = &self.gates {
            gate.notified().await;
        }
        self.answer(self.logs, checks, |c| {
            if c.actions_job.is_some() {
                c.action_job_steps = Some(vec![
                    step(1, "Set up job"),
                    step(2, "Run tests"),
                    step(3, "Complete job"),
                ]);
            }
        })
        .await
    }
}

struct ScriptedFactory {
    resolver: ScriptedResolver,
    built: Cell<usize>,
}

impl ScriptedFactory {
    fn new(resolver: ScriptedResolver) -> Self {
        Self {
            resolver,
            built: Cell::new(0),
        }
    }
}

impl ResolverFactory for ScriptedFactory {
    type Resolver = ScriptedResolver;

    fn resolver_for(&self, account: &Account) -> Result<ScriptedResolver> {
        assert_eq!(account.endpoint, ENDPOINT);
        self.built.set(self.built.get() + 1);
        Ok(self.resolver.clone())
    }
}

// ---------------------------------------------------------------------------
// Recording host
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct RecordingHost {
    log: Rc<RefCell<Vec<String>>>,
    fail_switch: bool,
    fail_checkout: bool,
    /// Dialog state as seen from the host while commands run.
    state: Rc<RefCell<Option<watch::Receiver<ChecksSnapshot>>>>,
}

impl RecordingHost {
    fn record(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }

    fn busy(&self) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(|rx| rx.borrow().switching_to_pull_request)
    }

    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Host for RecordingHost {
    fn open_external(&self, url: &str) {
        self.record(format!("open {url}"));
    }

    fn request_rerun(&self, repository: &GitHubRepository, checks: &[CheckRun]) {
        self.record(format!("rerun {} x{}", repository.full_name(), checks.len()));
    }

    async fn switch_active_repository(&self, repository: &GitHubRepository) -> Result<()> {
        self.record(format!("switch {} busy={}", repository.full_name(), self.busy()));
        tokio::task::yield_now().await;
        if self.fail_switch {
            bail!("no local clone");
        }
        self.record("switched");
        Ok(())
    }

    async fn checkout_change(
        &self,
        _repository: &GitHubRepository,
        pull_request: &PullRequestRef,
    ) -> Result<()> {
        self.record(format!("checkout #{} busy={}", pull_request.number, self.busy()));
        if self.fail_checkout {
            bail!("dirty work tree");
        }
        Ok(())
    }

    fn dismiss(&self) {
        self.record("dismiss");
    }
}

fn dialog_with(checks: Vec<CheckRun>, host: RecordingHost) -> ChecksDialog<RecordingHost> {
    let dialog = ChecksDialog::new(revision(), checks, host.clone(), CancellationGuard::new());
    *host.state.borrow_mut() = Some(dialog.subscribe());
    dialog
}

// ---------------------------------------------------------------------------
// Loading pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn phases_commit_in_order_and_keep_the_check_order() {
    let (resolver, metadata_gate, logs_gate) =
        ScriptedResolver::new(Phase::Resolve, Phase::Resolve).gated();
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());
    let mut rx = dialog.subscribe();
    let original = order(&checks());

    assert!(dialog.snapshot().load.workflows_loading);
    assert!(dialog.snapshot().load.logs_loading);
    assert_eq!(dialog.snapshot().steps_view(), StepsView::Loading);

    let accounts = accounts();
    let driver = async {
        metadata_gate.notify_one();
        rx.changed().await.unwrap();
        {
            let s = rx.borrow_and_update();
            assert!(!s.load.workflows_loading);
            assert!(s.load.logs_loading);
            assert!(s.is_loading());
            assert_eq!(order(&s.checks), original);
            assert!(s.checks.iter().all(|c| c.actions_job.is_some()));
            assert!(s.checks.iter().all(|c| c.action_job_steps.is_none()));
        }

        logs_gate.notify_one();
        rx.changed().await.unwrap();
        let s = rx.borrow_and_update();
        assert!(!s.load.workflows_loading);
        assert!(!s.load.logs_loading);
        assert_eq!(order(&s.checks), original);
    };
    tokio::join!(dialog.load_check_runs(&accounts, &factory), driver);

    assert_eq!(factory.built.get(), 1);
    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    // Selection survives enrichment: still the first failure.
    assert_eq!(snapshot.selected_check_id, Some(2));
    match snapshot.steps_view() {
        StepsView::Steps(steps) => {
            let numbers: Vec<u32> = steps.iter().map(|s| s.number).collect();
            assert_eq!(numbers, vec![1, 2, 3]);
            assert_eq!(steps[1].name, "Run tests");
        }
        other => panic!("expected steps, got {other:?}"),
    }
}

#[tokio::test]
async fn teardown_before_metadata_discards_everything() {
    let (resolver, metadata_gate, _logs_gate) =
        ScriptedResolver::new(Phase::Resolve, Phase::Resolve).gated();
    let calls = Rc::clone(&resolver.calls);
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());
    let before = dialog.snapshot();

    let accounts = accounts();
    let driver = async {
        tokio::task::yield_now().await;
        dialog.teardown();
        metadata_gate.notify_one();
    };
    tokio::join!(dialog.load_check_runs(&accounts, &factory), driver);

    assert!(dialog.is_cancelled());
    assert_eq!(dialog.snapshot(), before);
    // The second phase never starts once the first result was dropped.
    assert_eq!(*calls.borrow(), vec!["metadata"]);

    dialog.select(3);
    assert_eq!(dialog.snapshot().selected_check_id, Some(2));
}

#[tokio::test]
async fn teardown_during_logs_keeps_metadata_only() {
    let (resolver, metadata_gate, logs_gate) =
        ScriptedResolver::new(Phase::Resolve, Phase::Resolve).gated();
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());
    let mut rx = dialog.subscribe();

    let accounts = accounts();
    let driver = async {
        metadata_gate.notify_one();
        rx.changed().await.unwrap();
        dialog.teardown();
        logs_gate.notify_one();
    };
    tokio::join!(dialog.load_check_runs(&accounts, &factory), driver);

    let snapshot = dialog.snapshot();
    assert!(!snapshot.load.workflows_loading);
    assert!(snapshot.load.logs_loading);
    assert!(snapshot.checks.iter().all(|c| c.action_job_steps.is_none()));
}

#[tokio::test]
async fn missing_account_clears_both_flags_without_resolving() {
    let factory = ScriptedFactory::new(ScriptedResolver::new(Phase::Resolve, Phase::Resolve));
    let dialog = dialog_with(checks(), RecordingHost::default());
    let other = vec![Account {
        endpoint: "https://git.corp.example.com/api/v3".into(),
        token: "t0ken".into(),
    }];

    dialog.load_check_runs(&other, &factory).await;

    assert_eq!(factory.built.get(), 0);
    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(*snapshot.checks, checks());
    assert_eq!(snapshot.steps_view(), StepsView::NoSteps);
}

#[tokio::test]
async fn failed_metadata_keeps_the_initial_set() {
    let resolver = ScriptedResolver::new(Phase::Fail, Phase::Resolve);
    let calls = Rc::clone(&resolver.calls);
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());

    dialog.load_check_runs(&accounts(), &factory).await;

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(ids(&snapshot.checks), ids(&checks()));
    // No job references, so the log phase has nothing to attach.
    assert!(snapshot.checks.iter().all(|c| c.actions_job.is_none()));
    assert!(snapshot.checks.iter().all(|c| c.action_job_steps.is_none()));
    assert_eq!(*calls.borrow(), vec!["metadata", "logs"]);
}

#[tokio::test]
async fn failed_logs_keep_the_metadata() {
    let factory = ScriptedFactory::new(ScriptedResolver::new(Phase::Resolve, Phase::Fail));
    let dialog = dialog_with(checks(), RecordingHost::default());

    dialog.load_check_runs(&accounts(), &factory).await;

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert!(snapshot.checks.iter().all(|c| c.actions_job.is_some()));
    assert_eq!(snapshot.steps_view(), StepsView::NoSteps);
}

#[tokio::test]
async fn result_with_a_different_id_set_is_rejected() {
    let factory = ScriptedFactory::new(ScriptedResolver::new(Phase::DropFirst, Phase::Resolve));
    let dialog = dialog_with(checks(), RecordingHost::default());

    dialog.load_check_runs(&accounts(), &factory).await;

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(ids(&snapshot.checks), ids(&checks()));
}

#[tokio::test]
async fn hanging_phase_times_out() {
    let factory = ScriptedFactory::new(ScriptedResolver::new(Phase::Hang, Phase::Resolve));
    let dialog = dialog_with(checks(), RecordingHost::default())
        .with_resolve_timeout(Duration::from_millis(50));

    dialog.load_check_runs(&accounts(), &factory).await;

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(ids(&snapshot.checks), ids(&checks()));
    assert!(snapshot.checks.iter().all(|c| c.actions_job.is_none()));
}

#[tokio::test]
async fn empty_check_set_loads_to_nothing() {
    let factory = ScriptedFactory::new(ScriptedResolver::new(Phase::Resolve, Phase::Resolve));
    let dialog = dialog_with(Vec::new(), RecordingHost::default());

    dialog.load_check_runs(&accounts(), &factory).await;

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert!(snapshot.checks.is_empty());
    assert_eq!(snapshot.selected_check_id, None);
    assert_eq!(snapshot.steps_view(), StepsView::Hidden);
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn first_failure_is_selected_initially() {
    let dialog = dialog_with(checks(), RecordingHost::default());
    assert_eq!(dialog.selected_check().map(|c| c.id), Some(2));
}

#[test]
fn first_check_is_selected_when_nothing_failed() {
    let dialog = dialog_with(
        vec![
            check(5, "lint", CheckConclusion::Success),
            check(6, "test", CheckConclusion::Skipped),
        ],
        RecordingHost::default(),
    );
    assert_eq!(dialog.selected_check().map(|c| c.id), Some(5));
}

#[tokio::test]
async fn selection_during_metadata_survives_both_phases() {
    let (resolver, metadata_gate, logs_gate) =
        ScriptedResolver::new(Phase::Resolve, Phase::Resolve).gated();
    let calls = Rc::clone(&resolver.calls);
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());

    let accounts = accounts();
    let driver = async {
        tokio::task::yield_now().await;
        assert_eq!(*calls.borrow(), vec!["metadata"]);
        dialog.select(3);
        assert_eq!(dialog.snapshot().selected_check_id, Some(3));
        metadata_gate.notify_one();
        logs_gate.notify_one();
    };
    tokio::join!(dialog.load_check_runs(&accounts, &factory), driver);

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(snapshot.selected_check_id, Some(3));
    let selected = dialog.selected_check().unwrap();
    assert_eq!(selected.name, "docs");
    assert!(selected.actions_job.is_some());
    assert_eq!(selected.action_job_steps.map(|s| s.len()), Some(3));
}

#[tokio::test]
async fn selection_between_phases_survives_the_log_phase() {
    let (resolver, metadata_gate, logs_gate) =
        ScriptedResolver::new(Phase::Resolve, Phase::Resolve).gated();
    let calls = Rc::clone(&resolver.calls);
    let factory = ScriptedFactory::new(resolver);
    let dialog = dialog_with(checks(), RecordingHost::default());
    let mut rx = dialog.subscribe();

    let accounts = accounts();
    let driver = async {
        metadata_gate.notify_one();
        rx.changed().await.unwrap();
        assert_eq!(*calls.borrow(), vec!["metadata", "logs"]);
        assert!(dialog.snapshot().load.logs_loading);
        dialog.select(1);
        logs_gate.notify_one();
    };
    tokio::join!(dialog.load_check_runs(&accounts, &factory), driver);

    let snapshot = dialog.snapshot();
    assert!(!snapshot.is_loading());
    assert_eq!(snapshot.selected_check_id, Some(1));
    match snapshot.steps_view() {
        StepsView::Steps(steps) => assert_eq!(steps.len(), 3),
        other => panic!("expected steps, got {other:?}"),
    }
}

#[test]
fn selecting_an_unknown_id_selects_nothing() {
    let dialog = dialog_with(checks(), RecordingHost::default());
    dialog.select(3);
    assert_eq!(dialog.selected_check().map(|c| c.name), Some("docs".to_owned()));

    dialog.select(999);
    assert_eq!(dialog.snapshot().selected_check_id, Some(999));
    assert!(dialog.selected_check().is_none());
    assert_eq!(dialog.snapshot().steps_view(), StepsView::Hidden);
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[test]
fn rerun_forwards_the_whole_set() {
    let host = RecordingHost::default();
    let dialog = dialog_with(checks(), host.clone());
    assert!(dialog.can_rerun());
    assert!(dialog.rerun_jobs());
    assert_eq!(host.entries(), vec!["rerun octo/widgets x3"]);
}

#[test]
fn rerun_without_checks_is_a_no_op() {
    let host = RecordingHost::default();
    let dialog = dialog_with(Vec::new(), host.clone());
    assert!(!dialog.can_rerun());
    assert!(!dialog.rerun_jobs());
    assert!(host.entries().is_empty());
}

#[test]
fn check_details_fall_back_to_the_pull_request() {
    let host = RecordingHost::default();
    let mut status = check(7, "ci/legacy", CheckConclusion::Failure);
    status.html_url = None;
    let dialog = dialog_with(
        vec![status, check(8, "lint", CheckConclusion::Success)],
        host.clone(),
    );

    dialog.view_selected_check_details();
    dialog.view_check_details(&check(8, "lint", CheckConclusion::Success));

    assert_eq!(
        host.entries(),
        vec![
            "open https://github.com/octo/widgets/pull/12",
            "open https://github.com/octo/widgets/runs/8",
        ]
    );
}

#[test]
fn check_details_without_any_url_do_nothing() {
    let host = RecordingHost::default();
    let mut status = check(7, "ci/legacy", CheckConclusion::Failure);
    status.html_url = None;
    let mut revision = revision();
    revision.repository.html_url = None;
    let dialog = ChecksDialog::new(revision, vec![status], host.clone(), CancellationGuard::new());

    dialog.view_selected_check_details();
    assert!(host.entries().is_empty());
}

#[test]
fn job_step_opens_the_step_anchor() {
    let host = RecordingHost::default();
    let dialog = dialog_with(checks(), host.clone());

    dialog.view_job_step(&step(4, "Run tests"));

    assert_eq!(
        host.entries(),
        vec!["open https://github.com/octo/widgets/runs/2/#step:4:1"]
    );
}

#[tokio::test]
async fn switch_runs_in_order_while_busy_then_dismisses() {
    let host = RecordingHost::default();
    let dialog = dialog_with(checks(), host.clone()).with_repository_change(true);
    assert!(dialog.should_change_repository());

    dialog.switch_to_pull_request().await.unwrap();

    assert_eq!(
        host.entries(),
        vec![
            "switch octo/widgets busy=true",
            "switched",
            "checkout #12 busy=true",
            "dismiss",
        ]
    );
    assert!(!dialog.snapshot().switching_to_pull_request);
}

#[tokio::test]
async fn failed_switch_skips_checkout_and_still_dismisses() {
    let host = RecordingHost {
        fail_switch: true,
        ..RecordingHost::default()
    };
    let dialog = dialog_with(checks(), host.clone());

    let err = dialog.switch_to_pull_request().await.unwrap_err();

    assert!(matches!(err, SwitchError::SwitchRepository(_)));
    assert_eq!(
        host.entries(),
        vec!["switch octo/widgets busy=true", "dismiss"]
    );
    assert!(!dialog.snapshot().switching_to_pull_request);
}

#[tokio::test]
async fn failed_checkout_is_reported() {
    let host = RecordingHost {
        fail_checkout: true,
        ..RecordingHost::default()
    };
    let dialog = dialog_with(checks(), host.clone());

    let err = dialog.switch_to_pull_request().await.unwrap_err();

    assert!(matches!(err, SwitchError::Checkout(_)));
    assert!(err.to_string().contains("dirty work tree"));
    assert_eq!(host.entries().last().map(String::as_str), Some("dismiss"));
    assert!(!dialog.snapshot().switching_to_pull_request);
}

#[test]
fn dismiss_reaches_the_host() {
    let host = RecordingHost::default();
    let dialog = dialog_with(checks(), host.clone());
    dialog.dismiss();
    assert_eq!(host.entries(), vec!["dismiss"]);
}

#[test]
fn dropping_the_dialog_raises_the_guard() {
    let guard = CancellationGuard::new();
    let dialog = ChecksDialog::new(
        revision(),
        checks(),
        RecordingHost::default(),
        guard.clone(),
    );
    assert!(!guard.is_cancelled());
    drop(dialog);
    assert!(guard.is_cancelled());
}
