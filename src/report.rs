use indexmap::IndexMap;

use crate::checks::{ChecksSnapshot, StepsView};
use crate::types::{CheckConclusion, CheckRun, CheckStatus, JobStep, Revision};
use crate::util::{format_duration, short_sha, truncate_with_ellipsis};

/// Dialog heading, e.g. `"2 checks failed in your pull request"`.
pub fn failed_summary(failed: usize) -> String {
    let noun = if failed > 1 { "checks" } else { "check" };
    format!("{failed} {noun} failed in your pull request")
}

pub fn confirm_label(should_change_repository: bool) -> &'static str {
    if should_change_repository {
        "Switch to repository and pull request"
    } else {
        "Switch to pull request"
    }
}

pub fn switch_prompt(failed: usize) -> String {
    let pronoun = if failed > 1 { "them" } else { "it" };
    format!("Do you want to switch to that Pull Request now and start fixing {pronoun}?")
}

fn status_icon(status: CheckStatus, conclusion: Option<CheckConclusion>) -> &'static str {
    match (status, conclusion) {
        (CheckStatus::Completed, Some(c)) if c.is_failure() => "✗",
        (CheckStatus::Completed, Some(CheckConclusion::Success)) => "✓",
        (CheckStatus::Completed, Some(CheckConclusion::Skipped | CheckConclusion::Neutral)) => "-",
        (CheckStatus::Completed, _) => "○",
        _ => "●",
    }
}

/// Render the dialog as plain text: header, commit line, the check list
/// grouped by workflow, the steps of the selected check and the prompt.
pub fn render(
    revision: &Revision,
    snapshot: &ChecksSnapshot,
    should_change_repository: bool,
    max_commit_message_length: usize,
) -> String {
    let failed = snapshot.failed_checks().count();
    let pr = &revision.pull_request;
    let draft = if pr.draft { " (draft)" } else { "" };

    let mut lines = vec![
        failed_summary(failed),
        format!("{}{draft} #{}", pr.title, pr.number),
        String::new(),
        format!(
            "{}  {}",
            truncate_with_ellipsis(
                first_line(&revision.commit_message),
                max_commit_message_length
            ),
            short_sha(&revision.commit_sha)
        ),
        String::new(),
    ];

    render_checks(&mut lines, snapshot);
    lines.push(String::new());
    render_steps(&mut lines, snapshot.steps_view());
    lines.push(String::new());
    lines.push(switch_prompt(failed));
    lines.push(format!("[Dismiss]  [{}]", confirm_label(should_change_repository)));

    lines.join("\n")
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

fn render_checks(lines: &mut Vec<String>, snapshot: &ChecksSnapshot) {
    if snapshot.checks.is_empty() {
        lines.push("(no checks)".to_owned());
        return;
    }

    let selected = snapshot.selected_check_id;
    let max_name_w = snapshot
        .checks
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);

    for (i, (workflow, checks)) in group_by_workflow(&snapshot.checks).iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(workflow.unwrap_or("(other)").to_owned());
        for check in checks {
            let marker = if Some(check.id) == selected { ">" } else { " " };
            let icon = status_icon(check.status, check.conclusion);
            let verdict = check.conclusion.map_or("pending", CheckConclusion::as_str);
            let pad = max_name_w - check.name.chars().count() + 2;
            lines.push(format!(
                "{marker} {icon} {}{:pad$}{verdict}",
                check.name, ""
            ));
        }
    }
}

/// Group checks by their workflow, keeping first-seen order. Checks not
/// linked to a workflow come last.
fn group_by_workflow(checks: &[CheckRun]) -> Vec<(Option<&str>, Vec<&CheckRun>)> {
    let mut groups: IndexMap<Option<&str>, Vec<&CheckRun>> = IndexMap::new();
    for check in checks {
        let key = check
            .actions_job
            .as_ref()
            .map(|job| job.workflow_name.as_str());
        groups.entry(key).or_default().push(check);
    }
    if let Some(other) = groups.shift_remove(&None) {
        groups.insert(None, other);
    }
    groups.into_iter().collect()
}

fn render_steps(lines: &mut Vec<String>, view: StepsView<'_>) {
    match view {
        StepsView::Hidden => {}
        StepsView::Loading => {
            lines.push("Stand By".to_owned());
            lines.push("Check run steps incoming!".to_owned());
        }
        StepsView::NoSteps => {
            lines.push("There are no steps to display for this check.".to_owned());
            lines.push("View check details".to_owned());
        }
        StepsView::Steps(steps) => {
            for step in steps {
                render_step(lines, step);
            }
        }
    }
}

fn render_step(lines: &mut Vec<String>, step: &JobStep) {
    let icon = status_icon(step.status, step.conclusion);
    let dur = format_duration(step.started_at, step.completed_at);
    if dur.is_empty() {
        lines.push(format!("  {icon} {}. {}", step.number, step.name));
    } else {
        lines.push(format!("  {icon} {}. {}  {dur}", step.number, step.name));
    }
    if let Some(log) = &step.log {
        for line in &log.excerpt {
            lines.push(format!("      | {line}"));
        }
    }
}
