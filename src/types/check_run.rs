use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{CheckConclusion, CheckStatus};

pub type CheckRunId = u64;

// ---------------------------------------------------------------------------
// Actions job reference (attached by the metadata phase)
// ---------------------------------------------------------------------------

/// Links a check run to the GitHub Actions job that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsJobRef {
    pub run_id: u64,
    pub job_id: u64,
    pub workflow_name: String,
    #[serde(default)]
    pub job_html_url: Option<String>,
    /// API route of the plain-text job log.
    pub logs_url: String,
}

// ---------------------------------------------------------------------------
// Job steps (attached by the log phase)
// ---------------------------------------------------------------------------

/// The part of a job log belonging to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLogSegment {
    /// 1-based line in the job log where this step's output starts.
    pub first_line: usize,
    pub line_count: usize,
    /// Tail of the step output, kept for failed steps only.
    #[serde(default)]
    pub excerpt: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    pub name: String,
    pub number: u32,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: Option<StepLogSegment>,
}

impl JobStep {
    pub fn is_failure(&self) -> bool {
        self.conclusion.is_some_and(CheckConclusion::is_failure)
    }
}

// ---------------------------------------------------------------------------
// CheckRun
// ---------------------------------------------------------------------------

/// One CI check reported for the revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: CheckRunId,
    pub name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// Check suite the run belongs to; re-runs are requested per suite.
    #[serde(default)]
    pub check_suite_id: Option<u64>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub output_summary: Option<String>,
    /// `None` until the metadata phase links the check to an Actions job, or
    /// when the check was not produced by one.
    #[serde(default)]
    pub actions_job: Option<ActionsJobRef>,
    /// `None` until the log phase resolves the job's steps.
    #[serde(default)]
    pub action_job_steps: Option<Vec<JobStep>>,
}

impl CheckRun {
    /// Classified by conclusion alone, whatever the reported status.
    pub fn is_failure(&self) -> bool {
        self.conclusion.is_some_and(CheckConclusion::is_failure)
    }
}
