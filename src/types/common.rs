use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Check lifecycle / result enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Skipped,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

impl CheckConclusion {
    /// Conclusions that count as a failed check.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Failure | Self::TimedOut | Self::ActionRequired | Self::StartupFailure
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
            Self::ActionRequired => "action required",
            Self::Skipped => "skipped",
            Self::Stale => "stale",
            Self::StartupFailure => "startup failure",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a REST `status` string. Unknown values map to `CheckStatus::Unknown`.
pub fn parse_status(s: &str) -> CheckStatus {
    match s {
        "queued" => CheckStatus::Queued,
        "in_progress" => CheckStatus::InProgress,
        "completed" => CheckStatus::Completed,
        "waiting" => CheckStatus::Waiting,
        "requested" => CheckStatus::Requested,
        "pending" => CheckStatus::Pending,
        _ => CheckStatus::Unknown,
    }
}

/// Parse a REST `conclusion` string.
pub fn parse_conclusion(s: &str) -> CheckConclusion {
    match s {
        "success" => CheckConclusion::Success,
        "failure" => CheckConclusion::Failure,
        "neutral" => CheckConclusion::Neutral,
        "cancelled" => CheckConclusion::Cancelled,
        "timed_out" => CheckConclusion::TimedOut,
        "action_required" => CheckConclusion::ActionRequired,
        "skipped" => CheckConclusion::Skipped,
        "stale" => CheckConclusion::Stale,
        "startup_failure" => CheckConclusion::StartupFailure,
        _ => CheckConclusion::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Repository / revision identity
// ---------------------------------------------------------------------------

/// REST API base URL for a GitHub host.
///
/// `github.com` maps to `https://api.github.com`, anything else is treated as
/// a GitHub Enterprise Server at `https://{host}/api/v3`.
pub fn api_endpoint(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_owned()
    } else {
        format!("https://{host}/api/v3")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub owner: String,
    pub name: String,
    /// REST API base URL; accounts are matched against it.
    pub endpoint: String,
    /// Web URL of the repository (e.g. `https://github.com/owner/name`).
    #[serde(default)]
    pub html_url: Option<String>,
}

impl GitHubRepository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub draft: bool,
    /// Head branch name, used as the `branch` filter for workflow runs.
    pub head_ref: String,
    pub head_sha: String,
}

/// The revision whose checks are displayed: repository, pull request and
/// head commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub repository: GitHubRepository,
    pub pull_request: PullRequestRef,
    pub commit_message: String,
    pub commit_sha: String,
}

/// An authenticated account for one API endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub endpoint: String,
    pub token: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Find the account whose endpoint serves `endpoint`.
pub fn account_for<'a>(accounts: &'a [Account], endpoint: &str) -> Option<&'a Account> {
    accounts.iter().find(|a| a.endpoint == endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classification() {
        assert!(CheckConclusion::Failure.is_failure());
        assert!(CheckConclusion::TimedOut.is_failure());
        assert!(CheckConclusion::ActionRequired.is_failure());
        assert!(CheckConclusion::StartupFailure.is_failure());
        assert!(!CheckConclusion::Cancelled.is_failure());
        assert!(!CheckConclusion::Success.is_failure());
        assert!(!CheckConclusion::Neutral.is_failure());
    }

    #[test]
    fn unknown_conclusion_string() {
        assert_eq!(parse_conclusion("exploded"), CheckConclusion::Unknown);
        assert_eq!(parse_status("in_progress"), CheckStatus::InProgress);
    }

    #[test]
    fn api_endpoint_for_enterprise_host() {
        assert_eq!(api_endpoint("github.com"), "https://api.github.com");
        assert_eq!(
            api_endpoint("ghe.example.com"),
            "https://ghe.example.com/api/v3"
        );
    }

    #[test]
    fn account_debug_hides_token() {
        let account = Account {
            endpoint: "https://api.github.com".into(),
            token: "ghp_secret".into(),
        };
        assert!(!format!("{account:?}").contains("ghp_secret"));
    }

    #[test]
    fn account_lookup_matches_endpoint_exactly() {
        let accounts = [
            Account {
                endpoint: "https://api.github.com".into(),
                token: "a".into(),
            },
            Account {
                endpoint: "https://ghe.example.com/api/v3".into(),
                token: "b".into(),
            },
        ];
        let found = account_for(&accounts, "https://ghe.example.com/api/v3").unwrap();
        assert_eq!(found.token, "b");
        assert!(account_for(&accounts, "https://ghe.example.com").is_none());
    }
}
