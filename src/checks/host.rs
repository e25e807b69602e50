use anyhow::Result;

use crate::types::{CheckRun, GitHubRepository, PullRequestRef};

/// Commands the check dialog issues to the surrounding application.
#[allow(async_fn_in_trait)]
pub trait Host {
    /// Open a URL in an external viewer.
    fn open_external(&self, url: &str);

    /// Ask for every check in `checks` to run again. Fire-and-forget: the
    /// outcome is reported through the host's own notification path.
    fn request_rerun(&self, repository: &GitHubRepository, checks: &[CheckRun]);

    async fn switch_active_repository(&self, repository: &GitHubRepository) -> Result<()>;

    async fn checkout_change(
        &self,
        repository: &GitHubRepository,
        pull_request: &PullRequestRef,
    ) -> Result<()>;

    /// The dialog is done and should be closed.
    fn dismiss(&self);
}
