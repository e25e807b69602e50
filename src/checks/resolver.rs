use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;

use crate::types::{Account, CheckRun};

/// Remote enrichment of a check set, in two phases.
///
/// Both methods must return a set with exactly the ids of `checks`. Only
/// attributes change; the order of the result is not significant.
#[allow(async_fn_in_trait)]
pub trait CheckResolver {
    /// Link checks produced by GitHub Actions to their job and log location.
    /// Checks with no matching job pass through unchanged.
    async fn resolve_workflow_metadata(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>>;

    /// Fetch step lists and logs for every check carrying a job reference.
    /// A check that fails to resolve is returned unchanged.
    async fn resolve_latest_logs(
        &self,
        owner: &str,
        repo: &str,
        checks: &[CheckRun],
    ) -> Result<Vec<CheckRun>>;
}

/// Builds a [`CheckResolver`] authenticated as the given account.
pub trait ResolverFactory {
    type Resolver: CheckResolver;

    fn resolver_for(&self, account: &Account) -> Result<Self::Resolver>;
}

/// Why a resolver phase result was discarded.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("returned {got} checks with a different id set (expected {expected})")]
    IdSetMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

/// Verify that `after` holds exactly the ids of `before` and return it in
/// the order of `before`.
pub fn align_to_ids(
    before: &[CheckRun],
    after: Vec<CheckRun>,
) -> Result<Vec<CheckRun>, ResolveError> {
    let mismatch = ResolveError::IdSetMismatch {
        expected: before.len(),
        got: after.len(),
    };
    if before.len() != after.len() {
        return Err(mismatch);
    }
    let mut by_id: HashMap<_, _> = after.into_iter().map(|c| (c.id, c)).collect();
    if by_id.len() != before.len() {
        return Err(mismatch);
    }
    let aligned: Option<Vec<_>> = before.iter().map(|c| by_id.remove(&c.id)).collect();
    aligned.ok_or(mismatch)
}
