use std::sync::Arc;
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use octocrab::Octocrab;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::types::AppConfig;
use crate::github::client::GitHubClient;
use crate::github::{actions, rate_limit};
use crate::types::{Account, CheckRun, GitHubRepository, Revision, account_for};

use super::interface::{Engine, EngineHandle, Event, Request};

/// The real GitHub backend engine.
pub struct GitHubEngine {
    config: AppConfig,
    accounts: Vec<Account>,
}

impl GitHubEngine {
    pub fn new(config: AppConfig, accounts: Vec<Account>) -> Self {
        Self { config, accounts }
    }
}

impl Engine for GitHubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("gh-engine".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new().expect("tokio runtime init");
                rt.block_on(self.run_loop(rx));
            });
        handle
    }
}

impl GitHubEngine {
    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        let client = GitHubClient::new(
            self.config.github.cache_ttl_minutes,
            self.config.github.log_excerpt_lines,
        );

        loop {
            match rx.recv().await {
                None | Some(Request::Shutdown) => {
                    tracing::debug!("engine: shutting down");
                    break;
                }
                Some(req) => handle_request(req, &client, &self.accounts).await,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

async fn handle_request(req: Request, client: &GitHubClient, accounts: &[Account]) {
    tracing::debug!("engine: received request");
    match req {
        Request::FetchRevision {
            repository,
            number,
            reply_tx,
        } => {
            let Some(octocrab) =
                get_octocrab(client, accounts, &repository, &reply_tx, "FetchRevision")
            else {
                return;
            };
            match fetch_revision(&octocrab, client, repository, number).await {
                Ok((revision, checks)) => {
                    tracing::debug!(
                        "engine: sending RevisionFetched #{number} checks={}",
                        checks.len()
                    );
                    let _ = reply_tx.send(Event::RevisionFetched { revision, checks });
                }
                Err(e) => {
                    tracing::debug!("engine: FetchRevision #{number} error: {e:#}");
                    let _ = reply_tx.send(Event::FetchError {
                        context: format!("FetchRevision #{number}"),
                        message: rate_limit::user_message(&e),
                    });
                }
            }
        }

        Request::RerequestCheckSuites {
            repository,
            check_suite_ids,
            reply_tx,
        } => {
            let Some(octocrab) = get_octocrab(
                client,
                accounts,
                &repository,
                &reply_tx,
                "RerequestCheckSuites",
            ) else {
                return;
            };
            let mut failures = Vec::new();
            for id in &check_suite_ids {
                if let Err(e) = actions::rerequest_check_suite(
                    &octocrab,
                    &repository.owner,
                    &repository.name,
                    *id,
                )
                .await
                {
                    tracing::debug!("engine: rerequest suite {id} error: {e:#}");
                    failures.push(format!("suite {id}: {}", rate_limit::user_message(&e)));
                }
            }
            let description = format!(
                "Re-run {} check suite(s) in {}",
                check_suite_ids.len(),
                repository.full_name()
            );
            let event = if failures.is_empty() {
                Event::MutationOk { description }
            } else {
                Event::MutationError {
                    description,
                    message: failures.join("; "),
                }
            };
            let _ = reply_tx.send(event);
        }

        Request::Shutdown => unreachable!("handled at run_loop level"),
    }
}

async fn fetch_revision(
    octocrab: &Arc<Octocrab>,
    client: &GitHubClient,
    mut repository: GitHubRepository,
    number: u64,
) -> Result<(Revision, Vec<CheckRun>)> {
    let (pull_request, html_url) =
        actions::fetch_pull_request(octocrab, &repository.owner, &repository.name, number)
            .await?;
    if repository.html_url.is_none() {
        repository.html_url = html_url;
    }

    let sha = pull_request.head_sha.clone();
    let commit_message =
        actions::fetch_commit_message(octocrab, &repository.owner, &repository.name, &sha)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("engine: commit message for {sha} unavailable: {e:#}");
                String::new()
            });
    let cache = client.cache();
    let checks = actions::fetch_check_runs(octocrab, &repository, &sha, Some(&cache))
        .await
        .with_context(|| format!("checks for {sha}"))?;

    Ok((
        Revision {
            repository,
            pull_request,
            commit_message,
            commit_sha: sha,
        },
        checks,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Get an Octocrab instance for the repository's endpoint, sending a
/// `FetchError` on failure.
fn get_octocrab(
    client: &GitHubClient,
    accounts: &[Account],
    repository: &GitHubRepository,
    reply_tx: &Sender<Event>,
    context: &str,
) -> Option<Arc<Octocrab>> {
    let result = account_for(accounts, &repository.endpoint)
        .with_context(|| format!("no account for {}", repository.endpoint))
        .and_then(|account| client.octocrab_for(account));
    match result {
        Ok(o) => Some(o),
        Err(e) => {
            tracing::debug!("engine: {context}: octocrab for {} failed: {e:#}", repository.endpoint);
            let _ = reply_tx.send(Event::FetchError {
                context: context.to_owned(),
                message: format!("{e:#}"),
            });
            None
        }
    }
}
