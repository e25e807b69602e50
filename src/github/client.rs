use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use moka::future::Cache;
use octocrab::Octocrab;

use crate::checks::ResolverFactory;
use crate::types::Account;

use super::resolver::GitHubResolver;

/// A GitHub API client that manages per-endpoint Octocrab instances and an
/// in-memory cache for responses.
pub struct GitHubClient {
    instances: RwLock<HashMap<String, Arc<Octocrab>>>,
    cache: Cache<String, String>,
    log_excerpt_lines: usize,
}

impl GitHubClient {
    /// Create a new client with the given cache TTL.
    pub fn new(cache_ttl_minutes: u32, log_excerpt_lines: usize) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(u64::from(cache_ttl_minutes) * 60))
            .build();

        Self {
            instances: RwLock::new(HashMap::new()),
            cache,
            log_excerpt_lines,
        }
    }

    /// Get or create an Octocrab instance authenticated as `account`.
    pub fn octocrab_for(&self, account: &Account) -> Result<Arc<Octocrab>> {
        if let Some(instance) = self
            .instances
            .read()
            .map_err(|_| anyhow!("octocrab instance map poisoned"))?
            .get(&account.endpoint)
        {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new(
            Octocrab::builder()
                .personal_token(account.token.clone())
                .base_uri(account.endpoint.as_str())
                .with_context(|| format!("setting base URI {}", account.endpoint))?
                .build()
                .context("building octocrab instance")?,
        );
        self.instances
            .write()
            .map_err(|_| anyhow!("octocrab instance map poisoned"))?
            .insert(account.endpoint.clone(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Return a clone of the internal cache (Arc-backed, cheap to clone).
    pub fn cache(&self) -> Cache<String, String> {
        self.cache.clone()
    }
}

impl ResolverFactory for GitHubClient {
    type Resolver = GitHubResolver;

    fn resolver_for(&self, account: &Account) -> Result<GitHubResolver> {
        Ok(GitHubResolver::new(
            self.octocrab_for(account)?,
            self.cache(),
            self.log_excerpt_lines,
        ))
    }
}
