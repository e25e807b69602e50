use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub defaults: Defaults,
    /// Local clone of each repository, keyed by `owner/name`.
    #[serde(default)]
    pub repo_paths: HashMap<String, PathBuf>,
}

// ---------------------------------------------------------------------------
// GitHub access
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Hosts for which accounts are discovered at startup.
    pub hosts: Vec<String>,
    /// Upper bound for each loading phase of the check dialog.
    pub resolve_timeout_secs: u64,
    pub cache_ttl_minutes: u32,
    /// Lines of output kept for each failed step.
    pub log_excerpt_lines: usize,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["github.com".to_owned()],
            resolve_timeout_secs: 60,
            cache_ttl_minutes: 5,
            log_excerpt_lines: 20,
        }
    }
}

impl GitHubConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub max_commit_message_length: usize,
    /// Open URLs in the browser; when false they are printed instead.
    pub open_browser: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_commit_message_length: 72,
            open_browser: true,
        }
    }
}
