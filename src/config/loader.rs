use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path)
/// 2. `.gh-checks.toml` in the current Git repository root
/// 3. `$GH_CHECKS_CONFIG` environment variable
/// 4. `$XDG_CONFIG_HOME/gh-checks/config.toml`
/// 5. `~/.config/gh-checks/config.toml`
///
/// If both a global and a repo-local config exist, the repo-local `[github]`
/// and `[defaults]` tables replace the global ones and `repo_paths` are
/// merged (local entries override matching global keys).
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit_path {
        return read_config(path);
    }

    let config = match (find_global_config(), find_repo_local_config()) {
        (Some(global), Some(local)) => merge_configs(read_config(&global)?, read_config(&local)?),
        (Some(path), None) | (None, Some(path)) => read_config(&path)?,
        (None, None) => AppConfig::default(),
    };
    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut config: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parsing TOML from {}", path.display()))?;
    for repo_path in config.repo_paths.values_mut() {
        *repo_path = expand_tilde(&repo_path.to_string_lossy());
    }
    Ok(config)
}

/// Merge repo-local config on top of global config.
pub(crate) fn merge_configs(global: AppConfig, local: AppConfig) -> AppConfig {
    AppConfig {
        github: local.github,
        defaults: local.defaults,
        repo_paths: {
            let mut paths = global.repo_paths;
            paths.extend(local.repo_paths);
            paths
        },
    }
}

fn find_repo_local_config() -> Option<PathBuf> {
    // Walk up from CWD looking for `.gh-checks.toml` next to a `.git` directory.
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(".gh-checks.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.join(".git").exists() {
            // Reached git root without finding config.
            return None;
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn find_global_config() -> Option<PathBuf> {
    // $GH_CHECKS_CONFIG
    if let Ok(path) = std::env::var("GH_CHECKS_CONFIG") {
        let p = PathBuf::from(&path);
        if p.is_file() {
            return Some(p);
        }
    }

    // $XDG_CONFIG_HOME/gh-checks/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("gh-checks/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/gh-checks/config.toml
    if let Some(home) = home_dir() {
        let p = home.join(".config/gh-checks/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
