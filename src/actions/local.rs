use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::process::Command;

/// Local clone configured for `repo_full_name`.
pub fn repo_path_for<'a, S: std::hash::BuildHasher>(
    repo_full_name: &str,
    repo_paths: &'a HashMap<String, PathBuf, S>,
) -> Result<&'a Path> {
    repo_paths
        .get(repo_full_name)
        .map(PathBuf::as_path)
        .with_context(|| format!("no local path configured for {repo_full_name}"))
}

/// Clone a repo via `gh repo clone` if the target path doesn't exist yet.
///
/// Returns `true` if a clone was performed, `false` if the path already existed.
async fn ensure_repo_cloned(repo_full_name: &str, target: &Path, host: &str) -> Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating parent dirs for {}", target.display()))?;
    }
    let mut cmd = Command::new("gh");
    cmd.args(["repo", "clone", repo_full_name, &target.to_string_lossy()]);
    if host != "github.com" {
        cmd.env("GH_HOST", host);
    }
    let output = cmd.output().await.context("running gh repo clone")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        anyhow::bail!("clone failed for {repo_full_name}: {stderr}");
    }
    Ok(true)
}

/// Make the configured clone of `repo_full_name` the working repository,
/// cloning it first when the path does not exist yet.
///
/// Returns the top-level directory of the work tree.
pub async fn switch_to_repository(
    repo_full_name: &str,
    repo_path: &Path,
    host: &str,
) -> Result<PathBuf> {
    if ensure_repo_cloned(repo_full_name, repo_path, host).await? {
        tracing::debug!("local: cloned {repo_full_name} into {}", repo_path.display());
    }

    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(repo_path)
        .output()
        .await
        .with_context(|| format!("cannot run git in {}", repo_path.display()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        anyhow::bail!("{} is not a git repository: {stderr}", repo_path.display());
    }
    let top_level = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    Ok(PathBuf::from(top_level))
}

/// Fetch the pull request head into a local branch named after its head ref
/// and check it out.
///
/// Fetching `pull/<n>/head` works for pull requests from forks too.
pub async fn checkout_pull_request(repo_path: &Path, number: u64, head_ref: &str) -> Result<String> {
    let refspec = format!("pull/{number}/head:{head_ref}");
    let fetch = Command::new("git")
        .args(["fetch", "origin", &refspec])
        .current_dir(repo_path)
        .output()
        .await
        .context("running git fetch")?;
    if !fetch.status.success() {
        let stderr = String::from_utf8_lossy(&fetch.stderr).trim().to_owned();
        // Fetching into the checked-out branch is refused; it is already there.
        if !stderr.contains("refusing to fetch into branch") {
            anyhow::bail!("git fetch failed: {stderr}");
        }
    }

    let output = Command::new("git")
        .arg("checkout")
        .arg(head_ref)
        .current_dir(repo_path)
        .output()
        .await
        .with_context(|| format!("cannot run git checkout in {}", repo_path.display()))?;

    if output.status.success() {
        Ok(format!("Checked out {head_ref}"))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        anyhow::bail!("git checkout failed: {stderr}")
    }
}
