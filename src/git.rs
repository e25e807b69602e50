use std::path::Path;
use std::process::Command;

/// Detect `owner/repo` from the git remote of the directory at `path`.
///
/// Tries the `origin` remote first, falls back to the first listed remote.
/// Parses both SSH (`git@github.com:owner/repo.git`) and HTTPS
/// (`https://github.com/owner/repo.git`) URL formats.
pub fn detect_repo(path: &Path) -> Option<String> {
    let url = remote_url(path, "origin").or_else(|| {
        let first = first_remote_name(path)?;
        remote_url(path, &first)
    })?;
    parse_remote_url(&url)
}

/// Whether the work tree at `path` belongs to a repository other than
/// `full_name`. A directory without a recognisable remote counts as another
/// repository.
pub fn is_other_repository(path: Option<&Path>, full_name: &str) -> bool {
    match path.and_then(detect_repo) {
        Some(detected) => !detected.eq_ignore_ascii_case(full_name),
        None => true,
    }
}

/// Run `git remote get-url <remote>` in the given directory.
fn remote_url(path: &Path, remote: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["remote", "get-url", remote])
        .current_dir(path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if url.is_empty() { None } else { Some(url) }
}

/// Return the name of the first listed remote.
fn first_remote_name(path: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["remote"])
        .current_dir(path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()?
        .trim()
        .to_owned();
    if name.is_empty() { None } else { Some(name) }
}

/// Parse `owner/repo` from an SSH or HTTPS remote URL.
fn parse_remote_url(url: &str) -> Option<String> {
    let slug = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else if url.starts_with("https://") || url.starts_with("http://") {
        let after_scheme = url.split_once("://")?.1;
        after_scheme.split_once('/')?.1
    } else {
        return None;
    };

    let slug = slug.strip_suffix(".git").unwrap_or(slug);
    let (owner, name) = slug.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some(format!("{owner}/{name}"))
}
