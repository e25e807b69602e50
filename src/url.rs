use crate::types::{GitHubRepository, api_endpoint};

/// A pull request named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestTarget {
    /// Repository identity for the target, with its API endpoint and web URL.
    pub fn repository(&self) -> GitHubRepository {
        GitHubRepository {
            owner: self.owner.clone(),
            name: self.repo.clone(),
            endpoint: api_endpoint(&self.host),
            html_url: Some(format!("https://{}/{}/{}", self.host, self.owner, self.repo)),
        }
    }
}

/// Parse a pull request reference.
///
/// Supported forms:
/// - `https://<host>/<owner>/<repo>/pull/<number>` (any trailing path such as
///   `/checks` or `/files` is ignored)
/// - `<owner>/<repo>#<number>` (on `github.com`)
///
/// Both `https://` and `http://` schemes are accepted. Query strings and
/// fragments are stripped, so browser-copied URLs work as expected.
///
/// Returns `None` for unrecognised or malformed input.
pub fn parse_pull_request(input: &str) -> Option<PullRequestTarget> {
    let input = input.trim();
    if let Some((slug, number)) = input.split_once('#')
        && !slug.contains("://")
    {
        let (owner, repo) = slug.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        return Some(PullRequestTarget {
            host: "github.com".to_owned(),
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            number: number.parse().ok()?,
        });
    }

    let after_scheme = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))?;
    let after_scheme = after_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(after_scheme);

    let (host, path) = after_scheme.split_once('/')?;
    if host.is_empty() {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo, "pull", number, ..] => Some(PullRequestTarget {
            host: host.to_owned(),
            owner: (*owner).to_owned(),
            repo: (*repo).to_owned(),
            number: number.parse().ok()?,
        }),
        _ => None,
    }
}
