pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::GitHubClient;
pub use types::{Branch, ExternalCheck, Organization, RepoPermissions, RepoRef, Repository};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::protection::ProtectionConfig;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid GitHub API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Not a GitHub remote URL: {0}")]
    InvalidRemote(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Everything the workflow needs from GitHub.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// The authenticated user's personal account first, then their organizations.
    async fn list_organizations(&self) -> Result<Vec<Organization>, GitHubError>;

    async fn list_repositories(&self, org: &Organization) -> Result<Vec<Repository>, GitHubError>;

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, GitHubError>;

    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, GitHubError>;

    /// `Ok(None)` means the branch exists but is not protected.
    async fn get_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<ProtectionConfig>, GitHubError>;

    /// Replace the branch's protection with a submission-shaped body.
    async fn set_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        submission: &Value,
    ) -> Result<(), GitHubError>;

    /// Best effort: lookup failures produce an empty list.
    async fn list_external_checks(&self, owner: &str, repo: &str) -> Vec<ExternalCheck>;
}

/// Parse a GitHub remote URL into owner and repository name.
///
/// Accepts `https://github.com/{owner}/{repo}(.git)`,
/// `git@github.com:{owner}/{repo}(.git)` and `ssh://git@github.com/{owner}/{repo}(.git)`.
pub fn parse_remote_url(url: &str) -> Result<RepoRef, GitHubError> {
    let invalid = || GitHubError::InvalidRemote(url.to_string());
    let url = url.trim();

    let path = match url.strip_prefix("git@github.com:") {
        Some(path) => path.to_string(),
        None => {
            let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;
            if parsed.host_str() != Some("github.com") {
                return Err(invalid());
            }
            parsed.path().to_string()
        }
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<_> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    if segments.len() != 2 {
        return Err(invalid());
    }

    Ok(RepoRef {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
    })
}

/// Find the GitHub repository behind the working directory's `origin` remote.
pub async fn detect_local_repository() -> Option<RepoRef> {
    let output = tokio::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        debug!(status = %output.status, "git remote lookup failed");
        return None;
    }
    let remote = String::from_utf8_lossy(&output.stdout);
    match parse_remote_url(&remote) {
        Ok(repo) => Some(repo),
        Err(err) => {
            debug!(error = %err, "origin is not a GitHub remote");
            None
        }
    }
}
