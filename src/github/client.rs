use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{
    Branch, ExternalCheck, GitHubApi, GitHubError, Organization, RepoPermissions, Repository,
};
use crate::config::Config;
use crate::protection::{normalize, ProtectionConfig};

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = "branch-guard";

/// REST client for api.github.com (or a GitHub Enterprise API root).
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    token: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    login: String,
    id: u64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Deserialize)]
struct PermissionsResponse {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    pull: bool,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    name: String,
    full_name: String,
    owner: OwnerResponse,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    permissions: Option<PermissionsResponse>,
}

impl From<RepositoryResponse> for Repository {
    fn from(repo: RepositoryResponse) -> Self {
        Repository {
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            private: repo.private,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            permissions: repo.permissions.map(|p| RepoPermissions {
                admin: p.admin,
                push: p.push,
                pull: p.pull,
            }),
        }
    }
}

#[derive(Deserialize)]
struct BranchResponse {
    name: String,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct WorkflowsResponse {
    #[serde(default)]
    workflows: Vec<WorkflowResponse>,
}

#[derive(Deserialize)]
struct WorkflowResponse {
    name: String,
    path: String,
}

impl GitHubClient {
    /// Build a client from configuration. Fails when no token is available.
    pub fn new(config: &Config) -> Result<Self, GitHubError> {
        let token = config.github_token().ok_or(GitHubError::MissingToken)?;
        Self::with_api_url(token, config.github.api_url())
    }

    pub fn with_api_url(token: impl Into<String>, api_url: &str) -> Result<Self, GitHubError> {
        let api_url =
            Url::parse(api_url).map_err(|_| GitHubError::InvalidApiUrl(api_url.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidApiUrl(api_url.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_url,
            token: token.into(),
        })
    }

    /// Build an authenticated request. Each segment is percent-encoded, so
    /// branch names containing `/` stay a single path segment.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        self.http
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GitHubError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Follow `page=` pagination until a short page comes back.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .request(Method::GET, segments)
                .query(query)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let batch: Vec<T> = self.send_json(request).await?;
            let fetched = batch.len();
            items.extend(batch);
            debug!(page, fetched, "fetched page");
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

/// Turn a non-success response into [`GitHubError::Api`], carrying GitHub's
/// `message` field when the body has one.
async fn check_status(response: Response) -> Result<Response, GitHubError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "no error message".to_string());
    Err(GitHubError::Api { status, message })
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self))]
    async fn list_organizations(&self) -> Result<Vec<Organization>, GitHubError> {
        debug!("fetching authenticated user");
        let user: AccountResponse = self.send_json(self.request(Method::GET, &["user"])).await?;

        debug!("fetching organizations");
        let orgs: Vec<AccountResponse> = self.get_paginated(&["user", "orgs"], &[]).await?;

        let mut owners = vec![Organization {
            login: user.login,
            id: user.id,
            description: None,
            is_personal: true,
        }];
        owners.extend(orgs.into_iter().map(|org| Organization {
            login: org.login,
            id: org.id,
            description: org.description,
            is_personal: false,
        }));
        Ok(owners)
    }

    #[instrument(skip(self, org), fields(org = %org.login))]
    async fn list_repositories(&self, org: &Organization) -> Result<Vec<Repository>, GitHubError> {
        let repos: Vec<RepositoryResponse> = if org.is_personal {
            self.get_paginated(&["user", "repos"], &[("affiliation", "owner")])
                .await?
        } else {
            self.get_paginated(&["orgs", org.login.as_str(), "repos"], &[])
                .await?
        };
        debug!(count = repos.len(), "fetched repositories");
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, GitHubError> {
        let response: RepositoryResponse = self
            .send_json(self.request(Method::GET, &["repos", owner, repo]))
            .await?;
        Ok(response.into())
    }

    #[instrument(skip(self))]
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, GitHubError> {
        let branches: Vec<BranchResponse> = self
            .get_paginated(&["repos", owner, repo, "branches"], &[])
            .await?;
        debug!(count = branches.len(), "fetched branches");
        Ok(branches
            .into_iter()
            .map(|branch| Branch {
                name: branch.name,
                protected: branch.protected,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<ProtectionConfig>, GitHubError> {
        let response = self
            .request(Method::GET, &["repos", owner, repo, "branches", branch, "protection"])
            .send()
            .await?;
        match check_status(response).await {
            Ok(response) => {
                let raw = response.json::<Value>().await?;
                Ok(Some(normalize(&raw)))
            }
            Err(GitHubError::Api { status, message })
                if status == StatusCode::NOT_FOUND.as_u16()
                    && message.to_lowercase().contains("not protected") =>
            {
                debug!("branch is not protected");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, submission))]
    async fn set_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        submission: &Value,
    ) -> Result<(), GitHubError> {
        let request = self
            .request(Method::PUT, &["repos", owner, repo, "branches", branch, "protection"])
            .json(submission);
        check_status(request.send().await?).await?;
        debug!("protection updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_external_checks(&self, owner: &str, repo: &str) -> Vec<ExternalCheck> {
        let request = self
            .request(Method::GET, &["repos", owner, repo, "actions", "workflows"])
            .query(&[("per_page", PAGE_SIZE)]);
        match self.send_json::<WorkflowsResponse>(request).await {
            Ok(response) => response
                .workflows
                .into_iter()
                .map(|workflow| ExternalCheck {
                    name: workflow.name,
                    path: workflow.path,
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "could not list workflows");
                Vec::new()
            }
        }
    }
}
