//! In-memory GitHub collaborator shared by controller and UI tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Branch, ExternalCheck, GitHubApi, GitHubError, Organization, Repository};
use crate::protection::ProtectionConfig;

/// Serves fixed listings for `acme`, records branch lookups and applied
/// submissions, and fails where told to.
#[derive(Default)]
pub struct FakeGitHub {
    pub live: Option<ProtectionConfig>,
    pub fail_organizations: bool,
    pub fail_repositories: bool,
    pub fail_branches: bool,
    pub fail_protection: bool,
    pub fail_repository: bool,
    pub failing_repos: Vec<&'static str>,
    pub branch_lookups: Mutex<Vec<String>>,
    pub applied: Mutex<Vec<(String, String, Value)>>,
}

pub fn repo(name: &str) -> Repository {
    Repository {
        owner: "acme".to_string(),
        name: name.to_string(),
        full_name: format!("acme/{name}"),
        private: false,
        default_branch: "main".to_string(),
        permissions: None,
    }
}

fn api_error(status: u16) -> GitHubError {
    GitHubError::Api {
        status,
        message: "Server Error".to_string(),
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_organizations(&self) -> Result<Vec<Organization>, GitHubError> {
        if self.fail_organizations {
            return Err(api_error(502));
        }
        Ok(vec![Organization::from_login("acme")])
    }

    async fn list_repositories(&self, _org: &Organization) -> Result<Vec<Repository>, GitHubError> {
        if self.fail_repositories {
            return Err(api_error(500));
        }
        Ok(vec![repo("api"), repo("web")])
    }

    async fn get_repository(&self, _owner: &str, name: &str) -> Result<Repository, GitHubError> {
        if self.fail_repository {
            return Err(api_error(404));
        }
        Ok(repo(name))
    }

    async fn list_branches(&self, owner: &str, name: &str) -> Result<Vec<Branch>, GitHubError> {
        self.branch_lookups
            .lock()
            .unwrap()
            .push(format!("{owner}/{name}"));
        if self.fail_branches {
            return Err(api_error(500));
        }
        Ok(vec![
            Branch {
                name: "main".to_string(),
                protected: true,
            },
            Branch {
                name: "develop".to_string(),
                protected: false,
            },
        ])
    }

    async fn get_protection(
        &self,
        _owner: &str,
        _repo: &str,
        _branch: &str,
    ) -> Result<Option<ProtectionConfig>, GitHubError> {
        if self.fail_protection {
            return Err(api_error(500));
        }
        Ok(self.live.clone())
    }

    async fn set_protection(
        &self,
        _owner: &str,
        repo: &str,
        branch: &str,
        submission: &Value,
    ) -> Result<(), GitHubError> {
        if self.failing_repos.contains(&repo) {
            return Err(api_error(422));
        }
        self.applied
            .lock()
            .unwrap()
            .push((repo.to_string(), branch.to_string(), submission.clone()));
        Ok(())
    }

    async fn list_external_checks(&self, _owner: &str, _repo: &str) -> Vec<ExternalCheck> {
        vec![ExternalCheck {
            name: "ci/test".to_string(),
            path: ".github/workflows/test.yml".to_string(),
        }]
    }
}
