/// An account that owns repositories: an organization, or the
/// authenticated user's personal account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub login: String,
    pub id: u64,
    pub description: Option<String>,
    /// True for the authenticated user's own account.
    pub is_personal: bool,
}

impl Organization {
    /// Placeholder owner for a repository found on disk, before the API
    /// has been asked about it.
    pub fn from_login(login: &str) -> Self {
        Self {
            login: login.to_string(),
            id: 0,
            description: None,
            is_personal: false,
        }
    }
}

/// Caller's access level on a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoPermissions {
    pub admin: bool,
    pub push: bool,
    pub pull: bool,
}

/// Snapshot of a repository as listed by GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
    pub permissions: Option<RepoPermissions>,
}

/// A branch as listed for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub protected: bool,
}

/// A workflow that can be offered as a required status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCheck {
    pub name: String,
    pub path: String,
}

/// Owner/name pair parsed from a git remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}
