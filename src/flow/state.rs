use crate::apply::{ApplyResult, Target};
use crate::github::{Branch, Organization, Repository};
use crate::protection::{ProtectionConfig, ProtectionDiff};
use crate::templates::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Orgs,
    Repos,
    Branches,
    Editor,
    Preview,
    Templates,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Orgs => "orgs",
            Screen::Repos => "repos",
            Screen::Branches => "branches",
            Screen::Editor => "editor",
            Screen::Preview => "preview",
            Screen::Templates => "templates",
        }
    }
}

/// The preview screen doubles as the results screen after an apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewMode {
    #[default]
    Diff,
    Results,
}

/// Everything the workflow has accumulated. Owned by the controller.
#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub preview_mode: PreviewMode,

    pub org: Option<Organization>,
    /// Repositories chosen as targets; the first one drives branch listing.
    pub repos: Vec<Repository>,
    pub branch: Option<String>,
    pub live: Option<ProtectionConfig>,
    pub proposed: Option<ProtectionConfig>,
    pub diff: Option<ProtectionDiff>,
    pub results: Vec<ApplyResult>,
    /// Index into `results` where the latest batch starts.
    pub batch_start: usize,

    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,

    // Listings offered by the selection screens.
    pub organizations: Vec<Organization>,
    pub available_repos: Vec<Repository>,
    pub branches: Vec<Branch>,
    pub templates: Vec<Template>,
    pub templates_return: Screen,
    /// Template chosen before a branch; seeds the editor once one is picked.
    pub pending_template: Option<ProtectionConfig>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Orgs,
            preview_mode: PreviewMode::Diff,
            org: None,
            repos: Vec::new(),
            branch: None,
            live: None,
            proposed: None,
            diff: None,
            results: Vec::new(),
            batch_start: 0,
            loading: false,
            error: None,
            notice: None,
            organizations: Vec::new(),
            available_repos: Vec::new(),
            branches: Vec::new(),
            templates: Vec::new(),
            templates_return: Screen::Orgs,
            pending_template: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new org invalidates every repository-level choice.
    pub fn select_org(&mut self, org: Organization, available_repos: Vec<Repository>) {
        self.org = Some(org);
        self.available_repos = available_repos;
        self.repos.clear();
        self.branches.clear();
        self.clear_branch_scope();
    }

    /// New repositories invalidate the branch and everything derived from it.
    pub fn select_repos(&mut self, repos: Vec<Repository>, branches: Vec<Branch>) {
        self.repos = repos;
        self.branches = branches;
        self.clear_branch_scope();
    }

    /// A new branch brings its own live config and drops the old proposal.
    pub fn select_branch(&mut self, branch: String, live: Option<ProtectionConfig>) {
        self.branch = Some(branch);
        self.live = live;
        self.clear_proposal();
    }

    /// Drop the org and everything below it.
    pub fn clear_org_scope(&mut self) {
        self.org = None;
        self.available_repos.clear();
        self.repos.clear();
        self.branches.clear();
        self.clear_branch_scope();
    }

    /// Drop the repository selection and everything below it.
    pub fn clear_repo_scope(&mut self) {
        self.repos.clear();
        self.branches.clear();
        self.clear_branch_scope();
    }

    /// Drop the branch, its live config, the proposal and results.
    pub fn clear_branch_scope(&mut self) {
        self.branch = None;
        self.live = None;
        self.clear_proposal();
    }

    fn clear_proposal(&mut self) {
        self.proposed = None;
        self.diff = None;
        self.results.clear();
        self.batch_start = 0;
        self.preview_mode = PreviewMode::Diff;
    }

    /// One target per selected repository, all on the selected branch.
    pub fn targets(&self) -> Vec<Target> {
        let Some(branch) = &self.branch else {
            return Vec::new();
        };
        self.repos
            .iter()
            .map(|repo| Target {
                owner: repo.owner.clone(),
                repo: repo.name.clone(),
                branch: branch.clone(),
            })
            .collect()
    }

    pub fn latest_batch(&self) -> &[ApplyResult] {
        &self.results[self.batch_start.min(self.results.len())..]
    }

    pub fn record_batch(&mut self, batch: Vec<ApplyResult>) {
        self.batch_start = self.results.len();
        self.results.extend(batch);
    }
}
