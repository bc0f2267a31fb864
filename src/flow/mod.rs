//! Screen sequencing for the protection workflow.
//!
//! Every operator action is a synchronous transition on [`Controller`]. A
//! transition that needs GitHub returns an [`Effect`] and leaves the
//! controller in its loading state; the caller drives the effect with
//! [`Controller::run`], which records the outcome and may hand back a
//! follow-up effect. Only one effect is ever in flight.

pub mod state;

pub use state::{AppState, PreviewMode, Screen};

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::apply::{apply_all, ApplyResult, ApplySummary, GitHubApplier};
use crate::editor::{Activation, FieldEditor};
use crate::github::{GitHubApi, GitHubError, Organization, RepoRef, Repository};
use crate::protection::compute_diff;
use crate::templates::{generated_name, TemplateStore};

/// Pending I/O requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadOrganizations,
    OpenLocalRepository(RepoRef),
    LoadRepositories(Organization),
    LoadBranches(Vec<Repository>),
    LoadProtection(String),
    ApplyAll,
}

/// How the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartMode {
    Browse,
    /// Local-repository shortcut with the detection result.
    Local(Option<RepoRef>),
}

pub struct Controller {
    github: Arc<dyn GitHubApi>,
    templates: Arc<dyn TemplateStore>,
    state: AppState,
    editor: FieldEditor,
    session_results: Vec<ApplyResult>,
}

impl Controller {
    pub fn new(github: Arc<dyn GitHubApi>, templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            github,
            templates,
            state: AppState::new(),
            editor: FieldEditor::new(),
            session_results: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn editor(&self) -> &FieldEditor {
        &self.editor
    }

    /// Direct access for in-screen edits (focus, typed input, picker).
    pub fn editor_mut(&mut self) -> &mut FieldEditor {
        &mut self.editor
    }

    /// Every result recorded since startup, across branch and org changes.
    pub fn session_results(&self) -> &[ApplyResult] {
        &self.session_results
    }

    pub fn start(&mut self, mode: StartMode) -> Effect {
        match mode {
            StartMode::Browse => {
                self.state.screen = Screen::Orgs;
                self.begin(Effect::LoadOrganizations)
            }
            StartMode::Local(Some(repo)) => {
                info!(owner = %repo.owner, repo = %repo.repo, "starting from local repository");
                self.begin(Effect::OpenLocalRepository(repo))
            }
            StartMode::Local(None) => {
                info!("no local repository detected");
                self.state.screen = Screen::Orgs;
                self.state.error =
                    Some("No GitHub repository detected in the working directory".to_string());
                self.begin(Effect::LoadOrganizations)
            }
        }
    }

    pub fn choose_org(&mut self, org: Organization) -> Option<Effect> {
        if !self.accepts_input(Screen::Orgs) {
            return None;
        }
        Some(self.begin(Effect::LoadRepositories(org)))
    }

    /// The first repository drives the branch listing; every one becomes a target.
    pub fn choose_repos(&mut self, repos: Vec<Repository>) -> Option<Effect> {
        if !self.accepts_input(Screen::Repos) {
            return None;
        }
        if repos.is_empty() {
            self.state.error = Some("Select at least one repository".to_string());
            return None;
        }
        Some(self.begin(Effect::LoadBranches(repos)))
    }

    pub fn choose_branch(&mut self, branch: &str) -> Option<Effect> {
        if !self.accepts_input(Screen::Branches) || self.state.repos.is_empty() {
            return None;
        }
        Some(self.begin(Effect::LoadProtection(branch.to_string())))
    }

    /// Activate the focused editor row; the apply row confirms the editor.
    pub fn activate_editor_field(&mut self) -> Activation {
        if !self.accepts_input(Screen::Editor) {
            return Activation::Ignored;
        }
        let activation = self.editor.activate_focused_field();
        if matches!(activation, Activation::Apply(_)) {
            self.confirm_editor();
        }
        activation
    }

    /// Take the editor's config as the proposal and diff it against live.
    pub fn confirm_editor(&mut self) {
        if !self.accepts_input(Screen::Editor) {
            return;
        }
        let proposed = self.editor.config().clone();
        let diff = compute_diff(self.state.live.as_ref(), Some(&proposed));
        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "previewing proposal"
        );
        self.state.proposed = Some(proposed);
        self.state.diff = Some(diff);
        self.state.preview_mode = PreviewMode::Diff;
        self.go_to(Screen::Preview);
    }

    /// Diff mode: apply to every target. Results mode: back to the editor.
    pub fn confirm_preview(&mut self) -> Option<Effect> {
        if !self.accepts_input(Screen::Preview) {
            return None;
        }
        match self.state.preview_mode {
            PreviewMode::Diff => {
                if self.state.repos.is_empty() || self.state.branch.is_none() {
                    self.state.error =
                        Some("Choose repositories and a branch before applying".to_string());
                    return None;
                }
                Some(self.begin(Effect::ApplyAll))
            }
            PreviewMode::Results => {
                self.state.preview_mode = PreviewMode::Diff;
                self.state.diff = None;
                self.go_to(Screen::Editor);
                None
            }
        }
    }

    /// Step back one screen, dropping whatever was scoped below it. Returns
    /// a fetch when the screen being returned to has nothing to show.
    pub fn back(&mut self) -> Option<Effect> {
        if self.state.loading {
            return None;
        }
        self.state.error = None;
        self.state.notice = None;
        match self.state.screen {
            Screen::Orgs => None,
            Screen::Repos => {
                self.state.clear_org_scope();
                self.go_to(Screen::Orgs);
                self.state
                    .organizations
                    .is_empty()
                    .then(|| self.begin(Effect::LoadOrganizations))
            }
            Screen::Branches => {
                self.state.clear_repo_scope();
                self.go_to(Screen::Repos);
                let refetch = self.state.available_repos.is_empty();
                match self.state.org.clone() {
                    Some(org) if refetch => Some(self.begin(Effect::LoadRepositories(org))),
                    _ => None,
                }
            }
            Screen::Editor => {
                self.state.clear_branch_scope();
                self.go_to(Screen::Branches);
                if self.state.branches.is_empty() && !self.state.repos.is_empty() {
                    let repos = self.state.repos.clone();
                    Some(self.begin(Effect::LoadBranches(repos)))
                } else {
                    None
                }
            }
            Screen::Preview => {
                self.state.proposed = None;
                self.state.diff = None;
                self.state.preview_mode = PreviewMode::Diff;
                self.go_to(Screen::Editor);
                None
            }
            Screen::Templates => {
                let target = self.state.templates_return;
                self.go_to(target);
                None
            }
        }
    }

    /// Persist the editor's config under a generated name. Stays on the editor.
    pub fn save_template(&mut self) {
        if !self.accepts_input(Screen::Editor) {
            return;
        }
        let branch = self.state.branch.as_deref().unwrap_or("template");
        let name = generated_name(branch, Utc::now());
        let description = self
            .state
            .repos
            .first()
            .map(|repo| format!("Saved from {}@{branch}", repo.full_name));

        match self
            .templates
            .save(&name, self.editor.config(), description.as_deref())
        {
            Ok(template) => {
                info!(name = %template.name, "template saved");
                self.state.notice = Some(format!("Saved template {}", template.name));
            }
            Err(err) => {
                warn!(name = %name, error = %err, "template save failed");
                self.state.error = Some(format!("Could not save template: {err}"));
            }
        }
    }

    /// Open the template list. Offered from the org and repository screens
    /// and from the editor.
    pub fn open_templates(&mut self) {
        if self.state.loading {
            return;
        }
        let from = self.state.screen;
        if !matches!(from, Screen::Orgs | Screen::Repos | Screen::Editor) {
            return;
        }
        self.state.error = None;
        self.state.notice = None;
        self.state.templates = self.templates.list();
        self.state.templates_return = from;
        self.go_to(Screen::Templates);
    }

    /// Replace the editor's config with a template and show the editor.
    /// Without a branch yet, the template also waits to seed the editor
    /// once one is chosen.
    pub fn load_template(&mut self, name: &str) {
        if !self.accepts_input(Screen::Templates) {
            return;
        }
        let Some(template) = self.templates.load(name) else {
            self.state.error = Some(format!("Template {name} is no longer available"));
            self.state.templates = self.templates.list();
            return;
        };

        info!(name = %template.name, "template loaded");
        self.editor.replace_config(&template.protection);
        if self.state.branch.is_none() {
            self.state.pending_template = Some(template.protection);
        }
        self.go_to(Screen::Editor);
    }

    pub fn delete_template(&mut self, name: &str) {
        if !self.accepts_input(Screen::Templates) {
            return;
        }
        if self.templates.delete(name) {
            info!(name, "template deleted");
            self.state.notice = Some(format!("Deleted template {name}"));
        } else {
            self.state.error = Some(format!("Could not delete template {name}"));
        }
        self.state.templates = self.templates.list();
    }

    /// Perform an effect. Failures land in the error slot and leave state
    /// and screen as they were.
    pub async fn run(&mut self, effect: Effect) -> Option<Effect> {
        let next = self.perform(effect).await;
        self.state.loading = false;
        next.map(|effect| self.begin(effect))
    }

    async fn perform(&mut self, effect: Effect) -> Option<Effect> {
        let github = Arc::clone(&self.github);
        match effect {
            Effect::LoadOrganizations => match github.list_organizations().await {
                Ok(orgs) => {
                    self.state.organizations = orgs;
                    None
                }
                Err(err) => {
                    self.fail("Could not load organizations", &err);
                    None
                }
            },

            Effect::OpenLocalRepository(local) => {
                match github.get_repository(&local.owner, &local.repo).await {
                    Ok(repo) => {
                        // The account list tells a personal owner from an org.
                        let owner = match github.list_organizations().await {
                            Ok(orgs) => {
                                let known = orgs.iter().find(|org| org.login == local.owner).cloned();
                                self.state.organizations = orgs;
                                known
                            }
                            Err(err) => {
                                warn!(error = %err, "could not list owners");
                                None
                            }
                        };
                        let owner = owner.unwrap_or_else(|| Organization::from_login(&local.owner));
                        // Listing stays empty so stepping back fetches it.
                        self.state.select_org(owner, Vec::new());
                        Some(Effect::LoadBranches(vec![repo]))
                    }
                    Err(err) => {
                        self.go_to(Screen::Orgs);
                        self.fail(
                            &format!("Could not open {}/{}", local.owner, local.repo),
                            &err,
                        );
                        Some(Effect::LoadOrganizations)
                    }
                }
            }

            Effect::LoadRepositories(org) => match github.list_repositories(&org).await {
                Ok(repos) => {
                    self.state.select_org(org, repos);
                    self.go_to(Screen::Repos);
                    None
                }
                Err(err) => {
                    self.fail(&format!("Could not load repositories for {}", org.login), &err);
                    None
                }
            },

            Effect::LoadBranches(repos) => {
                let first = repos.first()?.clone();
                match github.list_branches(&first.owner, &first.name).await {
                    Ok(branches) => {
                        self.state.select_repos(repos, branches);
                        self.go_to(Screen::Branches);
                    }
                    Err(err) => {
                        self.fail(&format!("Could not load branches for {}", first.full_name), &err);
                    }
                }
                None
            }

            Effect::LoadProtection(branch) => {
                let first = self.state.repos.first()?.clone();
                let live = match github.get_protection(&first.owner, &first.name, &branch).await {
                    Ok(live) => live,
                    Err(err) => {
                        self.fail(&format!("Could not load protection for {branch}"), &err);
                        return None;
                    }
                };
                let checks = github.list_external_checks(&first.owner, &first.name).await;

                self.state.select_branch(branch, live);
                match self.state.pending_template.take() {
                    Some(template) => self.editor.seed(Some(&template)),
                    None => self.editor.seed(self.state.live.as_ref()),
                }
                self.editor.set_external_checks(checks);
                self.go_to(Screen::Editor);
                None
            }

            Effect::ApplyAll => {
                let targets = self.state.targets();
                let proposed = self
                    .state
                    .proposed
                    .clone()
                    .unwrap_or_else(|| self.editor.config().clone());
                let applier = GitHubApplier::new(github.as_ref());
                let results = apply_all(&targets, &proposed, &applier).await;

                self.session_results.extend(results.iter().cloned());
                self.state.record_batch(results);
                let summary = ApplySummary::from_results(self.state.latest_batch());
                if summary.failed > 0 {
                    self.state.notice = Some(format!(
                        "{} of {} updates failed",
                        summary.failed, summary.total
                    ));
                }
                self.state.preview_mode = PreviewMode::Results;
                None
            }
        }
    }

    fn begin(&mut self, effect: Effect) -> Effect {
        self.state.loading = true;
        effect
    }

    /// Input is inert while loading or on another screen. Accepting an
    /// action clears the previous messages.
    fn accepts_input(&mut self, screen: Screen) -> bool {
        if self.state.loading || self.state.screen != screen {
            return false;
        }
        self.state.error = None;
        self.state.notice = None;
        true
    }

    fn go_to(&mut self, screen: Screen) {
        if self.state.screen != screen {
            info!(from = self.state.screen.as_str(), to = screen.as_str(), "screen change");
            self.state.screen = screen;
        }
    }

    fn fail(&mut self, context: &str, err: &GitHubError) {
        warn!(error = %err, "{context}");
        self.state.error = Some(format!("{context}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{FieldKey, FocusDirection};
    use crate::github::fake::{repo, FakeGitHub};
    use crate::protection::{normalize, LiveFields, ProtectionConfig, StatusChecks, Toggle};
    use crate::templates::FileTemplateStore;
    use serde_json::json;

    fn live_config() -> ProtectionConfig {
        normalize(&json!({
            "url": "https://api.github.com/repos/acme/api/branches/main/protection",
            "enforce_admins": { "enabled": false },
            "required_status_checks": { "strict": true, "contexts": ["ci/build"] }
        }))
    }

    fn controller(github: FakeGitHub) -> (Controller, Arc<FakeGitHub>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let github = Arc::new(github);
        let store = Arc::new(FileTemplateStore::new(dir.path()));
        (Controller::new(github.clone(), store), github, dir)
    }

    async fn drive(controller: &mut Controller, effect: Option<Effect>) {
        let mut effect = effect;
        while let Some(current) = effect {
            effect = controller.run(current).await;
        }
    }

    /// Browse to the editor for `repos` on `main`.
    async fn to_editor(controller: &mut Controller, repos: &[&str]) {
        let effect = controller.start(StartMode::Browse);
        drive(controller, Some(effect)).await;
        let effect = controller.choose_org(Organization::from_login("acme"));
        drive(controller, effect).await;
        let effect = controller.choose_repos(repos.iter().map(|name| repo(name)).collect());
        drive(controller, effect).await;
        let effect = controller.choose_branch("main");
        drive(controller, effect).await;
    }

    #[tokio::test]
    async fn test_start_loads_organizations() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        let effect = controller.start(StartMode::Browse);
        assert_eq!(effect, Effect::LoadOrganizations);
        assert!(controller.state().loading);

        assert!(controller.run(effect).await.is_none());
        assert!(!controller.state().loading);
        assert_eq!(controller.state().screen, Screen::Orgs);
        assert_eq!(controller.state().organizations.len(), 1);
    }

    #[tokio::test]
    async fn test_input_is_inert_while_loading() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        let _pending = controller.start(StartMode::Browse);
        assert!(controller
            .choose_org(Organization::from_login("acme"))
            .is_none());
        assert!(controller.back().is_none());
        assert_eq!(controller.state().screen, Screen::Orgs);
    }

    #[tokio::test]
    async fn test_branches_come_from_first_repository_only() {
        let (mut controller, github, _dir) = controller(FakeGitHub::default());
        to_editor(&mut controller, &["web", "api"]).await;
        assert_eq!(*github.branch_lookups.lock().unwrap(), vec!["acme/web"]);
        assert_eq!(controller.state().repos.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_repo_selection_is_rejected() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        let effect = controller.start(StartMode::Browse);
        drive(&mut controller, Some(effect)).await;
        let effect = controller.choose_org(Organization::from_login("acme"));
        drive(&mut controller, effect).await;

        assert!(controller.choose_repos(Vec::new()).is_none());
        assert!(controller.state().error.is_some());
        assert_eq!(controller.state().screen, Screen::Repos);
    }

    #[tokio::test]
    async fn test_branch_choice_seeds_editor_from_live() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            live: Some(live_config()),
            ..Default::default()
        });
        to_editor(&mut controller, &["api"]).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Editor);
        assert_eq!(state.branch.as_deref(), Some("main"));
        assert!(state.live.as_ref().unwrap().live.url.is_some());

        let editor = controller.editor();
        assert_eq!(editor.config().live, LiveFields::default());
        assert_eq!(
            editor.config().status_checks.as_ref().unwrap().contexts(),
            ["ci/build"]
        );
        assert_eq!(editor.external_checks().len(), 1);
    }

    #[tokio::test]
    async fn test_protection_failure_stays_on_branches() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            fail_protection: true,
            ..Default::default()
        });
        to_editor(&mut controller, &["api"]).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Branches);
        assert!(state.branch.is_none());
        assert!(state.error.as_deref().unwrap().contains("main"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_organizations_failure_reports_on_orgs() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            fail_organizations: true,
            ..Default::default()
        });
        let effect = controller.start(StartMode::Browse);
        assert!(controller.run(effect).await.is_none());

        let state = controller.state();
        assert_eq!(state.screen, Screen::Orgs);
        assert!(state.organizations.is_empty());
        assert!(state
            .error
            .as_deref()
            .unwrap()
            .starts_with("Could not load organizations:"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_repositories_failure_leaves_state_unchanged() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            fail_repositories: true,
            ..Default::default()
        });
        let effect = controller.start(StartMode::Browse);
        drive(&mut controller, Some(effect)).await;
        let before = controller.state().clone();

        let effect = controller.choose_org(Organization::from_login("acme"));
        assert!(effect.is_some());
        drive(&mut controller, effect).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Orgs);
        assert_eq!(state.org, before.org);
        assert_eq!(state.organizations, before.organizations);
        assert_eq!(state.available_repos, before.available_repos);
        assert!(state.error.as_deref().unwrap().contains("acme"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_branches_failure_keeps_repository_screen() {
        let (mut controller, github, _dir) = controller(FakeGitHub {
            fail_branches: true,
            ..Default::default()
        });
        let effect = controller.start(StartMode::Browse);
        drive(&mut controller, Some(effect)).await;
        let effect = controller.choose_org(Organization::from_login("acme"));
        drive(&mut controller, effect).await;
        let before = controller.state().clone();

        let effect = controller.choose_repos(vec![repo("api"), repo("web")]);
        drive(&mut controller, effect).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Repos);
        assert_eq!(state.org, before.org);
        assert_eq!(state.available_repos, before.available_repos);
        assert_eq!(state.repos, before.repos);
        assert!(state.branches.is_empty());
        assert!(state.error.as_deref().unwrap().contains("acme/api"));
        assert!(!state.loading);
        assert_eq!(*github.branch_lookups.lock().unwrap(), vec!["acme/api"]);
    }

    #[tokio::test]
    async fn test_preview_apply_and_return_to_editor() {
        let (mut controller, github, _dir) = controller(FakeGitHub {
            live: Some(live_config()),
            failing_repos: vec!["web"],
            ..Default::default()
        });
        to_editor(&mut controller, &["api", "web", "docs"]).await;

        let mut edited = controller.editor().config().clone();
        edited.set_toggle(Toggle::EnforceAdmins, true);
        controller.editor_mut().replace_config(&edited);
        controller.confirm_editor();

        let state = controller.state();
        assert_eq!(state.screen, Screen::Preview);
        assert_eq!(state.diff.as_ref().unwrap().changed, vec!["enforce_admins"]);
        assert!(state.proposed.as_ref().unwrap().enforce_admins);

        let effect = controller.confirm_preview();
        assert_eq!(effect, Some(Effect::ApplyAll));
        drive(&mut controller, effect).await;

        let state = controller.state();
        assert_eq!(state.preview_mode, PreviewMode::Results);
        let outcome: Vec<(&str, bool)> = state
            .latest_batch()
            .iter()
            .map(|r| (r.repo.as_str(), r.success))
            .collect();
        assert_eq!(outcome, vec![("api", true), ("web", false), ("docs", true)]);
        assert!(state.error.is_none());
        assert_eq!(controller.session_results().len(), 3);

        let applied = github.applied.lock().unwrap().clone();
        assert_eq!(applied.len(), 2);
        assert!(applied.iter().all(|(_, branch, _)| branch == "main"));
        assert_eq!(applied[0].2["enforce_admins"], json!(true));

        assert!(controller.confirm_preview().is_none());
        assert_eq!(controller.state().screen, Screen::Editor);
        assert_eq!(controller.state().results.len(), 3);
    }

    #[tokio::test]
    async fn test_apply_guard_without_targets() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        to_editor(&mut controller, &["api"]).await;
        controller.confirm_editor();

        controller.state.repos.clear();
        assert!(controller.confirm_preview().is_none());
        assert!(controller.state().error.is_some());
        assert_eq!(controller.state().preview_mode, PreviewMode::Diff);
    }

    #[tokio::test]
    async fn test_apply_row_confirms_editor() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        to_editor(&mut controller, &["api"]).await;

        while controller.editor().focused_field().map(|f| f.key) != Some(FieldKey::Apply) {
            controller.editor_mut().move_focus(FocusDirection::Next, true);
        }
        let activation = controller.activate_editor_field();
        assert!(matches!(activation, Activation::Apply(_)));
        assert_eq!(controller.state().screen, Screen::Preview);
    }

    #[tokio::test]
    async fn test_back_discards_deeper_state() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            live: Some(live_config()),
            ..Default::default()
        });
        to_editor(&mut controller, &["api"]).await;
        controller.confirm_editor();

        assert!(controller.back().is_none());
        assert_eq!(controller.state().screen, Screen::Editor);
        assert!(controller.state().proposed.is_none());

        assert!(controller.back().is_none());
        let state = controller.state();
        assert_eq!(state.screen, Screen::Branches);
        assert!(state.branch.is_none());
        assert!(state.live.is_none());
        assert_eq!(state.branches.len(), 2);

        assert!(controller.back().is_none());
        assert_eq!(controller.state().screen, Screen::Repos);
        assert!(controller.state().repos.is_empty());

        assert!(controller.back().is_none());
        assert_eq!(controller.state().screen, Screen::Orgs);
        assert!(controller.state().org.is_none());
    }

    #[tokio::test]
    async fn test_local_start_goes_to_branches() {
        let (mut controller, github, _dir) = controller(FakeGitHub::default());
        let effect = controller.start(StartMode::Local(Some(RepoRef {
            owner: "acme".to_string(),
            repo: "api".to_string(),
        })));
        drive(&mut controller, Some(effect)).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Branches);
        assert_eq!(state.org.as_ref().unwrap().login, "acme");
        assert_eq!(state.repos[0].name, "api");
        assert_eq!(*github.branch_lookups.lock().unwrap(), vec!["acme/api"]);

        // The org's listing was never fetched, so stepping back loads it.
        let effect = controller.back();
        assert_eq!(
            effect,
            Some(Effect::LoadRepositories(Organization::from_login("acme")))
        );
    }

    #[tokio::test]
    async fn test_local_detection_failure_falls_back_to_orgs() {
        let (mut controller, _, _dir) = controller(FakeGitHub::default());
        let effect = controller.start(StartMode::Local(None));
        assert_eq!(effect, Effect::LoadOrganizations);
        drive(&mut controller, Some(effect)).await;

        let state = controller.state();
        assert_eq!(state.screen, Screen::Orgs);
        assert!(state.error.is_some());
        assert_eq!(state.organizations.len(), 1);
    }

    #[tokio::test]
    async fn test_local_repository_lookup_failure_falls_back_to_orgs() {
        let (mut controller, _, _dir) = controller(FakeGitHub {
            fail_repository: true,
            ..Default::default()
        });
        let effect = controller.start(StartMode::Local(Some(RepoRef {
            owner: "acme".to_string(),
            repo: "gone".to_string(),
        })));
        let next = controller.run(effect).await;
        assert_eq!(next, Some(Effect::LoadOrganizations));
        assert!(controller.state().loading);
        assert_eq!(controller.state().screen, Screen::Orgs);
        assert!(controller.state().error.as_deref().unwrap().contains("acme/gone"));
    }

    #[tokio::test]
    async fn test_save_template_stays_on_editor() {
        let (mut controller, _, dir) = controller(FakeGitHub::default());
        to_editor(&mut controller, &["api"]).await;
        controller.save_template();

        assert_eq!(controller.state().screen, Screen::Editor);
        assert!(controller.state().notice.is_some());
        let saved = FileTemplateStore::new(dir.path()).list();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].name.starts_with("main-"));
        assert_eq!(saved[0].description.as_deref(), Some("Saved from acme/api@main"));
    }

    #[tokio::test]
    async fn test_template_load_replaces_editor_config() {
        let (mut controller, _, dir) = controller(FakeGitHub::default());
        let mut strict = ProtectionConfig::default();
        strict.status_checks = Some(StatusChecks::new(true, vec!["lint".into()]));
        FileTemplateStore::new(dir.path())
            .save("strict", &strict, None)
            .unwrap();

        to_editor(&mut controller, &["api"]).await;
        controller.open_templates();
        assert_eq!(controller.state().screen, Screen::Templates);
        assert_eq!(controller.state().templates.len(), 1);

        controller.load_template("strict");
        assert_eq!(controller.state().screen, Screen::Editor);
        assert_eq!(controller.editor().config(), &strict);
        assert!(controller.state().pending_template.is_none());
    }

    #[tokio::test]
    async fn test_pending_template_seeds_editor_after_branch_choice() {
        let (mut controller, _, dir) = controller(FakeGitHub {
            live: Some(live_config()),
            ..Default::default()
        });
        let mut admins = ProtectionConfig::default();
        admins.enforce_admins = true;
        FileTemplateStore::new(dir.path())
            .save("admins", &admins, None)
            .unwrap();

        let effect = controller.start(StartMode::Browse);
        drive(&mut controller, Some(effect)).await;
        controller.open_templates();
        assert_eq!(controller.state().templates_return, Screen::Orgs);
        controller.load_template("admins");
        assert!(controller.state().pending_template.is_some());

        // Walk back out of the editor to pick targets.
        controller.back();
        controller.back();
        controller.back();
        assert_eq!(controller.state().screen, Screen::Orgs);

        let effect = controller.choose_org(Organization::from_login("acme"));
        drive(&mut controller, effect).await;
        let effect = controller.choose_repos(vec![repo("api")]);
        drive(&mut controller, effect).await;
        let effect = controller.choose_branch("main");
        drive(&mut controller, effect).await;

        assert_eq!(controller.editor().config(), &admins);
        assert!(controller.state().pending_template.is_none());
        assert!(controller.state().live.is_some());
    }

    #[tokio::test]
    async fn test_missing_and_deleted_templates() {
        let (mut controller, _, dir) = controller(FakeGitHub::default());
        FileTemplateStore::new(dir.path())
            .save("old", &ProtectionConfig::default(), None)
            .unwrap();

        let effect = controller.start(StartMode::Browse);
        drive(&mut controller, Some(effect)).await;
        controller.open_templates();

        controller.load_template("ghost");
        assert_eq!(controller.state().screen, Screen::Templates);
        assert!(controller.state().error.is_some());

        controller.delete_template("old");
        assert!(controller.state().templates.is_empty());

        assert!(controller.back().is_none());
        assert_eq!(controller.state().screen, Screen::Orgs);
    }
}
