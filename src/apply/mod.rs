use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use crate::github::GitHubApi;
use crate::protection::{to_submission, ProtectionConfig};

/// One repository branch a proposal is rolled out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl Target {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Outcome for a single target. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub success: bool,
    /// Present only when `success` is false.
    pub error: Option<String>,
}

impl ApplyResult {
    fn succeeded(target: &Target) -> Self {
        Self {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            branch: target.branch.clone(),
            success: true,
            error: None,
        }
    }

    fn failed(target: &Target, message: String) -> Self {
        Self {
            success: false,
            error: Some(message),
            ..Self::succeeded(target)
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Counts derived from a result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ApplySummary {
    pub fn from_results(results: &[ApplyResult]) -> Self {
        let succeeded = results.iter().filter(|result| result.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

/// Writes a proposal to one target.
#[async_trait]
pub trait Applier: Send + Sync {
    async fn apply_one(&self, target: &Target, proposed: &ProtectionConfig) -> Result<(), String>;
}

/// Applies through the GitHub protection endpoint.
pub struct GitHubApplier<'a> {
    github: &'a dyn GitHubApi,
}

impl<'a> GitHubApplier<'a> {
    pub fn new(github: &'a dyn GitHubApi) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Applier for GitHubApplier<'_> {
    async fn apply_one(&self, target: &Target, proposed: &ProtectionConfig) -> Result<(), String> {
        let submission = to_submission(proposed);
        self.github
            .set_protection(&target.owner, &target.repo, &target.branch, &submission)
            .await
            .map_err(|err| err.to_string())
    }
}

/// Apply `proposed` to every target, one at a time and in order.
///
/// A failing target never stops the batch: the returned list has exactly
/// one entry per target, in input order.
pub async fn apply_all(
    targets: &[Target],
    proposed: &ProtectionConfig,
    applier: &dyn Applier,
) -> Vec<ApplyResult> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let span = info_span!("apply", repo = %target.full_name(), branch = %target.branch);
        let outcome = applier.apply_one(target, proposed).instrument(span).await;
        let result = match outcome {
            Ok(()) => {
                info!(repo = %target.full_name(), branch = %target.branch, "protection applied");
                ApplyResult::succeeded(target)
            }
            Err(message) => {
                warn!(repo = %target.full_name(), branch = %target.branch, error = %message, "protection update failed");
                ApplyResult::failed(target, message)
            }
        };
        results.push(result);
    }

    let summary = ApplySummary::from_results(&results);
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch apply finished"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records call order and fails the repositories it is told to.
    struct ScriptedApplier {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApplier {
        fn failing(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Applier for ScriptedApplier {
        async fn apply_one(&self, target: &Target, _proposed: &ProtectionConfig) -> Result<(), String> {
            self.calls.lock().unwrap().push(target.repo.clone());
            if self.failing.contains(&target.repo.as_str()) {
                Err(format!("{} rejected the update", target.repo))
            } else {
                Ok(())
            }
        }
    }

    fn targets(repos: &[&str]) -> Vec<Target> {
        repos
            .iter()
            .map(|repo| Target {
                owner: "acme".to_string(),
                repo: repo.to_string(),
                branch: "main".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_middle_failure_does_not_short_circuit() {
        let applier = ScriptedApplier::failing(vec!["web"]);
        let targets = targets(&["api", "web", "docs"]);
        let results = apply_all(&targets, &ProtectionConfig::default(), &applier).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("web rejected the update"));
        assert!(results[2].success);
        assert!(results[2].error.is_none());
        assert_eq!(*applier.calls.lock().unwrap(), vec!["api", "web", "docs"]);
    }

    #[tokio::test]
    async fn test_results_follow_input_order_and_counts_add_up() {
        let applier = ScriptedApplier::failing(vec!["a", "c", "e"]);
        let targets = targets(&["a", "b", "c", "d", "e"]);
        let results = apply_all(&targets, &ProtectionConfig::default(), &applier).await;

        let repos: Vec<&str> = results.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(repos, vec!["a", "b", "c", "d", "e"]);
        let summary = ApplySummary::from_results(&results);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.succeeded + summary.failed, summary.total);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let applier = ScriptedApplier::failing(vec![]);
        let results = apply_all(&[], &ProtectionConfig::default(), &applier).await;
        assert!(results.is_empty());
        assert_eq!(ApplySummary::from_results(&results), ApplySummary::default());
    }
}
