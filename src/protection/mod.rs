pub mod diff;

pub use diff::{compute_diff, ProtectionDiff};

use serde_json::{json, Map, Value};

/// Users, teams and apps named by a protection rule (push restrictions,
/// review dismissal, review bypass).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    pub users: Vec<String>,
    pub teams: Vec<String>,
    pub apps: Vec<String>,
}

/// Pull request review requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestReviews {
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    /// Zero is accepted by GitHub and disables the approval requirement.
    pub required_approving_review_count: u32,
    pub dismissal_restrictions: Option<Allowlist>,
    pub bypass_pull_request_allowances: Option<Allowlist>,
}

impl Default for PullRequestReviews {
    fn default() -> Self {
        Self {
            dismiss_stale_reviews: false,
            require_code_owner_reviews: false,
            required_approving_review_count: 1,
            dismissal_restrictions: None,
            bypass_pull_request_allowances: None,
        }
    }
}

/// A required check pinned to the app that reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    pub context: String,
    pub app_id: Option<i64>,
}

/// Required status checks. Contexts behave as an ordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusChecks {
    pub strict: bool,
    contexts: Vec<String>,
    /// Descriptors reported by the live API; kept in step with `contexts`.
    pub checks: Vec<StatusCheck>,
}

impl StatusChecks {
    pub fn new(strict: bool, contexts: Vec<String>) -> Self {
        let mut checks = Self {
            strict,
            contexts: Vec::new(),
            checks: Vec::new(),
        };
        checks.set_contexts(contexts);
        checks
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    /// Replace the context list, collapsing exact duplicates and keeping
    /// first-seen order. Descriptors for dropped contexts go with them.
    pub fn set_contexts(&mut self, contexts: Vec<String>) {
        self.contexts.clear();
        for context in contexts {
            self.push_context(context);
        }
        let kept = &self.contexts;
        self.checks.retain(|check| kept.contains(&check.context));
    }

    /// Append a context unless it is already required. Returns whether it was added.
    pub fn push_context(&mut self, context: String) -> bool {
        if self.contexts.contains(&context) {
            return false;
        }
        self.contexts.push(context);
        true
    }

    fn to_submission(&self) -> Value {
        let mut body = Map::new();
        body.insert("strict".to_string(), json!(self.strict));
        body.insert("contexts".to_string(), json!(self.contexts));
        if !self.checks.is_empty() {
            let checks: Vec<Value> = self
                .contexts
                .iter()
                .map(|context| {
                    let app_id = self
                        .checks
                        .iter()
                        .find(|check| &check.context == context)
                        .and_then(|check| check.app_id);
                    match app_id {
                        Some(app_id) => json!({ "context": context, "app_id": app_id }),
                        None => json!({ "context": context }),
                    }
                })
                .collect();
            body.insert("checks".to_string(), Value::Array(checks));
        }
        Value::Object(body)
    }
}

/// Fields GitHub reports on a live protection rule that cannot be submitted
/// through the protection update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveFields {
    pub url: Option<String>,
    pub required_signatures: Option<bool>,
    pub lock_branch: Option<bool>,
}

/// The six independent boolean rules of a protection config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    EnforceAdmins,
    RequiredLinearHistory,
    AllowForcePushes,
    AllowDeletions,
    BlockCreations,
    RequiredConversationResolution,
}

impl Toggle {
    pub const ALL: [Toggle; 6] = [
        Toggle::EnforceAdmins,
        Toggle::RequiredLinearHistory,
        Toggle::AllowForcePushes,
        Toggle::AllowDeletions,
        Toggle::BlockCreations,
        Toggle::RequiredConversationResolution,
    ];

    /// Key used by the GitHub API and in the submission shape.
    pub fn key(self) -> &'static str {
        match self {
            Toggle::EnforceAdmins => "enforce_admins",
            Toggle::RequiredLinearHistory => "required_linear_history",
            Toggle::AllowForcePushes => "allow_force_pushes",
            Toggle::AllowDeletions => "allow_deletions",
            Toggle::BlockCreations => "block_creations",
            Toggle::RequiredConversationResolution => "required_conversation_resolution",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Toggle::EnforceAdmins => "Enforce for administrators",
            Toggle::RequiredLinearHistory => "Require linear history",
            Toggle::AllowForcePushes => "Allow force pushes",
            Toggle::AllowDeletions => "Allow deletions",
            Toggle::BlockCreations => "Block creations",
            Toggle::RequiredConversationResolution => "Require conversation resolution",
        }
    }

    /// Value used when a raw record does not carry the flag.
    pub fn default_value(self) -> bool {
        false
    }
}

/// Optional substructures whose presence is their enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    PullRequestReviews,
    StatusChecks,
    Restrictions,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::PullRequestReviews => "required_pull_request_reviews",
            Section::StatusChecks => "required_status_checks",
            Section::Restrictions => "restrictions",
        }
    }
}

/// Branch protection settings, either live (as GitHub enforces them) or
/// proposed (edited locally, never carrying [`LiveFields`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionConfig {
    pub pull_request_reviews: Option<PullRequestReviews>,
    pub status_checks: Option<StatusChecks>,
    pub enforce_admins: bool,
    pub required_linear_history: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
    pub block_creations: bool,
    pub required_conversation_resolution: bool,
    pub restrictions: Option<Allowlist>,
    pub live: LiveFields,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        let mut config = Self {
            pull_request_reviews: None,
            status_checks: None,
            enforce_admins: false,
            required_linear_history: false,
            allow_force_pushes: false,
            allow_deletions: false,
            block_creations: false,
            required_conversation_resolution: false,
            restrictions: None,
            live: LiveFields::default(),
        };
        for toggle in Toggle::ALL {
            config.set_toggle(toggle, toggle.default_value());
        }
        config
    }
}

impl ProtectionConfig {
    pub fn toggle(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::EnforceAdmins => self.enforce_admins,
            Toggle::RequiredLinearHistory => self.required_linear_history,
            Toggle::AllowForcePushes => self.allow_force_pushes,
            Toggle::AllowDeletions => self.allow_deletions,
            Toggle::BlockCreations => self.block_creations,
            Toggle::RequiredConversationResolution => self.required_conversation_resolution,
        }
    }

    pub fn set_toggle(&mut self, toggle: Toggle, value: bool) {
        let slot = match toggle {
            Toggle::EnforceAdmins => &mut self.enforce_admins,
            Toggle::RequiredLinearHistory => &mut self.required_linear_history,
            Toggle::AllowForcePushes => &mut self.allow_force_pushes,
            Toggle::AllowDeletions => &mut self.allow_deletions,
            Toggle::BlockCreations => &mut self.block_creations,
            Toggle::RequiredConversationResolution => &mut self.required_conversation_resolution,
        };
        *slot = value;
    }

    pub fn is_enabled(&self, section: Section) -> bool {
        match section {
            Section::PullRequestReviews => self.pull_request_reviews.is_some(),
            Section::StatusChecks => self.status_checks.is_some(),
            Section::Restrictions => self.restrictions.is_some(),
        }
    }

    /// Enable or disable a substructure. Disabling drops its settings;
    /// enabling an absent one installs the defaults, never earlier values.
    pub fn set_enabled(&mut self, section: Section, enabled: bool) {
        if self.is_enabled(section) == enabled {
            return;
        }
        match (section, enabled) {
            (Section::PullRequestReviews, true) => {
                self.pull_request_reviews = Some(PullRequestReviews::default())
            }
            (Section::PullRequestReviews, false) => self.pull_request_reviews = None,
            (Section::StatusChecks, true) => self.status_checks = Some(StatusChecks::default()),
            (Section::StatusChecks, false) => self.status_checks = None,
            (Section::Restrictions, true) => self.restrictions = Some(Allowlist::default()),
            (Section::Restrictions, false) => self.restrictions = None,
        }
    }

    /// Copy of this config suitable as a proposal: live-only fields removed.
    pub fn without_live_fields(&self) -> ProtectionConfig {
        ProtectionConfig {
            live: LiveFields::default(),
            ..self.clone()
        }
    }
}

/// Build a config from a loosely-typed record: a live API response, a
/// persisted submission, or anything partial in between. Never fails.
pub fn normalize(raw: &Value) -> ProtectionConfig {
    let mut config = ProtectionConfig::default();
    let Some(record) = raw.as_object() else {
        return config;
    };

    for toggle in Toggle::ALL {
        let value = record
            .get(toggle.key())
            .map(coerce_flag)
            .unwrap_or_else(|| toggle.default_value());
        config.set_toggle(toggle, value);
    }

    config.pull_request_reviews = record
        .get(Section::PullRequestReviews.key())
        .and_then(Value::as_object)
        .map(parse_reviews);
    config.status_checks = record
        .get(Section::StatusChecks.key())
        .and_then(Value::as_object)
        .map(parse_status_checks);
    config.restrictions = record
        .get(Section::Restrictions.key())
        .and_then(parse_allowlist);

    config.live = LiveFields {
        url: record.get("url").and_then(Value::as_str).map(str::to_string),
        required_signatures: record.get("required_signatures").map(coerce_flag),
        lock_branch: record.get("lock_branch").map(coerce_flag),
    };

    config
}

/// Request body for the protection update endpoint. Absent substructures
/// are sent as explicit `null` so GitHub removes them.
pub fn to_submission(config: &ProtectionConfig) -> Value {
    let mut body = Map::new();

    for toggle in Toggle::ALL {
        body.insert(toggle.key().to_string(), json!(config.toggle(toggle)));
    }

    let reviews = config
        .pull_request_reviews
        .as_ref()
        .map_or(Value::Null, reviews_submission);
    body.insert(Section::PullRequestReviews.key().to_string(), reviews);

    let status_checks = config
        .status_checks
        .as_ref()
        .map_or(Value::Null, StatusChecks::to_submission);
    body.insert(Section::StatusChecks.key().to_string(), status_checks);

    let restrictions = config
        .restrictions
        .as_ref()
        .map_or(Value::Null, allowlist_submission);
    body.insert(Section::Restrictions.key().to_string(), restrictions);

    Value::Object(body)
}

/// GitHub reports most flags as `{"enabled": bool}`; submissions and
/// templates carry plain booleans. Anything else reads as `false`.
fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Object(map) => map.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

fn flag_in(record: &Map<String, Value>, key: &str) -> bool {
    record.get(key).map(coerce_flag).unwrap_or(false)
}

fn parse_reviews(record: &Map<String, Value>) -> PullRequestReviews {
    let defaults = PullRequestReviews::default();
    PullRequestReviews {
        dismiss_stale_reviews: flag_in(record, "dismiss_stale_reviews"),
        require_code_owner_reviews: flag_in(record, "require_code_owner_reviews"),
        required_approving_review_count: record
            .get("required_approving_review_count")
            .and_then(Value::as_u64)
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(defaults.required_approving_review_count),
        dismissal_restrictions: record
            .get("dismissal_restrictions")
            .and_then(parse_allowlist),
        bypass_pull_request_allowances: record
            .get("bypass_pull_request_allowances")
            .and_then(parse_allowlist),
    }
}

fn parse_status_checks(record: &Map<String, Value>) -> StatusChecks {
    let checks: Vec<StatusCheck> = record
        .get("checks")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let context = entry.get("context")?.as_str()?.to_string();
                    let app_id = entry.get("app_id").and_then(Value::as_i64);
                    Some(StatusCheck { context, app_id })
                })
                .collect()
        })
        .unwrap_or_default();

    let contexts: Vec<String> = match record.get("contexts").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => checks.iter().map(|check| check.context.clone()).collect(),
    };

    let mut status_checks = StatusChecks::new(flag_in(record, "strict"), contexts);
    status_checks.checks = checks;
    let kept = status_checks.contexts.clone();
    status_checks.checks.retain(|check| kept.contains(&check.context));
    status_checks
}

/// Accepts both the live shape (`[{"login": ..}]`, `[{"slug": ..}]`) and
/// the submission shape (plain strings).
fn parse_allowlist(value: &Value) -> Option<Allowlist> {
    let record = value.as_object()?;
    let names = |key: &str, id_field: &str| -> Vec<String> {
        record
            .get(key)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        Value::String(name) => Some(name.clone()),
                        Value::Object(map) => {
                            map.get(id_field).and_then(Value::as_str).map(str::to_string)
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    };
    Some(Allowlist {
        users: names("users", "login"),
        teams: names("teams", "slug"),
        apps: names("apps", "slug"),
    })
}

fn allowlist_submission(allowlist: &Allowlist) -> Value {
    json!({
        "users": allowlist.users,
        "teams": allowlist.teams,
        "apps": allowlist.apps,
    })
}

fn reviews_submission(reviews: &PullRequestReviews) -> Value {
    let mut body = Map::new();
    body.insert(
        "dismiss_stale_reviews".to_string(),
        json!(reviews.dismiss_stale_reviews),
    );
    body.insert(
        "require_code_owner_reviews".to_string(),
        json!(reviews.require_code_owner_reviews),
    );
    body.insert(
        "required_approving_review_count".to_string(),
        json!(reviews.required_approving_review_count),
    );
    if let Some(allowlist) = &reviews.dismissal_restrictions {
        body.insert(
            "dismissal_restrictions".to_string(),
            allowlist_submission(allowlist),
        );
    }
    if let Some(allowlist) = &reviews.bypass_pull_request_allowances {
        body.insert(
            "bypass_pull_request_allowances".to_string(),
            allowlist_submission(allowlist),
        );
    }
    Value::Object(body)
}
