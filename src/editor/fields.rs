use crate::protection::{ProtectionConfig, Section, Toggle};

/// Identity of a row in the editor. Unique within one projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Toggle(Toggle),
    SectionEnabled(Section),
    DismissStaleReviews,
    RequireCodeOwnerReviews,
    RequiredApprovingReviewCount,
    StrictStatusChecks,
    StatusCheckContexts,
    PickWorkflows,
    Divider,
    Apply,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Toggle(toggle) => toggle.key(),
            FieldKey::SectionEnabled(section) => section.key(),
            FieldKey::DismissStaleReviews => "dismiss_stale_reviews",
            FieldKey::RequireCodeOwnerReviews => "require_code_owner_reviews",
            FieldKey::RequiredApprovingReviewCount => "required_approving_review_count",
            FieldKey::StrictStatusChecks => "strict",
            FieldKey::StatusCheckContexts => "contexts",
            FieldKey::PickWorkflows => "pick_workflows",
            FieldKey::Divider => "divider",
            FieldKey::Apply => "apply",
        }
    }
}

/// Row payload. The variant decides how the row is edited or activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Boolean(bool),
    Integer(u32),
    Text(String),
    Action,
    WorkflowPicker,
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableField {
    pub key: FieldKey,
    pub label: &'static str,
    pub value: FieldValue,
    /// Substructure the row belongs to or controls.
    pub parent: Option<Section>,
}

impl EditableField {
    fn new(key: FieldKey, label: &'static str, value: FieldValue, parent: Option<Section>) -> Self {
        Self {
            key,
            label,
            value,
            parent,
        }
    }

    /// Whether activating the row does anything.
    pub fn is_interactive(&self) -> bool {
        !matches!(self.value, FieldValue::Divider)
    }
}

/// Project a config onto the ordered list of editor rows.
///
/// Order: the six toggles, the review block, the status-check block, a
/// divider and the apply action. Navigation and rendering rely on it.
pub fn project_fields(config: &ProtectionConfig, has_external_checks: bool) -> Vec<EditableField> {
    let mut fields: Vec<EditableField> = Toggle::ALL
        .iter()
        .map(|&toggle| {
            EditableField::new(
                FieldKey::Toggle(toggle),
                toggle.label(),
                FieldValue::Boolean(config.toggle(toggle)),
                None,
            )
        })
        .collect();

    let reviews_section = Some(Section::PullRequestReviews);
    fields.push(EditableField::new(
        FieldKey::SectionEnabled(Section::PullRequestReviews),
        "Require pull request reviews",
        FieldValue::Boolean(config.pull_request_reviews.is_some()),
        reviews_section,
    ));
    if let Some(reviews) = &config.pull_request_reviews {
        fields.push(EditableField::new(
            FieldKey::DismissStaleReviews,
            "Dismiss stale reviews",
            FieldValue::Boolean(reviews.dismiss_stale_reviews),
            reviews_section,
        ));
        fields.push(EditableField::new(
            FieldKey::RequireCodeOwnerReviews,
            "Require code owner reviews",
            FieldValue::Boolean(reviews.require_code_owner_reviews),
            reviews_section,
        ));
        fields.push(EditableField::new(
            FieldKey::RequiredApprovingReviewCount,
            "Required approving reviews",
            FieldValue::Integer(reviews.required_approving_review_count),
            reviews_section,
        ));
    }

    let checks_section = Some(Section::StatusChecks);
    fields.push(EditableField::new(
        FieldKey::SectionEnabled(Section::StatusChecks),
        "Require status checks",
        FieldValue::Boolean(config.status_checks.is_some()),
        checks_section,
    ));
    if let Some(checks) = &config.status_checks {
        fields.push(EditableField::new(
            FieldKey::StrictStatusChecks,
            "Require branches to be up to date",
            FieldValue::Boolean(checks.strict),
            checks_section,
        ));
        fields.push(EditableField::new(
            FieldKey::StatusCheckContexts,
            "Required checks",
            FieldValue::Text(checks.contexts().join(", ")),
            checks_section,
        ));
        if has_external_checks {
            fields.push(EditableField::new(
                FieldKey::PickWorkflows,
                "Pick from workflows…",
                FieldValue::WorkflowPicker,
                checks_section,
            ));
        }
    }

    fields.push(EditableField::new(FieldKey::Divider, "", FieldValue::Divider, None));
    fields.push(EditableField::new(
        FieldKey::Apply,
        "Preview changes",
        FieldValue::Action,
        None,
    ));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::StatusChecks;

    fn keys(fields: &[EditableField]) -> Vec<&'static str> {
        fields.iter().map(|field| field.key.as_str()).collect()
    }

    #[test]
    fn test_default_projection_order() {
        let fields = project_fields(&ProtectionConfig::default(), true);
        assert_eq!(
            keys(&fields),
            vec![
                "enforce_admins",
                "required_linear_history",
                "allow_force_pushes",
                "allow_deletions",
                "block_creations",
                "required_conversation_resolution",
                "required_pull_request_reviews",
                "required_status_checks",
                "divider",
                "apply",
            ]
        );
        assert_eq!(fields[6].value, FieldValue::Boolean(false));
        assert_eq!(fields[8].value, FieldValue::Divider);
        assert!(!fields[8].is_interactive());
        assert_eq!(fields[9].value, FieldValue::Action);
        assert!(fields[9].is_interactive());
    }

    #[test]
    fn test_enabled_sections_expand() {
        let mut config = ProtectionConfig::default();
        config.set_enabled(Section::PullRequestReviews, true);
        config.status_checks = Some(StatusChecks::new(true, vec!["a".into(), "b".into()]));

        let fields = project_fields(&config, true);
        let keys = keys(&fields);
        assert_eq!(
            &keys[6..],
            &[
                "required_pull_request_reviews",
                "dismiss_stale_reviews",
                "require_code_owner_reviews",
                "required_approving_review_count",
                "required_status_checks",
                "strict",
                "contexts",
                "pick_workflows",
                "divider",
                "apply",
            ]
        );
        let contexts = fields
            .iter()
            .find(|field| field.key == FieldKey::StatusCheckContexts)
            .unwrap();
        assert_eq!(contexts.value, FieldValue::Text("a, b".to_string()));
        assert_eq!(contexts.parent, Some(Section::StatusChecks));
    }

    #[test]
    fn test_workflow_picker_row_needs_known_checks() {
        let mut config = ProtectionConfig::default();
        config.set_enabled(Section::StatusChecks, true);
        let fields = project_fields(&config, false);
        assert!(fields.iter().all(|field| field.key != FieldKey::PickWorkflows));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let mut config = ProtectionConfig::default();
        config.allow_deletions = true;
        assert_eq!(project_fields(&config, true), project_fields(&config, true));
    }
}
