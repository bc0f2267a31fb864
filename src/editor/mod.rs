//! Form model behind the protection editor screen.
//!
//! The editor owns a [`ProtectionConfig`] and the flat list of rows
//! projected from it. Every mutation edits the config first and then
//! re-projects the rows, so the two never drift apart.

pub mod fields;
pub mod picker;

pub use fields::{project_fields, EditableField, FieldKey, FieldValue};
pub use picker::WorkflowPicker;

use tracing::debug;

use crate::github::ExternalCheck;
use crate::protection::{ProtectionConfig, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Next,
    Previous,
}

/// Outcome of activating the focused row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A boolean row was flipped.
    Toggled,
    /// The row takes typed input; carries the current value to pre-fill.
    Edit(String),
    PickerOpened,
    /// The apply row: the form is done, here is the result.
    Apply(ProtectionConfig),
    Ignored,
}

/// Step an index through a list of `len` items.
pub fn move_index(current: usize, len: usize, direction: FocusDirection, wrapping: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    let current = current.min(last);
    match direction {
        FocusDirection::Next if current == last => {
            if wrapping {
                0
            } else {
                last
            }
        }
        FocusDirection::Next => current + 1,
        FocusDirection::Previous if current == 0 => {
            if wrapping {
                last
            } else {
                0
            }
        }
        FocusDirection::Previous => current - 1,
    }
}

#[derive(Debug, Clone)]
pub struct FieldEditor {
    config: ProtectionConfig,
    fields: Vec<EditableField>,
    focus: usize,
    external_checks: Vec<ExternalCheck>,
    picker: Option<WorkflowPicker>,
}

impl Default for FieldEditor {
    fn default() -> Self {
        let mut editor = Self {
            config: ProtectionConfig::default(),
            fields: Vec::new(),
            focus: 0,
            external_checks: Vec::new(),
            picker: None,
        };
        editor.rebuild_fields();
        editor
    }
}

impl FieldEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `config`, or a blank config for an unprotected branch.
    /// Live-only fields are dropped; focus returns to the first row.
    pub fn seed(&mut self, config: Option<&ProtectionConfig>) {
        self.config = config
            .map(ProtectionConfig::without_live_fields)
            .unwrap_or_default();
        self.focus = 0;
        self.picker = None;
        self.rebuild_fields();
    }

    /// Workflows known for the target repository. Changes whether the
    /// picker row is offered.
    pub fn set_external_checks(&mut self, checks: Vec<ExternalCheck>) {
        self.external_checks = checks;
        self.rebuild_fields();
    }

    pub fn external_checks(&self) -> &[ExternalCheck] {
        &self.external_checks
    }

    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    pub fn fields(&self) -> &[EditableField] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_field(&self) -> Option<&EditableField> {
        self.fields.get(self.focus)
    }

    pub fn picker(&self) -> Option<&WorkflowPicker> {
        self.picker.as_ref()
    }

    pub fn picker_mut(&mut self) -> Option<&mut WorkflowPicker> {
        self.picker.as_mut()
    }

    /// Re-project the rows from the config. Focus stays on the same row
    /// when it survives, otherwise the index is clamped.
    pub fn rebuild_fields(&mut self) {
        let previous = self.focused_field().map(|field| field.key);
        self.fields = project_fields(&self.config, !self.external_checks.is_empty());
        self.focus = previous
            .and_then(|key| self.fields.iter().position(|field| field.key == key))
            .unwrap_or_else(|| self.focus.min(self.fields.len().saturating_sub(1)));
    }

    /// Move through every row, the divider included.
    pub fn move_focus(&mut self, direction: FocusDirection, wrapping: bool) {
        self.focus = move_index(self.focus, self.fields.len(), direction, wrapping);
    }

    pub fn activate_focused_field(&mut self) -> Activation {
        let Some(field) = self.focused_field().cloned() else {
            return Activation::Ignored;
        };
        match field.value {
            FieldValue::Boolean(current) => {
                self.set_flag(field.key, !current);
                Activation::Toggled
            }
            FieldValue::Integer(value) => Activation::Edit(value.to_string()),
            FieldValue::Text(text) => Activation::Edit(text),
            FieldValue::WorkflowPicker => {
                if self.open_picker() {
                    Activation::PickerOpened
                } else {
                    Activation::Ignored
                }
            }
            FieldValue::Action => Activation::Apply(self.config.clone()),
            FieldValue::Divider => Activation::Ignored,
        }
    }

    /// Apply typed input to the focused row. Input that does not parse
    /// leaves the config untouched. Returns whether anything changed.
    pub fn edit_focused_field(&mut self, raw: &str) -> bool {
        let Some(key) = self.focused_field().map(|field| field.key) else {
            return false;
        };
        let applied = match key {
            FieldKey::RequiredApprovingReviewCount => {
                match (raw.trim().parse::<u32>(), self.config.pull_request_reviews.as_mut()) {
                    (Ok(count), Some(reviews)) => {
                        reviews.required_approving_review_count = count;
                        true
                    }
                    _ => false,
                }
            }
            FieldKey::StatusCheckContexts => match self.config.status_checks.as_mut() {
                Some(checks) => {
                    checks.set_contexts(parse_context_list(raw));
                    true
                }
                None => false,
            },
            _ => false,
        };
        if applied {
            self.rebuild_fields();
        } else {
            debug!(field = key.as_str(), input = raw, "rejected field input");
        }
        applied
    }

    /// Structural edit: install defaults or drop the substructure, then
    /// re-project since the set of rows changes.
    pub fn set_substructure_enabled(&mut self, section: Section, enabled: bool) {
        self.config.set_enabled(section, enabled);
        if section == Section::StatusChecks && !enabled {
            self.picker = None;
        }
        self.rebuild_fields();
    }

    /// Replace the whole config (template load) keeping the known checks.
    pub fn replace_config(&mut self, config: &ProtectionConfig) {
        self.seed(Some(config));
    }

    /// Returns false when there is nothing to pick from.
    pub fn open_picker(&mut self) -> bool {
        if self.external_checks.is_empty() {
            return false;
        }
        self.picker = Some(WorkflowPicker::open(&self.external_checks, &self.config));
        true
    }

    pub fn confirm_picker(&mut self) {
        if let Some(picker) = self.picker.take() {
            picker.apply_to(&mut self.config);
            self.rebuild_fields();
        }
    }

    pub fn cancel_picker(&mut self) {
        self.picker = None;
    }

    fn set_flag(&mut self, key: FieldKey, value: bool) {
        match key {
            FieldKey::Toggle(toggle) => self.config.set_toggle(toggle, value),
            FieldKey::SectionEnabled(section) => {
                self.set_substructure_enabled(section, value);
                return;
            }
            FieldKey::DismissStaleReviews => {
                if let Some(reviews) = self.config.pull_request_reviews.as_mut() {
                    reviews.dismiss_stale_reviews = value;
                }
            }
            FieldKey::RequireCodeOwnerReviews => {
                if let Some(reviews) = self.config.pull_request_reviews.as_mut() {
                    reviews.require_code_owner_reviews = value;
                }
            }
            FieldKey::StrictStatusChecks => {
                if let Some(checks) = self.config.status_checks.as_mut() {
                    checks.strict = value;
                }
            }
            _ => return,
        }
        self.rebuild_fields();
    }
}

/// Comma-separated check names: trimmed, empties dropped, order kept.
fn parse_context_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
