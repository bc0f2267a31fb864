use super::{move_index, FocusDirection};
use crate::github::ExternalCheck;
use crate::protection::{ProtectionConfig, StatusChecks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub check: ExternalCheck,
    pub selected: bool,
}

/// Multi-select list of workflows to add as required status checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPicker {
    entries: Vec<PickerEntry>,
    focus: usize,
}

impl WorkflowPicker {
    /// Entries start selected when their name is already a required context.
    pub fn open(checks: &[ExternalCheck], config: &ProtectionConfig) -> Self {
        let required = config
            .status_checks
            .as_ref()
            .map(StatusChecks::contexts)
            .unwrap_or_default();
        let entries = checks
            .iter()
            .map(|check| PickerEntry {
                check: check.clone(),
                selected: required.contains(&check.name),
            })
            .collect();
        Self { entries, focus: 0 }
    }

    pub fn entries(&self) -> &[PickerEntry] {
        &self.entries
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn move_focus(&mut self, direction: FocusDirection, wrapping: bool) {
        self.focus = move_index(self.focus, self.entries.len(), direction, wrapping);
    }

    pub fn toggle_focused(&mut self) {
        if let Some(entry) = self.entries.get_mut(self.focus) {
            entry.selected = !entry.selected;
        }
    }

    /// Append selected names missing from the required contexts, keeping
    /// existing contexts first and the picker's order for new ones.
    pub(crate) fn apply_to(&self, config: &mut ProtectionConfig) {
        let checks = config
            .status_checks
            .get_or_insert_with(|| StatusChecks::new(false, Vec::new()));
        for entry in self.entries.iter().filter(|entry| entry.selected) {
            checks.push_context(entry.check.name.clone());
        }
    }
}
