use serde_json::{json, Value};

use super::{to_submission, ProtectionConfig, Section, Toggle};

/// How deep the preview rendering descends before eliding nested values.
pub const PREVIEW_DEPTH: usize = 4;

/// Keys whose arrays are compared as sets.
const SET_LIKE_KEYS: [&str; 5] = ["contexts", "checks", "users", "teams", "apps"];

/// Delta between a live and a proposed protection config, keyed by
/// top-level field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionDiff {
    pub added: Vec<&'static str>,
    pub removed: Vec<&'static str>,
    pub changed: Vec<&'static str>,
    /// Pretty-printed proposed value, nested values past [`PREVIEW_DEPTH`] elided.
    pub rendered: String,
}

impl ProtectionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare a live config (`None` when the branch is unprotected) against a
/// proposal. A missing proposal yields an empty diff rather than an error.
pub fn compute_diff(
    live: Option<&ProtectionConfig>,
    proposed: Option<&ProtectionConfig>,
) -> ProtectionDiff {
    let Some(proposed) = proposed else {
        return ProtectionDiff {
            rendered: render_value(&Value::Null, PREVIEW_DEPTH),
            ..ProtectionDiff::default()
        };
    };

    let before = live.map(comparable_fields).unwrap_or_default();
    let after = comparable_fields(proposed);
    let lookup = |fields: &[(&'static str, Value)], key: &str| {
        fields
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| value.clone())
    };

    let mut diff = ProtectionDiff::default();
    for (key, value) in &after {
        match lookup(&before, key) {
            None => diff.added.push(*key),
            Some(old) if &old != value => diff.changed.push(*key),
            Some(_) => {}
        }
    }
    for (key, _) in &before {
        if lookup(&after, key).is_none() {
            diff.removed.push(*key);
        }
    }

    diff.rendered = render_value(&to_submission(proposed), PREVIEW_DEPTH);
    diff
}

/// Top-level fields present on a config, in display order, with set-like
/// arrays sorted so that comparison ignores their order. `url` never takes part.
fn comparable_fields(config: &ProtectionConfig) -> Vec<(&'static str, Value)> {
    let submission = to_submission(config);
    let mut fields = Vec::new();

    let keys = Toggle::ALL.iter().map(|toggle| toggle.key()).chain([
        Section::PullRequestReviews.key(),
        Section::StatusChecks.key(),
        Section::Restrictions.key(),
    ]);
    for key in keys {
        match submission.get(key) {
            Some(Value::Null) | None => {}
            Some(value) => fields.push((key, canonical(value))),
        }
    }

    if let Some(enabled) = config.live.required_signatures {
        fields.push(("required_signatures", json!(enabled)));
    }
    if let Some(enabled) = config.live.lock_branch {
        fields.push(("lock_branch", json!(enabled)));
    }
    fields
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let mut inner = canonical(inner);
                    if SET_LIKE_KEYS.contains(&key.as_str()) {
                        if let Value::Array(items) = &mut inner {
                            items.sort_by_key(|item| item.to_string());
                        }
                    }
                    (key.clone(), inner)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// Render a JSON value as indented text. Containers nested deeper than
/// `max_depth` collapse to `[Object]` / `[Array]`.
pub fn render_value(value: &Value, max_depth: usize) -> String {
    let mut out = String::new();
    render_into(&mut out, value, 0, max_depth);
    out
}

fn render_into(out: &mut String, value: &Value, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let closing = "  ".repeat(depth);
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(_) if depth >= max_depth => out.push_str("[Object]"),
        Value::Object(map) => {
            out.push_str("{\n");
            for (key, inner) in map {
                out.push_str(&indent);
                out.push_str(key);
                out.push_str(": ");
                render_into(out, inner, depth + 1, max_depth);
                out.push_str(",\n");
            }
            out.push_str(&closing);
            out.push('}');
        }
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(_) if depth >= max_depth => out.push_str("[Array]"),
        Value::Array(items) if items.iter().all(is_scalar) => {
            let inline: Vec<String> = items.iter().map(Value::to_string).collect();
            out.push_str(&format!("[ {} ]", inline.join(", ")));
        }
        Value::Array(items) => {
            out.push_str("[\n");
            for inner in items {
                out.push_str(&indent);
                render_into(out, inner, depth + 1, max_depth);
                out.push_str(",\n");
            }
            out.push_str(&closing);
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
