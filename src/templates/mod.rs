//! Named, reusable protection configs stored as JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::protection::{normalize, to_submission, ProtectionConfig};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to access template store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode template: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Template file {path} already holds template {existing}")]
    NameCollision { path: PathBuf, existing: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub description: Option<String>,
    /// Set on first save, never changed afterwards.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub protection: ProtectionConfig,
}

/// On-disk shape. `protection` is the submission body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    protection: Value,
}

impl From<TemplateRecord> for Template {
    fn from(record: TemplateRecord) -> Self {
        Template {
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            protection: normalize(&record.protection),
        }
    }
}

/// Persistence for templates. Reads never fail: unreadable entries are
/// reported as absent.
pub trait TemplateStore: Send + Sync {
    /// All readable templates, sorted by name.
    fn list(&self) -> Vec<Template>;

    fn load(&self, name: &str) -> Option<Template>;

    /// Create or overwrite, keeping the original creation time.
    fn save(
        &self,
        name: &str,
        protection: &ProtectionConfig,
        description: Option<&str>,
    ) -> Result<Template, TemplateError>;

    /// Returns whether a template was removed.
    fn delete(&self, name: &str) -> bool;
}

/// Name for a template saved from the editor without prompting.
pub fn generated_name(branch: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", branch.replace('/', "-"), now.format("%Y%m%d-%H%M%S"))
}

/// One pretty-printed JSON file per template in a directory.
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Letters, digits, `-` and `_` are kept as they are; every other byte
    /// is written as `%XX`, so distinct names never share a file.
    fn path_for(&self, name: &str) -> PathBuf {
        let mut stem = String::with_capacity(name.len());
        for byte in name.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                stem.push(char::from(byte));
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{stem}.json"))
    }

    fn read_record(path: &Path) -> Option<TemplateRecord> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "template not readable");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping corrupt template");
                None
            }
        }
    }
}

impl TemplateStore for FileTemplateStore {
    fn list(&self) -> Vec<Template> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %self.dir.display(), error = %err, "template directory not readable");
                return Vec::new();
            }
        };

        let mut templates: Vec<Template> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| Self::read_record(&path))
            .map(Template::from)
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    fn load(&self, name: &str) -> Option<Template> {
        let record = Self::read_record(&self.path_for(name))?;
        // Case-insensitive filesystems can still fold two names together.
        if record.name != name {
            return None;
        }
        Some(record.into())
    }

    fn save(
        &self,
        name: &str,
        protection: &ProtectionConfig,
        description: Option<&str>,
    ) -> Result<Template, TemplateError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let existing = if path.exists() {
            Self::read_record(&path)
        } else {
            None
        };
        if let Some(existing) = existing.as_ref().filter(|record| record.name != name) {
            return Err(TemplateError::NameCollision {
                path,
                existing: existing.name.clone(),
            });
        }

        let now = Utc::now();
        let created_at = existing.map(|record| record.created_at).unwrap_or(now);

        let record = TemplateRecord {
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
            updated_at: now,
            protection: to_submission(protection),
        };

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(&record)?)?;
        fs::rename(&staging, &path)?;
        debug!(name, path = %path.display(), "template saved");

        Ok(record.into())
    }

    fn delete(&self, name: &str) -> bool {
        if self.load(name).is_none() {
            return false;
        }
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => true,
            Err(err) => {
                warn!(name, error = %err, "failed to delete template");
                false
            }
        }
    }
}
