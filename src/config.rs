use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = ".branch-guard.toml";
const DEFAULT_API_URL: &str = "https://api.github.com";
const APP_DIR: &str = "branch-guard";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .branch-guard.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN, then GH_TOKEN.
    pub token: Option<String>,
    /// API root, for GitHub Enterprise Server.
    pub api_url: Option<String>,
}

impl GitHubConfig {
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding one JSON file per template.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// Whether moving past the last field jumps back to the first.
    #[serde(default = "default_wrap_focus")]
    pub wrap_focus: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            wrap_focus: default_wrap_focus(),
        }
    }
}

fn default_wrap_focus() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from .branch-guard.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            config.github.token = token_from_env();
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// then GITHUB_TOKEN, then GH_TOKEN.
    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone().or_else(token_from_env)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.templates.dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("templates")
        })
    }

    pub fn log_file(&self) -> PathBuf {
        self.log.file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("branch-guard.log")
        })
    }
}

fn token_from_env() -> Option<String> {
    std::env::var("GITHUB_TOKEN")
        .or_else(|_| std::env::var("GH_TOKEN"))
        .ok()
        .filter(|token| !token.is_empty())
}
