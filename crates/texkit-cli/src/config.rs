//! Configuration file support.
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. Project config (./.texkit.toml)
//! 3. User config (~/.texkit.toml)
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".texkit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Defaults for the assemble command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assemble: Option<AssembleConfig>,

    /// Defaults for the doi command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<DoiConfig>,

    /// Defaults for the diff command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibliography_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Check at most this many uncached DOIs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Pause between external checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl AssembleConfig {
    fn overlay(&mut self, other: Self) {
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.bibliography_only.is_some() {
            self.bibliography_only = other.bibliography_only;
        }
        if other.json.is_some() {
            self.json = other.json;
        }
    }
}

impl DoiConfig {
    fn overlay(&mut self, other: Self) {
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.cache_path.is_some() {
            self.cache_path = other.cache_path;
        }
        if other.delay_ms.is_some() {
            self.delay_ms = other.delay_ms;
        }
    }
}

impl DiffConfig {
    fn overlay(&mut self, other: Self) {
        if other.output.is_some() {
            self.output = other.output;
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find and load configuration files.
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = dirs::home_dir()
            .and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME), "user"));
        let project_config = Self::load_optional(Path::new(CONFIG_FILE_NAME), "project");
        (user_config, project_config)
    }

    fn load_optional(path: &Path, scope: &str) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Failed to load {scope} config from {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display(),
                );
                None
            }
        }
    }

    /// Merge configs field by field; project values override user values.
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let mut merged = Self::default();
        for config in [user_config, project_config].into_iter().flatten() {
            if let Some(assemble) = config.assemble {
                merged.assemble.get_or_insert_with(Default::default).overlay(assemble);
            }
            if let Some(doi) = config.doi {
                merged.doi.get_or_insert_with(Default::default).overlay(doi);
            }
            if let Some(diff) = config.diff {
                merged.diff.get_or_insert_with(Default::default).overlay(diff);
            }
        }
        merged
    }
}
