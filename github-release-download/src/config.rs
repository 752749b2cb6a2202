use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Optional TOML defaults. Flags and environment always take precedence.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,

    #[serde(default)]
    pub repo: HashMap<String, RepoConfig>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DefaultConfig {
    pub github_url: Option<String>,
    pub tag: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RepoConfig {
    pub tag: Option<String>,
    pub path: Option<PathBuf>,
    pub files: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load `path`, or the user-level file when `path` does not exist.
    pub fn discover(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::load(&Self::default_path())
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("github-release-download.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/github-release-download.toml"))
    }

    /// Get repository-specific configuration
    pub fn get_repo_config(&self, owner: &str, name: &str) -> Option<&RepoConfig> {
        let key = format!("{owner}/{name}");
        self.repo.get(&key)
    }

    /// Fill settings the command line and environment left unset
    pub fn merge_with_args(&self, args: &mut crate::cli::Args) {
        if let (Some(owner), Some(name)) = (&args.owner, &args.name) {
            if let Some(repo_config) = self.get_repo_config(owner, name) {
                if args.tag.is_none() {
                    args.tag = repo_config.tag.clone();
                }
                if args.path.is_none() {
                    args.path = repo_config.path.clone();
                }
                if args.files.is_empty() {
                    args.files = repo_config.files.clone().unwrap_or_default();
                }
            }
        }

        if args.github_url.is_none() {
            args.github_url = self.default.github_url.clone();
        }
        if args.tag.is_none() {
            args.tag = self.default.tag.clone();
        }
        if args.path.is_none() {
            args.path = self.default.path.clone();
        }
    }
}
