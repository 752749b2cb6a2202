use crate::settings::Settings;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

const DEFAULT_GITHUB_URL: &str = "https://github.com";

/// Checked, in order, when `--github-url` and `PLUGIN_GITHUB_URL` are unset.
const GITHUB_URL_FALLBACK_ENV: &[&str] = &["DRONE_REPO_LINK"];

/// Checked, in order, when `--api-key` and `PLUGIN_API_KEY` are unset.
const API_KEY_FALLBACK_ENV: &[&str] = &["GITHUB_RELEASE_DOWNLOAD_API_KEY", "GITHUB_TOKEN"];

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "github-release-download",
    version,
    about = "Download files from a GitHub release",
    long_about = None
)]
pub struct Args {
    /// GitHub or GitHub Enterprise URL; any path is ignored
    /// Defaults to the current repository link (DRONE_REPO_LINK)
    #[clap(long, env = "PLUGIN_GITHUB_URL")]
    pub github_url: Option<String>,

    /// API key to access the GitHub API
    #[clap(long, env = "PLUGIN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Repository owner
    #[clap(long, env = "PLUGIN_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[clap(long, env = "PLUGIN_NAME")]
    pub name: Option<String>,

    /// Release tag, `latest`, or `prerelease`
    #[clap(long, env = "PLUGIN_TAG")]
    pub tag: Option<String>,

    /// Directory to place downloaded files in
    #[clap(long, env = "PLUGIN_PATH")]
    pub path: Option<PathBuf>,

    /// Files to download (comma-separated names or glob patterns)
    /// `tarball` and `zipball` fetch the release source archives
    #[clap(long, env = "PLUGIN_FILES", value_delimiter = ',')]
    pub files: Vec<String>,

    /// Configuration file path
    #[clap(
        long,
        env = "PLUGIN_CONFIG",
        default_value = ".config/github-release-download.toml"
    )]
    pub config: PathBuf,

    /// Logging level, overridden by RUST_LOG
    #[clap(long, env = "PLUGIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Fill `--github-url` and `--api-key` from their fallback variables in
    /// the process environment. Run this before merging the config file so
    /// environment values win over file defaults.
    pub fn apply_env_fallbacks(&mut self) {
        self.apply_env_fallbacks_with(|key| std::env::var(key).ok());
    }

    /// Same as [`Args::apply_env_fallbacks`] with `env` standing in for the
    /// process environment.
    pub fn apply_env_fallbacks_with<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_env = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| env(*key))
                .find(|value| !value.is_empty())
        };

        if self.github_url.is_none() {
            self.github_url = first_env(GITHUB_URL_FALLBACK_ENV);
        }
        if self.api_key.is_none() {
            self.api_key = first_env(API_KEY_FALLBACK_ENV);
        }
    }

    /// The requested log level, or `None` when it is not a level name.
    pub fn tracing_level(&self) -> Option<Level> {
        self.log_level.trim().parse().ok()
    }

    /// Build settings from whatever is still set, applying built-in defaults.
    pub fn into_settings(self) -> Settings {
        let files = self
            .files
            .into_iter()
            .map(|file| file.trim().to_string())
            .filter(|file| !file.is_empty())
            .collect();

        Settings {
            github_url: self
                .github_url
                .unwrap_or_else(|| DEFAULT_GITHUB_URL.to_string()),
            api_key: self.api_key.unwrap_or_default(),
            owner: self.owner.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            tag: self.tag.unwrap_or_default(),
            path: self.path.unwrap_or_else(|| PathBuf::from(".")),
            files,
        }
    }
}

#[cfg(test)]
impl Args {
    /// Arguments with nothing set, independent of `PLUGIN_*` variables.
    pub(crate) fn unset() -> Self {
        Self {
            github_url: None,
            api_key: None,
            owner: None,
            name: None,
            tag: None,
            path: None,
            files: Vec::new(),
            config: PathBuf::from(".config/github-release-download.toml"),
            log_level: "info".to_string(),
        }
    }
}
