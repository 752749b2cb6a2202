use std::path::PathBuf;
use thiserror::Error;

/// Problems with the user supplied settings, detected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no {field} provided")]
    MissingField { field: &'static str },

    #[error("could not parse GitHub link '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("no files specified")]
    NoFilesSpecified,
}

/// Failures reported by the GitHub API or the HTTP transport.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("GitHub API error: {0}")]
    GitHubApi(Box<octocrab::Error>),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("too many redirects while fetching {url}")]
    TooManyRedirects { url: String },
}

impl UpstreamError {
    /// Whether GitHub answered 404 for the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status: 404, .. })
    }
}

impl From<octocrab::Error> for UpstreamError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => UpstreamError::Status {
                status: source.status_code.as_u16(),
                message: source.message,
            },
            other => UpstreamError::GitHubApi(Box::new(other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("error {operation}: {source}")]
    Upstream {
        operation: String,
        #[source]
        source: UpstreamError,
    },

    #[error("release '{tag}' not found in {owner}/{repo}")]
    ReleaseNotFound {
        tag: String,
        owner: String,
        repo: String,
    },

    #[error("could not find latest prerelease in {owner}/{repo}")]
    NoPrereleaseFound { owner: String, repo: String },

    #[error("missing files in download [{}] for release {release_tag}", .missing.join(", "))]
    MissingAssets {
        missing: Vec<String>,
        release_tag: String,
    },

    #[error("error with file matching pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("could not create directory {path}: {source}")]
    PathError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error while downloading {name}: {message}")]
    DownloadFailed { name: String, message: String },
}

impl Error {
    pub(crate) fn upstream(operation: impl Into<String>, source: UpstreamError) -> Self {
        Error::Upstream {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn download_failed(name: impl Into<String>, message: impl ToString) -> Self {
        Error::DownloadFailed {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
