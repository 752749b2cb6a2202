use crate::error::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub const LATEST_TAG: &str = "latest";
pub const PRERELEASE_TAG: &str = "prerelease";

const GITHUB_HOST: &str = "github.com";
const GITHUB_API_BASE: &str = "https://api.github.com/";
const GITHUB_UPLOAD_BASE: &str = "https://uploads.github.com/";

/// Raw settings as collected from flags, environment and the config file.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub github_url: String,
    pub api_key: String,
    pub owner: String,
    pub name: String,
    pub tag: String,
    pub path: PathBuf,
    pub files: Vec<String>,
}

/// Which release a run operates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSelector {
    Exact(String),
    Latest,
    LatestPrerelease,
}

impl ReleaseSelector {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            LATEST_TAG => ReleaseSelector::Latest,
            PRERELEASE_TAG => ReleaseSelector::LatestPrerelease,
            other => ReleaseSelector::Exact(other.to_string()),
        }
    }
}

impl fmt::Display for ReleaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseSelector::Exact(tag) => write!(f, "{tag}"),
            ReleaseSelector::Latest => write!(f, "{LATEST_TAG}"),
            ReleaseSelector::LatestPrerelease => write!(f, "{PRERELEASE_TAG}"),
        }
    }
}

/// REST and upload roots of a GitHub or GitHub Enterprise instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: Url,
    pub upload_base: Url,
}

/// Compute the API roots for a path-stripped GitHub URL.
///
/// github.com keeps the public API hosts; any other host is treated as
/// GitHub Enterprise and resolves `./api/v3/` and `./api/v3/upload/`
/// against the base URL.
pub fn derive_endpoints(base_url: &Url) -> Result<Endpoints, ConfigError> {
    let invalid = |e: url::ParseError| ConfigError::InvalidUrl {
        input: base_url.to_string(),
        reason: e.to_string(),
    };

    if base_url.host_str() == Some(GITHUB_HOST) {
        return Ok(Endpoints {
            api_base: Url::parse(GITHUB_API_BASE).map_err(invalid)?,
            upload_base: Url::parse(GITHUB_UPLOAD_BASE).map_err(invalid)?,
        });
    }

    Ok(Endpoints {
        api_base: base_url.join("./api/v3/").map_err(invalid)?,
        upload_base: base_url.join("./api/v3/upload/").map_err(invalid)?,
    })
}

/// Settings after validation. Immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    github_url: Url,
    endpoints: Endpoints,
    api_key: String,
    owner: String,
    name: String,
    tag: String,
    selector: ReleaseSelector,
    path: PathBuf,
    files: Vec<String>,
}

impl Settings {
    /// Check required fields and normalize the rest. Performs no I/O.
    pub fn validate(self) -> Result<ValidatedSettings, ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingField { field: "api key" });
        }

        if self.owner.is_empty() {
            return Err(ConfigError::MissingField {
                field: "repository owner",
            });
        }

        if self.name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "repository name",
            });
        }

        let mut github_url =
            Url::parse(self.github_url.trim()).map_err(|e| ConfigError::InvalidUrl {
                input: self.github_url.clone(),
                reason: e.to_string(),
            })?;
        // A repository link collapses to its host root
        github_url.set_path("");
        github_url.set_query(None);
        github_url.set_fragment(None);

        if github_url.cannot_be_a_base() || github_url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                input: self.github_url,
                reason: "URL has no host".to_string(),
            });
        }

        let endpoints = derive_endpoints(&github_url)?;

        if self.files.is_empty() {
            return Err(ConfigError::NoFilesSpecified);
        }

        let tag = if self.tag.trim().is_empty() {
            LATEST_TAG.to_string()
        } else {
            self.tag
        };
        let selector = ReleaseSelector::from_tag(&tag);

        Ok(ValidatedSettings {
            github_url,
            endpoints,
            api_key: self.api_key,
            owner: self.owner,
            name: self.name,
            tag,
            selector,
            path: self.path,
            files: self.files,
        })
    }
}

impl ValidatedSettings {
    pub fn github_url(&self) -> &Url {
        &self.github_url
    }

    /// The stripped GitHub URL without its trailing slash, e.g. `https://ci.example.com`.
    pub fn base_url(&self) -> &str {
        self.github_url.as_str().trim_end_matches('/')
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn selector(&self) -> &ReleaseSelector {
        &self.selector
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        Settings {
            github_url: "https://github.com".to_string(),
            api_key: "token".to_string(),
            owner: "octo".to_string(),
            name: "widgets".to_string(),
            tag: "v1.0.0".to_string(),
            path: PathBuf::from("dist"),
            files: vec!["widget.tar.gz".to_string()],
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        let settings = valid_settings().validate().unwrap();
        assert_eq!(settings.owner(), "octo");
        assert_eq!(settings.name(), "widgets");
        assert_eq!(settings.full_name(), "octo/widgets");
        assert_eq!(settings.files(), ["widget.tar.gz".to_string()]);
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let settings = Settings {
            api_key: String::new(),
            ..valid_settings()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigError::MissingField { field: "api key" }
        );
    }

    #[test]
    fn test_rejects_empty_owner() {
        let settings = Settings {
            owner: String::new(),
            ..valid_settings()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigError::MissingField {
                field: "repository owner"
            }
        );
    }

    #[test]
    fn test_rejects_empty_name() {
        let settings = Settings {
            name: String::new(),
            ..valid_settings()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigError::MissingField {
                field: "repository name"
            }
        );
    }

    #[test]
    fn test_rejects_empty_file_list() {
        let settings = Settings {
            files: Vec::new(),
            ..valid_settings()
        };
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigError::NoFilesSpecified
        );
    }

    #[test]
    fn test_rejects_unparsable_url() {
        for input in ["not a url", "://missing-scheme", ""] {
            let settings = Settings {
                github_url: input.to_string(),
                ..valid_settings()
            };
            assert!(
                matches!(
                    settings.validate(),
                    Err(ConfigError::InvalidUrl { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_tag_defaults_to_latest() {
        for tag in ["", "   ", "\t\n"] {
            let settings = Settings {
                tag: tag.to_string(),
                ..valid_settings()
            }
            .validate()
            .unwrap();
            assert_eq!(settings.tag(), "latest");
            assert_eq!(settings.selector(), &ReleaseSelector::Latest);
        }
    }

    #[test]
    fn test_explicit_tags_pass_through() {
        let settings = Settings {
            tag: "prerelease".to_string(),
            ..valid_settings()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.tag(), "prerelease");
        assert_eq!(settings.selector(), &ReleaseSelector::LatestPrerelease);

        let settings = valid_settings().validate().unwrap();
        assert_eq!(settings.tag(), "v1.0.0");
        assert_eq!(
            settings.selector(),
            &ReleaseSelector::Exact("v1.0.0".to_string())
        );
    }

    #[test]
    fn test_repository_link_is_stripped_to_host() {
        let settings = Settings {
            github_url: "https://ci.example.com/org/repo".to_string(),
            ..valid_settings()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.base_url(), "https://ci.example.com");
        assert_eq!(settings.github_url().path(), "/");
    }

    #[test]
    fn test_query_and_fragment_are_dropped() {
        let settings = Settings {
            github_url: "https://ci.example.com/org/repo?tab=readme#top".to_string(),
            ..valid_settings()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.base_url(), "https://ci.example.com");
    }

    #[test]
    fn test_public_github_endpoints() {
        let settings = Settings {
            github_url: "https://github.com/octo/widgets".to_string(),
            ..valid_settings()
        }
        .validate()
        .unwrap();
        assert_eq!(
            settings.endpoints().api_base.as_str(),
            "https://api.github.com/"
        );
        assert_eq!(
            settings.endpoints().upload_base.as_str(),
            "https://uploads.github.com/"
        );
    }

    #[test]
    fn test_enterprise_endpoints() {
        let base = Url::parse("https://ghe.example.com").unwrap();
        let endpoints = derive_endpoints(&base).unwrap();
        assert_eq!(
            endpoints.api_base.as_str(),
            "https://ghe.example.com/api/v3/"
        );
        assert_eq!(
            endpoints.upload_base.as_str(),
            "https://ghe.example.com/api/v3/upload/"
        );
    }

    #[test]
    fn test_selector_display_round_trips_tag() {
        assert_eq!(ReleaseSelector::from_tag("latest").to_string(), "latest");
        assert_eq!(
            ReleaseSelector::from_tag("prerelease").to_string(),
            "prerelease"
        );
        assert_eq!(ReleaseSelector::from_tag("v2.1.0").to_string(), "v2.1.0");
    }
}
