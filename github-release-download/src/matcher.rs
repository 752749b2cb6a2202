use crate::error::{Error, Result};
use crate::github::{Asset, PageCursor, Release, ReleaseSource, PER_PAGE};
use crate::progress::RunObserver;
use crate::settings::ValidatedSettings;
use globset::{GlobBuilder, GlobMatcher};
use url::Url;

/// Source archives GitHub generates for every release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkArchive {
    Tarball,
    Zipball,
}

impl BulkArchive {
    /// Recognizes `tarball` and `zipball`, ignoring case.
    pub fn from_request(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("tarball") {
            Some(BulkArchive::Tarball)
        } else if name.eq_ignore_ascii_case("zipball") {
            Some(BulkArchive::Zipball)
        } else {
            None
        }
    }

    /// Name of the file written to the download directory.
    pub fn file_name(self) -> &'static str {
        match self {
            BulkArchive::Tarball => "release.tar.gz",
            BulkArchive::Zipball => "release.zip",
        }
    }

    pub fn url(self, release: &Release) -> Option<&Url> {
        match self {
            BulkArchive::Tarball => release.tarball_url.as_ref(),
            BulkArchive::Zipball => release.zipball_url.as_ref(),
        }
    }
}

impl std::fmt::Display for BulkArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkArchive::Tarball => write!(f, "tarball"),
            BulkArchive::Zipball => write!(f, "zipball"),
        }
    }
}

/// The requested file list split into asset patterns and source archives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedFiles {
    pub patterns: Vec<String>,
    pub archives: Vec<BulkArchive>,
}

impl RequestedFiles {
    pub fn parse(files: &[String]) -> Self {
        let mut requested = RequestedFiles::default();
        for file in files {
            match BulkArchive::from_request(file) {
                Some(archive) if requested.archives.contains(&archive) => {}
                Some(archive) => requested.archives.push(archive),
                None => requested.patterns.push(file.clone()),
            }
        }
        // Tarball is always written before zipball
        requested.archives.sort_by_key(|archive| *archive as u8);
        requested
    }
}

/// Compile a shell-style glob: `*`, `?` and `[...]`, case-sensitive.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })
}

struct PatternState {
    pattern: String,
    matcher: GlobMatcher,
    resolved: bool,
}

/// Page through the release's assets until every pattern has matched.
///
/// Each pattern resolves to the first asset whose name it matches. Listing
/// stops as soon as all patterns are resolved, so later pages are never
/// requested. Patterns that match nothing are reported by name.
pub async fn match_assets<C>(
    client: &C,
    settings: &ValidatedSettings,
    release: &Release,
    patterns: &[String],
    observer: &dyn RunObserver,
) -> Result<Vec<Asset>>
where
    C: ReleaseSource + ?Sized,
{
    let mut states = patterns
        .iter()
        .map(|pattern| {
            Ok(PatternState {
                pattern: pattern.clone(),
                matcher: compile_pattern(pattern)?,
                resolved: false,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let requested = states.len();
    let mut resolved = 0;
    let mut matched: Vec<Asset> = Vec::new();
    let mut cursor = if requested == 0 {
        PageCursor::Done
    } else {
        PageCursor::first()
    };

    while let Some(page) = cursor.current() {
        tracing::debug!(page, per_page = PER_PAGE, "getting release asset page");

        let assets = client
            .list_release_assets(settings.owner(), settings.name(), release.id, page, PER_PAGE)
            .await
            .map_err(|e| {
                Error::upstream(
                    format!(
                        "getting release {} assets (page {page}, per page {PER_PAGE})",
                        release.tag_name
                    ),
                    e,
                )
            })?;

        for asset in assets.items {
            observer.on_asset_found(&asset);

            let mut hit = false;
            for state in states.iter_mut().filter(|state| !state.resolved) {
                if state.matcher.is_match(&asset.name) {
                    state.resolved = true;
                    resolved += 1;
                    hit = true;
                }
            }

            if hit {
                matched.push(asset);
            }

            if resolved == requested {
                break;
            }
        }

        if resolved == requested {
            tracing::debug!("all assets found");
            break;
        }

        cursor = PageCursor::advance(assets.next);
    }

    if resolved < requested {
        let missing = states
            .into_iter()
            .filter(|state| !state.resolved)
            .map(|state| state.pattern)
            .collect();
        return Err(Error::MissingAssets {
            missing,
            release_tag: release.tag_name.clone(),
        });
    }

    Ok(matched)
}
