use crate::error::{Error, Result};
use crate::github::{PageCursor, Release, ReleaseSource, PER_PAGE};
use crate::settings::{ReleaseSelector, ValidatedSettings};

/// Find the release the run operates against.
pub async fn resolve_release<C>(client: &C, settings: &ValidatedSettings) -> Result<Release>
where
    C: ReleaseSource + ?Sized,
{
    let owner = settings.owner();
    let repo = settings.name();
    tracing::info!(tag = settings.tag(), "retrieving release");

    match settings.selector() {
        ReleaseSelector::Latest => {
            tracing::debug!("getting latest release");
            client
                .get_latest_release(owner, repo)
                .await
                .map_err(|e| lookup_error(settings, e))
        }
        ReleaseSelector::Exact(tag) => {
            tracing::debug!(tag = %tag, "getting release by tag");
            client
                .get_release_by_tag(owner, repo, tag)
                .await
                .map_err(|e| lookup_error(settings, e))
        }
        ReleaseSelector::LatestPrerelease => {
            tracing::debug!("getting latest prerelease");
            latest_prerelease(client, owner, repo).await
        }
    }
}

fn lookup_error(settings: &ValidatedSettings, source: crate::error::UpstreamError) -> Error {
    if source.is_not_found() {
        Error::ReleaseNotFound {
            tag: settings.tag().to_string(),
            owner: settings.owner().to_string(),
            repo: settings.name().to_string(),
        }
    } else {
        Error::upstream(
            format!(
                "getting release {} for {}",
                settings.tag(),
                settings.full_name()
            ),
            source,
        )
    }
}

/// Walk every release page and keep the most recently published prerelease.
async fn latest_prerelease<C>(client: &C, owner: &str, repo: &str) -> Result<Release>
where
    C: ReleaseSource + ?Sized,
{
    let mut latest: Option<Release> = None;
    let mut cursor = PageCursor::first();

    while let Some(page) = cursor.current() {
        tracing::debug!(page, per_page = PER_PAGE, "getting release listing page");

        let releases = client
            .list_releases(owner, repo, page, PER_PAGE)
            .await
            .map_err(|e| {
                Error::upstream(
                    format!("listing releases for {owner}/{repo} (page {page}, per page {PER_PAGE})"),
                    e,
                )
            })?;

        for release in releases.items {
            if release.prerelease {
                latest = Some(newer_prerelease(latest, release));
            }
        }

        cursor = PageCursor::advance(releases.next);
    }

    latest.ok_or_else(|| Error::NoPrereleaseFound {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Ties keep the release seen first.
fn newer_prerelease(current: Option<Release>, candidate: Release) -> Release {
    match current {
        Some(current) if candidate.published_at <= current.published_at => current,
        _ => candidate,
    }
}
