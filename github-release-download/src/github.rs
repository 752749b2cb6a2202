use crate::error::UpstreamError;
use crate::settings::ValidatedSettings;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use octocrab::Octocrab;
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{redirect, Client, StatusCode};
use serde::Serialize;
use url::Url;

/// Page size used for every paginated listing.
pub const PER_PAGE: u8 = 10;

const MAX_REDIRECTS: usize = 10;

pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub full_name: String,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub prerelease: bool,
    pub draft: bool,
    pub tarball_url: Option<Url>,
    pub zipball_url: Option<Url>,
}

impl From<octocrab::models::repos::Release> for Release {
    fn from(release: octocrab::models::repos::Release) -> Self {
        Self {
            id: release.id.0,
            tag_name: release.tag_name,
            name: release.name,
            published_at: release.published_at,
            prerelease: release.prerelease,
            draft: release.draft,
            tarball_url: release.tarball_url,
            zipball_url: release.zipball_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}

impl From<octocrab::models::repos::Asset> for Asset {
    fn from(asset: octocrab::models::repos::Asset) -> Self {
        Self {
            id: asset.id.0,
            name: asset.name,
            content_type: asset.content_type,
            created_at: asset.created_at,
            size: asset.size.max(0) as u64,
        }
    }
}

/// One page of a listing plus the number of the following page, if any.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    fn from_octocrab<S: Into<T>>(page: octocrab::Page<S>, number: u32) -> Self {
        Self::numbered(page.items, number, page.next.is_some())
    }

    /// Page `number`; the following page exists when the server linked one.
    fn numbered<S: Into<T>>(items: Vec<S>, number: u32, has_next: bool) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            next: has_next.then_some(number + 1),
        }
    }
}

/// Position in a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    Page(u32),
    Done,
}

impl PageCursor {
    pub fn first() -> Self {
        PageCursor::Page(1)
    }

    /// The page to request, or `None` once the listing is exhausted.
    pub fn current(self) -> Option<u32> {
        match self {
            PageCursor::Page(number) => Some(number),
            PageCursor::Done => None,
        }
    }

    pub fn advance(next: Option<u32>) -> Self {
        match next {
            Some(number) => PageCursor::Page(number),
            None => PageCursor::Done,
        }
    }
}

/// Result of asking GitHub for an asset's bytes.
pub enum AssetContent {
    /// The API answered with the body itself.
    Stream(ByteStream),
    /// The API answered with a location to fetch the body from.
    Redirect(Url),
}

impl std::fmt::Debug for AssetContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetContent::Stream(_) => f.write_str("Stream(..)"),
            AssetContent::Redirect(url) => f.debug_tuple("Redirect").field(url).finish(),
        }
    }
}

/// Response of a plain GET.
pub struct Fetched {
    pub status: StatusCode,
    pub body: ByteStream,
}

/// The GitHub operations the download engine depends on.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn get_repository(&self, owner: &str, repo: &str)
        -> Result<Repository, UpstreamError>;

    async fn get_latest_release(&self, owner: &str, repo: &str)
        -> Result<Release, UpstreamError>;

    async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Release, UpstreamError>;

    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Release>, UpstreamError>;

    async fn list_release_assets(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Asset>, UpstreamError>;

    async fn download_release_asset(
        &self,
        owner: &str,
        repo: &str,
        asset_id: u64,
    ) -> Result<AssetContent, UpstreamError>;

    async fn get(&self, url: &Url) -> Result<Fetched, UpstreamError>;
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

/// `ReleaseSource` backed by the GitHub REST API.
pub struct GitHubClient {
    octocrab: Octocrab,
    http_client: Client,
    api_base: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(settings: &ValidatedSettings) -> Result<Self> {
        let endpoints = settings.endpoints();

        let octocrab = Octocrab::builder()
            .personal_token(settings.api_key().to_string())
            .base_uri(endpoints.api_base.as_str())?
            .build()?;

        // Redirects are resolved by hand so the asset endpoint can report them
        let http_client = Client::builder()
            .user_agent(concat!("github-release-download/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(std::time::Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;

        tracing::debug!(
            github_url = %settings.github_url(),
            base_url = %endpoints.api_base,
            upload_url = %endpoints.upload_base,
            "connecting to github instance"
        );

        Ok(Self {
            octocrab,
            http_client,
            api_base: endpoints.api_base.clone(),
            token: settings.api_key().to_string(),
        })
    }

    fn api_url(&self, route: &str) -> Result<Url, UpstreamError> {
        self.api_base
            .join(route)
            .map_err(|e| UpstreamError::InvalidUrl {
                url: format!("{}{}", self.api_base, route),
                reason: e.to_string(),
            })
    }

    /// Only the API host gets the token; storage hosts reject or log it.
    fn request(&self, url: &Url) -> reqwest::RequestBuilder {
        let request = self.http_client.get(url.clone());
        if url.host_str() == self.api_base.host_str() {
            request.header(AUTHORIZATION, format!("Bearer {}", self.token))
        } else {
            request
        }
    }
}

fn redirect_target(response: &reqwest::Response) -> Option<Result<Url, UpstreamError>> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?;
    let target = location
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|location| response.url().join(location).map_err(|e| e.to_string()))
        .map_err(|reason| UpstreamError::InvalidUrl {
            url: String::from_utf8_lossy(location.as_bytes()).into_owned(),
            reason,
        });
    Some(target)
}

fn body_stream(response: reqwest::Response) -> ByteStream {
    response
        .bytes_stream()
        .map_err(std::io::Error::other)
        .boxed()
}

async fn status_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    UpstreamError::Status { status, message }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Repository, UpstreamError> {
        let repository = self.octocrab.repos(owner, repo).get().await?;
        Ok(Repository {
            full_name: repository
                .full_name
                .unwrap_or_else(|| format!("{owner}/{repo}")),
            html_url: repository.html_url.map(|url| url.to_string()),
        })
    }

    async fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Release, UpstreamError> {
        let release = self.octocrab.repos(owner, repo).releases().get_latest().await?;
        Ok(release.into())
    }

    async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Release, UpstreamError> {
        let release = self
            .octocrab
            .repos(owner, repo)
            .releases()
            .get_by_tag(tag)
            .await?;
        Ok(release.into())
    }

    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Release>, UpstreamError> {
        let releases = self
            .octocrab
            .repos(owner, repo)
            .releases()
            .list()
            .per_page(per_page)
            .page(page)
            .send()
            .await?;
        Ok(Page::from_octocrab(releases, page))
    }

    async fn list_release_assets(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Asset>, UpstreamError> {
        let route = format!("/repos/{owner}/{repo}/releases/{release_id}/assets");
        let assets: octocrab::Page<octocrab::models::repos::Asset> = self
            .octocrab
            .get(route, Some(&PageParams { per_page, page }))
            .await?;
        Ok(Page::from_octocrab(assets, page))
    }

    async fn download_release_asset(
        &self,
        owner: &str,
        repo: &str,
        asset_id: u64,
    ) -> Result<AssetContent, UpstreamError> {
        let url = self.api_url(&format!("repos/{owner}/{repo}/releases/assets/{asset_id}"))?;
        let response = self
            .request(&url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;

        if let Some(target) = redirect_target(&response) {
            return target.map(AssetContent::Redirect);
        }

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(AssetContent::Stream(body_stream(response)))
    }

    async fn get(&self, url: &Url) -> Result<Fetched, UpstreamError> {
        let mut url = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = self.request(&url).send().await?;
            match redirect_target(&response) {
                Some(target) => url = target?,
                None => {
                    return Ok(Fetched {
                        status: response.status(),
                        body: body_stream(response),
                    })
                }
            }
        }

        Err(UpstreamError::TooManyRedirects {
            url: url.to_string(),
        })
    }
}
