//! In-memory `ReleaseSource` used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures_util::StreamExt;
use github_release_download::error::UpstreamError;
use github_release_download::github::{
    Asset, AssetContent, ByteStream, Fetched, Page, Release, ReleaseSource, Repository,
};
use github_release_download::settings::{Settings, ValidatedSettings};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use url::Url;

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Repository,
    Latest,
    Tag(String),
    ReleasePage(u32),
    AssetPage(u32),
    Download(u64),
    Get(String),
}

pub enum FakeContent {
    Body(Vec<u8>),
    Redirect(String),
}

#[derive(Default)]
pub struct FakeGitHub {
    pub latest: Option<Release>,
    pub by_tag: HashMap<String, Release>,
    pub release_pages: Vec<Vec<Release>>,
    pub asset_pages: Vec<Vec<Asset>>,
    pub contents: HashMap<u64, FakeContent>,
    pub urls: HashMap<String, (StatusCode, Vec<u8>)>,
    pub failing_release_page: Option<u32>,
    pub missing_repository: bool,
    requests: Mutex<Vec<Request>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release_pages(mut self, pages: Vec<Vec<Release>>) -> Self {
        self.release_pages = pages;
        self
    }

    pub fn with_asset_pages(mut self, pages: Vec<Vec<Asset>>) -> Self {
        self.asset_pages = pages;
        self
    }

    pub fn with_latest(mut self, release: Release) -> Self {
        self.latest = Some(release);
        self
    }

    pub fn with_tag(mut self, release: Release) -> Self {
        self.by_tag.insert(release.tag_name.clone(), release);
        self
    }

    pub fn with_body(mut self, asset_id: u64, body: &[u8]) -> Self {
        self.contents.insert(asset_id, FakeContent::Body(body.to_vec()));
        self
    }

    pub fn with_redirect(mut self, asset_id: u64, url: &str) -> Self {
        self.contents
            .insert(asset_id, FakeContent::Redirect(url.to_string()));
        self
    }

    pub fn with_url(mut self, url: &str, status: StatusCode, body: &[u8]) -> Self {
        self.urls.insert(url.to_string(), (status, body.to_vec()));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn asset_pages_requested(&self) -> Vec<u32> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                Request::AssetPage(page) => Some(page),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }
}

fn not_found() -> UpstreamError {
    UpstreamError::Status {
        status: 404,
        message: "Not Found".to_string(),
    }
}

fn page_of<T: Clone>(pages: &[Vec<T>], page: u32) -> Page<T> {
    let index = (page as usize).saturating_sub(1);
    Page {
        items: pages.get(index).cloned().unwrap_or_default(),
        next: (index + 1 < pages.len()).then_some(page + 1),
    }
}

/// Serve `body` in small chunks so the copy loop runs more than once.
pub fn chunked(body: Vec<u8>) -> ByteStream {
    let chunks: Vec<std::io::Result<Bytes>> = body
        .chunks(4)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    futures_util::stream::iter(chunks).boxed()
}

#[async_trait]
impl ReleaseSource for FakeGitHub {
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, UpstreamError> {
        self.record(Request::Repository);
        if self.missing_repository {
            return Err(not_found());
        }
        Ok(Repository {
            full_name: format!("{owner}/{repo}"),
            html_url: Some(format!("https://github.com/{owner}/{repo}")),
        })
    }

    async fn get_latest_release(&self, _owner: &str, _repo: &str) -> Result<Release, UpstreamError> {
        self.record(Request::Latest);
        self.latest.clone().ok_or_else(not_found)
    }

    async fn get_release_by_tag(
        &self,
        _owner: &str,
        _repo: &str,
        tag: &str,
    ) -> Result<Release, UpstreamError> {
        self.record(Request::Tag(tag.to_string()));
        self.by_tag.get(tag).cloned().ok_or_else(not_found)
    }

    async fn list_releases(
        &self,
        _owner: &str,
        _repo: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Release>, UpstreamError> {
        assert_eq!(per_page, 10);
        self.record(Request::ReleasePage(page));
        if self.failing_release_page == Some(page) {
            return Err(UpstreamError::Status {
                status: 502,
                message: "Bad Gateway".to_string(),
            });
        }
        Ok(page_of(&self.release_pages, page))
    }

    async fn list_release_assets(
        &self,
        _owner: &str,
        _repo: &str,
        _release_id: u64,
        page: u32,
        per_page: u8,
    ) -> Result<Page<Asset>, UpstreamError> {
        assert_eq!(per_page, 10);
        self.record(Request::AssetPage(page));
        Ok(page_of(&self.asset_pages, page))
    }

    async fn download_release_asset(
        &self,
        _owner: &str,
        _repo: &str,
        asset_id: u64,
    ) -> Result<AssetContent, UpstreamError> {
        self.record(Request::Download(asset_id));
        match self.contents.get(&asset_id) {
            Some(FakeContent::Body(body)) => Ok(AssetContent::Stream(chunked(body.clone()))),
            Some(FakeContent::Redirect(url)) => Ok(AssetContent::Redirect(
                Url::parse(url).expect("fake redirect URL"),
            )),
            None => Err(not_found()),
        }
    }

    async fn get(&self, url: &Url) -> Result<Fetched, UpstreamError> {
        self.record(Request::Get(url.to_string()));
        match self.urls.get(url.as_str()) {
            Some((status, body)) => Ok(Fetched {
                status: *status,
                body: chunked(body.clone()),
            }),
            None => Err(not_found()),
        }
    }
}

pub fn release(id: u64, tag: &str) -> Release {
    Release {
        id,
        tag_name: tag.to_string(),
        name: Some(format!("Release {tag}")),
        published_at: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
        prerelease: false,
        draft: false,
        tarball_url: Some(
            Url::parse(&format!("https://api.github.com/repos/octo/widgets/tarball/{tag}")).unwrap(),
        ),
        zipball_url: Some(
            Url::parse(&format!("https://api.github.com/repos/octo/widgets/zipball/{tag}")).unwrap(),
        ),
    }
}

pub fn prerelease(id: u64, tag: &str, year: i32, month: u32, day: u32) -> Release {
    Release {
        prerelease: true,
        published_at: Some(Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()),
        ..release(id, tag)
    }
}

pub fn asset(id: u64, name: &str) -> Asset {
    Asset {
        id,
        name: name.to_string(),
        content_type: "application/octet-stream".to_string(),
        created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        size: 0,
    }
}

/// `count` assets named `asset-<n>.bin`, split into pages of ten.
pub fn asset_pages(count: u64) -> Vec<Vec<Asset>> {
    let assets: Vec<Asset> = (1..=count)
        .map(|id| asset(id, &format!("asset-{id}.bin")))
        .collect();
    assets.chunks(10).map(|page| page.to_vec()).collect()
}

pub fn settings(tag: &str, files: &[&str], path: &Path) -> ValidatedSettings {
    Settings {
        github_url: "https://github.com".to_string(),
        api_key: "token".to_string(),
        owner: "octo".to_string(),
        name: "widgets".to_string(),
        tag: tag.to_string(),
        path: path.to_path_buf(),
        files: files.iter().map(|file| file.to_string()).collect(),
    }
    .validate()
    .expect("test settings are valid")
}
