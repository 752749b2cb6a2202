use crate::error::{Error, Result};
use crate::github::{Asset, AssetContent, ByteStream, Release, ReleaseSource};
use crate::matcher::BulkArchive;
use crate::progress::{DownloadOutcome, RunObserver};
use crate::settings::ValidatedSettings;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Something to write into the download directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    Asset(Asset),
    Archive(BulkArchive),
}

impl DownloadTarget {
    /// File name inside the download directory.
    pub fn file_name(&self) -> &str {
        match self {
            DownloadTarget::Asset(asset) => &asset.name,
            DownloadTarget::Archive(archive) => archive.file_name(),
        }
    }

    fn size(&self) -> Option<u64> {
        match self {
            DownloadTarget::Asset(asset) => Some(asset.size),
            DownloadTarget::Archive(_) => None,
        }
    }
}

/// Make `path` absolute and create it, including missing parents.
pub async fn prepare_directory(path: &Path) -> Result<PathBuf> {
    let path_error = |source| Error::PathError {
        path: path.to_path_buf(),
        source,
    };

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(path_error)?.join(path)
    };

    tokio::fs::create_dir_all(&absolute)
        .await
        .map_err(path_error)?;

    Ok(absolute)
}

/// Download one target into `directory`, overwriting any existing file.
pub async fn download<C>(
    client: &C,
    settings: &ValidatedSettings,
    release: &Release,
    target: &DownloadTarget,
    directory: &Path,
    observer: &dyn RunObserver,
) -> Result<DownloadOutcome>
where
    C: ReleaseSource + ?Sized,
{
    let stream = match target {
        DownloadTarget::Asset(asset) => open_asset(client, settings, asset).await?,
        DownloadTarget::Archive(archive) => open_archive(client, release, *archive).await?,
    };

    let path = directory.join(target.file_name());
    write_stream(stream, target.file_name(), &path, target.size(), observer).await
}

async fn open_asset<C>(client: &C, settings: &ValidatedSettings, asset: &Asset) -> Result<ByteStream>
where
    C: ReleaseSource + ?Sized,
{
    let content = client
        .download_release_asset(settings.owner(), settings.name(), asset.id)
        .await
        .map_err(|e| Error::download_failed(&asset.name, e))?;

    match content {
        AssetContent::Stream(stream) => Ok(stream),
        AssetContent::Redirect(location) => {
            tracing::debug!(name = %asset.name, url = %location, "following asset redirect");
            let fetched = client.get(&location).await.map_err(|e| {
                Error::download_failed(&asset.name, format!("request to {location} failed: {e}"))
            })?;
            if !fetched.status.is_success() {
                return Err(Error::download_failed(
                    &asset.name,
                    format!("request to {location} failed, status {}", fetched.status),
                ));
            }
            Ok(fetched.body)
        }
    }
}

async fn open_archive<C>(client: &C, release: &Release, archive: BulkArchive) -> Result<ByteStream>
where
    C: ReleaseSource + ?Sized,
{
    let url = archive.url(release).ok_or_else(|| {
        Error::download_failed(
            archive.to_string(),
            format!("release {} has no {archive} URL", release.tag_name),
        )
    })?;

    tracing::info!(name = archive.file_name(), url = %url, "downloading asset");

    let fetched = client
        .get(url)
        .await
        .map_err(|e| Error::download_failed(archive.to_string(), format!("request to {url} failed: {e}")))?;

    if !fetched.status.is_success() {
        return Err(Error::download_failed(
            archive.to_string(),
            format!(
                "request for {url} failed, status {}",
                fetched.status.canonical_reason().unwrap_or(fetched.status.as_str())
            ),
        ));
    }

    Ok(fetched.body)
}

/// Copy `stream` into a fresh file at `path` and report what landed on disk.
pub async fn write_stream(
    mut stream: ByteStream,
    name: &str,
    path: &Path,
    total: Option<u64>,
    observer: &dyn RunObserver,
) -> Result<DownloadOutcome> {
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        Error::download_failed(name, format!("error creating file at {}: {e}", path.display()))
    })?;

    observer.on_download_started(name, total);

    let mut hasher = Sha256::new();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::download_failed(name, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::download_failed(name, format!("error writing {}: {e}", path.display())))?;
        hasher.update(&chunk);
        written += chunk.len() as u64;
        observer.on_download_progress(name, written, total);
    }

    file.flush()
        .await
        .map_err(|e| Error::download_failed(name, format!("error writing {}: {e}", path.display())))?;

    let metadata = file.metadata().await.map_err(|e| {
        Error::download_failed(
            name,
            format!("error when getting file information for {}: {e}", path.display()),
        )
    })?;

    let outcome = DownloadOutcome {
        name: name.to_string(),
        path: path.to_path_buf(),
        bytes_written: metadata.len(),
        sha256: hex::encode(hasher.finalize()),
    };
    observer.on_download_complete(&outcome);

    Ok(outcome)
}
