use crate::downloader::{self, DownloadTarget};
use crate::error::{Error, Result};
use crate::github::{GitHubClient, ReleaseSource};
use crate::matcher::{self, RequestedFiles};
use crate::progress::{DownloadOutcome, LogObserver, RunObserver};
use crate::resolver;
use crate::settings::ValidatedSettings;

/// One download run against a single release.
pub struct Plugin<C> {
    settings: ValidatedSettings,
    client: C,
    observer: Box<dyn RunObserver>,
}

impl Plugin<GitHubClient> {
    /// Build a plugin talking to the GitHub instance named in `settings`.
    pub fn new(settings: ValidatedSettings) -> anyhow::Result<Self> {
        let client = GitHubClient::new(&settings)?;
        Ok(Self::with_client(settings, client, Box::new(LogObserver::new())))
    }
}

impl<C: ReleaseSource> Plugin<C> {
    pub fn with_client(
        settings: ValidatedSettings,
        client: C,
        observer: Box<dyn RunObserver>,
    ) -> Self {
        Self {
            settings,
            client,
            observer,
        }
    }

    pub fn settings(&self) -> &ValidatedSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Resolve the release, match the requested files and download them.
    ///
    /// Stops at the first failure; nothing is retried.
    pub async fn run(&self) -> Result<Vec<DownloadOutcome>> {
        let settings = &self.settings;
        let observer = self.observer.as_ref();

        let repository = self
            .client
            .get_repository(settings.owner(), settings.name())
            .await
            .map_err(|e| {
                Error::upstream(format!("getting repository {}", settings.full_name()), e)
            })?;
        tracing::info!(
            fullname = %repository.full_name,
            html_url = repository.html_url.as_deref().unwrap_or_default(),
            "found repository"
        );

        let release = resolver::resolve_release(&self.client, settings).await?;
        observer.on_release_found(&release);

        let requested = RequestedFiles::parse(settings.files());
        let assets = matcher::match_assets(
            &self.client,
            settings,
            &release,
            &requested.patterns,
            observer,
        )
        .await?;

        let directory = downloader::prepare_directory(settings.path()).await?;
        tracing::info!(path = %directory.display(), "downloading assets to");

        let targets = assets
            .into_iter()
            .map(DownloadTarget::Asset)
            .chain(requested.archives.into_iter().map(DownloadTarget::Archive));

        let mut outcomes = Vec::new();
        for target in targets {
            let outcome = downloader::download(
                &self.client,
                settings,
                &release,
                &target,
                &directory,
                observer,
            )
            .await?;
            outcomes.push(outcome);
        }

        observer.on_run_complete(&outcomes);
        Ok(outcomes)
    }
}
