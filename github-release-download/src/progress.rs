//! Observer hooks for a download run.
//!
//! The engine reports what it finds and how far each download got through a
//! [`RunObserver`]; it never writes to the console itself. [`LogObserver`]
//! turns the callbacks into `tracing` events, [`NoopObserver`] drops them.

use crate::github::{Asset, Release};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default gap between two progress lines for the same download.
pub const DRAW_INTERVAL: Duration = Duration::from_secs(5);

/// Summary of one file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub name: String,
    pub path: PathBuf,
    pub bytes_written: u64,
    pub sha256: String,
}

pub trait RunObserver: Send + Sync {
    /// A release was selected.
    fn on_release_found(&self, _release: &Release) {}

    /// An asset was listed while scanning the release.
    fn on_asset_found(&self, _asset: &Asset) {}

    fn on_download_started(&self, _name: &str, _total: Option<u64>) {}

    /// Called for every chunk written; implementors decide how often to render.
    fn on_download_progress(&self, _name: &str, _written: u64, _total: Option<u64>) {}

    fn on_download_complete(&self, _outcome: &DownloadOutcome) {}

    fn on_run_complete(&self, _outcomes: &[DownloadOutcome]) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Limits how often a progress line is drawn, keyed by elapsed time.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_draw: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_draw: None,
        }
    }

    /// Start counting from `now`; the first draw happens one interval later.
    pub fn reset(&mut self, now: Instant) {
        self.last_draw = Some(now);
    }

    pub fn should_draw(&mut self, now: Instant) -> bool {
        match self.last_draw {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_draw = Some(now);
                true
            }
        }
    }
}

/// Renders the run as `tracing` events.
#[derive(Debug)]
pub struct LogObserver {
    throttle: Mutex<ProgressThrottle>,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::with_interval(DRAW_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            throttle: Mutex::new(ProgressThrottle::new(interval)),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn percent(written: u64, total: Option<u64>) -> Option<u64> {
    total
        .filter(|total| *total > 0)
        .map(|total| written.saturating_mul(100) / total)
}

impl RunObserver for LogObserver {
    fn on_release_found(&self, release: &Release) {
        tracing::info!(
            tag = %release.tag_name,
            name = release.name.as_deref().unwrap_or_default(),
            published_at = ?release.published_at,
            "found release"
        );
    }

    fn on_asset_found(&self, asset: &Asset) {
        tracing::debug!(
            name = %asset.name,
            content_type = %asset.content_type,
            created_at = %asset.created_at,
            "found asset"
        );
    }

    fn on_download_started(&self, name: &str, total: Option<u64>) {
        if let Ok(mut throttle) = self.throttle.lock() {
            throttle.reset(Instant::now());
        }
        tracing::info!(name, size = ?total, "downloading asset");
    }

    fn on_download_progress(&self, name: &str, written: u64, total: Option<u64>) {
        let draw = self
            .throttle
            .lock()
            .map(|mut throttle| throttle.should_draw(Instant::now()))
            .unwrap_or(false);
        if !draw {
            return;
        }

        match percent(written, total) {
            Some(percent) => tracing::info!(name, bytes = written, percent, "downloading"),
            None => tracing::info!(name, bytes = written, "downloading"),
        }
    }

    fn on_download_complete(&self, outcome: &DownloadOutcome) {
        tracing::info!(
            name = %outcome.name,
            path = %outcome.path.display(),
            bytes = outcome.bytes_written,
            sha256 = %outcome.sha256,
            "wrote asset"
        );
    }

    fn on_run_complete(&self, outcomes: &[DownloadOutcome]) {
        let bytes: u64 = outcomes.iter().map(|o| o.bytes_written).sum();
        tracing::info!(files = outcomes.len(), bytes, "download complete");
    }
}
