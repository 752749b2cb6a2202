//! # github-release-download
//!
//! A CI plugin that downloads files from a GitHub release.
//!
//! ## Overview
//!
//! Given a repository, a release selector and a list of requested files, the
//! plugin picks the release, matches the requested names against the
//! release's assets and streams every match into a local directory. The
//! source archives GitHub builds for each release can be requested with the
//! reserved names `tarball` and `zipball`.
//!
//! ## Release selection
//!
//! - an exact tag, e.g. `v1.2.3`
//! - `latest`, the most recent published release (the default)
//! - `prerelease`, the most recently published prerelease
//!
//! ## Usage
//!
//! ```bash
//! github-release-download --owner octo --name widgets \
//!     --api-key "$GITHUB_TOKEN" --tag v1.2.3 \
//!     --files 'widgets-*.tar.gz,checksums.txt,tarball' --path dist
//! ```
//!
//! Every flag can also be set through its `PLUGIN_*` environment variable.
//! Requested files are shell globs; the run fails, naming the patterns that
//! matched nothing, unless every request resolves.
//!
//! ## GitHub Enterprise
//!
//! Point `--github-url` at the Enterprise host; the API is reached under
//! `/api/v3/`.

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Optional TOML configuration file
pub mod config;

/// Streaming release assets and source archives to disk
pub mod downloader;

/// Error types and error handling utilities
pub mod error;

/// GitHub API access behind the `ReleaseSource` trait
pub mod github;

/// Matching requested file patterns against release assets
pub mod matcher;

/// The end-to-end download run
pub mod plugin;

/// Observer hooks for progress and logging
pub mod progress;

/// Release selection: exact tag, latest, latest prerelease
pub mod resolver;

/// Settings validation and endpoint derivation
pub mod settings;
