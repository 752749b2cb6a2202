use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use github_release_download::cli::Args;
use github_release_download::config::Config;
use github_release_download::plugin::Plugin;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();

    let level = args.tracing_level();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default()
            .add_directive(LevelFilter::from_level(level.unwrap_or(Level::INFO)).into())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if level.is_none() {
        tracing::warn!(log_level = %args.log_level, "invalid log level, using info");
    }

    // Environment fallbacks go first so the config file only fills gaps
    args.apply_env_fallbacks();
    let config = Config::discover(&args.config).context("Failed to load configuration")?;
    config.merge_with_args(&mut args);

    let settings = args
        .into_settings()
        .validate()
        .context("validation failed")?;

    let plugin = Plugin::new(settings).context("exec failed")?;
    plugin.run().await.context("exec failed")?;

    Ok(())
}
