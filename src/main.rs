use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use tourwatch::artists::{self, ArtistsError};
use tourwatch::{App, AppError, Config, ConfigError, NotifyOutcome, Provider};

#[derive(Parser, Debug)]
#[command(
    name = "tourwatch",
    about = "Check followed artists for upcoming concerts and publish a digest and RSS feed"
)]
struct Args {
    /// Newline-delimited list of artists to check
    #[arg(long, value_name = "FILE", default_value = "bands.txt")]
    artists: PathBuf,

    /// TOML config file (optional; environment variables take precedence)
    #[arg(long, value_name = "FILE", default_value = "tourwatch.toml")]
    config: PathBuf,

    /// Where to write the RSS feed (overrides `feed_path`)
    #[arg(long, value_name = "FILE")]
    feed: Option<PathBuf>,

    /// Events provider: ticketmaster or bandsintown (overrides `provider`)
    #[arg(long)]
    provider: Option<Provider>,

    /// Skip issue creation even when a token and repository are configured
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    // Provider must be settled before env lookup picks its credential variable
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    config.apply_env(|name| std::env::var(name).ok());
    if let Some(feed) = args.feed {
        config.feed_path = feed;
    }
    tracing::debug!(config = ?config, "Effective configuration");

    let app = match App::new(config) {
        Ok(app) => app,
        Err(AppError::Config(e)) => {
            eprintln!("Error: {e}");
            if let ConfigError::MissingCredential { env } = e {
                eprintln!("Export {env} (or add `api_key` to the config file) and try again.");
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to initialise"),
    };
    let app = if args.no_notify {
        app.without_notifications()
    } else {
        app
    };

    let artists = match artists::load(&args.artists).await {
        Ok(artists) => artists,
        Err(ArtistsError::NotFound(path)) => {
            eprintln!("Error: `{}` not found.", path.display());
            eprintln!("Create it with one artist name per line.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to read artist list"),
    };

    if artists.is_empty() {
        tracing::warn!(path = %args.artists.display(), "Artist list is empty");
    }

    let report = app.run(&artists, Utc::now()).await.context("Run failed")?;

    if !report.failed_artists.is_empty() {
        tracing::warn!(
            failed = report.failed_artists.len(),
            artists = ?report.failed_artists,
            "Some artists could not be checked"
        );
    }
    if let NotifyOutcome::Failed(e) = &report.notification {
        eprintln!("Warning: issue was not created: {e}");
    }
    if report.feed_written {
        println!("Feed written to {}", app.config().feed_path.display());
    }

    println!("Done.");
    Ok(())
}
