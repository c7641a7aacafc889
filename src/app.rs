//! One linear pass: look up every artist, publish the digest and the feed,
//! then optionally open an issue.
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::digest::{digest_title, format_digest};
use crate::events::{ConcertMap, EventClient};
use crate::feed::{generate_feed, FeedChannel};
use crate::http::build_client;
use crate::notify::{CreatedIssue, IssueNotifier, NotifyError};
use crate::output::{emit_digest, write_feed, DigestSink, OutputError};

/// Errors that stop a run.
///
/// Per-artist lookup failures and notification failures are not here: they
/// are logged and reported in [`RunReport`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Invalid notification settings: {0}")]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("Failed to generate feed: {0:#}")]
    Feed(#[from] anyhow::Error),
}

/// What happened to the optional issue notification.
#[derive(Debug)]
pub enum NotifyOutcome {
    Disabled,
    Created(CreatedIssue),
    Failed(NotifyError),
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub title: String,
    pub digest: String,
    pub sink: DigestSink,
    pub concerts: ConcertMap,
    /// Artists whose lookup failed, in input order
    pub failed_artists: Vec<String>,
    pub feed_written: bool,
    pub notification: NotifyOutcome,
}

pub struct App {
    config: Config,
    events: EventClient,
    notifier: Option<IssueNotifier>,
}

impl App {
    /// Validates the configuration and builds the clients.
    ///
    /// Fails on a missing API credential, before any request is made.
    pub fn new(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let http = build_client(Duration::from_secs(config.request_timeout_secs))?;
        let events = EventClient::new(http.clone(), &config)?;
        let notifier = IssueNotifier::from_config(http, &config).transpose()?;

        if notifier.is_none() {
            tracing::debug!("Issue notification disabled (no token or target repository)");
        }

        Ok(Self {
            config,
            events,
            notifier,
        })
    }

    /// Turns notification off for this run even when configured.
    pub fn without_notifications(mut self) -> Self {
        self.notifier = None;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole pipeline for `artists`. `now` stamps the title and feed.
    pub async fn run(&self, artists: &[String], now: DateTime<Utc>) -> Result<RunReport, AppError> {
        let region = self.config.region();
        let countries = self.config.countries();

        let results = self.events.fetch_all(artists, &countries).await;
        let failed_artists: Vec<String> = results
            .iter()
            .filter(|r| r.result.is_err())
            .map(|r| r.artist.clone())
            .collect();
        let concerts = ConcertMap::from_results(results);

        tracing::info!(
            artists = artists.len(),
            failed = failed_artists.len(),
            events = concerts.total_events(),
            "Lookups finished"
        );

        let title = digest_title(region, now.date_naive());
        let digest = format_digest(&concerts, region);
        let sink = emit_digest(self.config.output_path.as_deref(), &title, &digest)?;

        let channel = FeedChannel {
            title: self.config.feed_title.clone(),
            link: self.config.channel_link().to_string(),
            description: match region {
                Some(region) => format!("Upcoming shows in {region} for followed artists"),
                None => "Upcoming shows for followed artists".to_string(),
            },
        };
        let xml = generate_feed(&concerts, &channel, now)?;
        let feed_written = write_feed(&self.config.feed_path, &xml)?;

        let notification = match &self.notifier {
            Some(notifier) => self.notify(notifier, artists, &title, &digest, now).await,
            None => NotifyOutcome::Disabled,
        };

        Ok(RunReport {
            title,
            digest,
            sink,
            concerts,
            failed_artists,
            feed_written,
            notification,
        })
    }

    /// Posts the issue. With `notify_country` set, the body comes from a
    /// second lookup pass restricted to that country.
    async fn notify(
        &self,
        notifier: &IssueNotifier,
        artists: &[String],
        title: &str,
        digest: &str,
        now: DateTime<Utc>,
    ) -> NotifyOutcome {
        let (title, body) = match self.config.notify_country.as_deref() {
            Some(country) => {
                let country = country.trim().to_ascii_uppercase();
                tracing::info!(country = %country, "Running country lookup for notification");
                let only: BTreeSet<String> = BTreeSet::from([country.clone()]);
                let concerts =
                    ConcertMap::from_results(self.events.fetch_all(artists, &only).await);
                (
                    digest_title(Some(country.as_str()), now.date_naive()),
                    format_digest(&concerts, Some(country.as_str())),
                )
            }
            None => (title.to_string(), digest.to_string()),
        };

        match notifier.create_issue(&title, &body).await {
            Ok(issue) => {
                tracing::info!(
                    repo = %notifier.target(),
                    number = issue.number,
                    url = issue.html_url.as_deref().unwrap_or(""),
                    "Issue created"
                );
                NotifyOutcome::Created(issue)
            }
            Err(e) => {
                tracing::warn!(repo = %notifier.target(), error = %e, "Failed to create issue");
                NotifyOutcome::Failed(e)
            }
        }
    }
}
