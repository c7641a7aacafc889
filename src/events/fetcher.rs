use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::decode::{decode_bandsintown, decode_ticketmaster, DecodeError, Decoded};
use super::types::EventRecord;
use crate::config::{Config, ConfigError, Provider};
use crate::http::{read_limited_bytes, BodyError, MAX_BODY_SIZE};

/// Errors that can occur while looking up one artist.
///
/// Any of these means "no data for this artist"; the run continues.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Body was not the JSON shape the provider documents
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Could not build request URL: {0}")]
    InvalidUrl(String),
}

impl From<BodyError> for FetchError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => FetchError::Network(e),
            BodyError::TooLarge => FetchError::ResponseTooLarge,
            BodyError::Incomplete { expected, received } => {
                FetchError::IncompleteResponse { expected, received }
            }
        }
    }
}

/// Outcome of looking up a single artist.
#[derive(Debug)]
pub struct FetchResult {
    /// Artist name as it appears in the input list
    pub artist: String,
    /// Events found (possibly none), or why the lookup failed
    pub result: Result<Vec<EventRecord>, FetchError>,
}

/// Client for the configured events provider.
///
/// Holds the static query settings so each lookup only needs an artist name
/// and a country set.
pub struct EventClient {
    http: reqwest::Client,
    provider: Provider,
    base_url: String,
    api_key: SecretString,
    classification: String,
    sort: String,
    timeout: Duration,
}

impl EventClient {
    /// Fails with [`ConfigError::MissingCredential`] when no API key is set.
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            provider: config.provider,
            base_url: config.events_base_url().to_string(),
            api_key: config.require_api_key()?,
            classification: config.classification.clone(),
            sort: config.sort.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Builds the search URL for one artist. Contains the API key; never log it.
    ///
    /// `countries` only reaches Ticketmaster; Bandsintown searches are
    /// worldwide and config validation rejects a filter for it.
    pub fn request_url(
        &self,
        artist: &str,
        countries: &BTreeSet<String>,
    ) -> Result<Url, FetchError> {
        match self.provider {
            Provider::Ticketmaster => {
                let mut url = Url::parse(&format!("{}/events.json", self.base_url))
                    .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
                {
                    let mut query = url.query_pairs_mut();
                    query
                        .append_pair("apikey", self.api_key.expose_secret())
                        .append_pair("keyword", artist);
                    if !self.classification.is_empty() {
                        query.append_pair("classificationName", &self.classification);
                    }
                    if !self.sort.is_empty() {
                        query.append_pair("sort", &self.sort);
                    }
                    if !countries.is_empty() {
                        let joined = countries.iter().cloned().collect::<Vec<_>>().join(",");
                        query.append_pair("countryCode", &joined);
                    }
                }
                Ok(url)
            }
            Provider::Bandsintown => {
                let mut url = Url::parse(&self.base_url)
                    .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
                url.path_segments_mut()
                    .map_err(|_| FetchError::InvalidUrl("base URL cannot have a path".into()))?
                    .pop_if_empty()
                    .extend(["artists", artist, "events"]);
                url.query_pairs_mut()
                    .append_pair("app_id", self.api_key.expose_secret());
                Ok(url)
            }
        }
    }

    /// Looks up upcoming events for one artist.
    ///
    /// One request, no retries. `Ok(vec![])` means the search succeeded and
    /// found nothing; every failure is an `Err`.
    pub async fn fetch(
        &self,
        artist: &str,
        countries: &BTreeSet<String>,
    ) -> Result<Vec<EventRecord>, FetchError> {
        let url = self.request_url(artist, countries)?;

        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_BODY_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let Decoded { events, skipped } = match self.provider {
            Provider::Ticketmaster => decode_ticketmaster(&bytes)?,
            Provider::Bandsintown => decode_bandsintown(&bytes)?,
        };

        if skipped > 0 {
            tracing::warn!(artist = %artist, skipped = skipped, "Events with unreadable data skipped");
        }

        Ok(events)
    }

    /// Looks up every artist in order, one request at a time.
    ///
    /// Failures are logged and recorded; they never stop the remaining
    /// lookups. Results are returned in input order.
    pub async fn fetch_all(
        &self,
        artists: &[String],
        countries: &BTreeSet<String>,
    ) -> Vec<FetchResult> {
        let mut results = Vec::with_capacity(artists.len());

        for artist in artists {
            tracing::info!(artist = %artist, provider = %self.provider, "Checking for upcoming events");
            let result = self.fetch(artist, countries).await;

            match &result {
                Ok(events) => {
                    tracing::info!(artist = %artist, count = events.len(), "Lookup complete");
                }
                Err(e) => {
                    tracing::warn!(artist = %artist, error = %e, "Failed to get events, skipping artist");
                }
            }

            results.push(FetchResult {
                artist: artist.clone(),
                result,
            });
        }

        results
    }
}
