//! Run configuration: an optional TOML file plus environment overrides.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Environment variables take precedence over file values so that CI secrets
//! never have to be written to disk. The resulting [`Config`] is built once and
//! handed to every component.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// ISO 3166-1 alpha-2 codes used as the default Ticketmaster region filter
/// (EU and non-EU European countries).
pub const EUROPEAN_COUNTRY_CODES: [&str; 50] = [
    "AL", "AD", "AM", "AT", "BY", "BE", "BA", "BG", "CH", "CY", "CZ", "DE", "DK", "EE", "ES", "FO",
    "FI", "FR", "GB", "GE", "GI", "GR", "HR", "HU", "IE", "IS", "IT", "LI", "LT", "LU", "LV", "MC",
    "MD", "ME", "MK", "MT", "NL", "NO", "PL", "PT", "RO", "RS", "RU", "SE", "SI", "SK", "SM", "TR",
    "UA", "VA",
];

const KNOWN_KEYS: [&str; 16] = [
    "provider",
    "api_key",
    "output_path",
    "feed_base_url",
    "feed_path",
    "feed_title",
    "notify_token",
    "notify_target",
    "notify_country",
    "notify_api_url",
    "country_filter",
    "region_name",
    "classification",
    "sort",
    "events_base_url",
    "request_timeout_secs",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but makes no sense (bad URL, malformed repository name).
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Missing API credential: set {env} or `api_key` in the config file")]
    MissingCredential { env: &'static str },
}

// ============================================================================
// Provider
// ============================================================================

/// Upstream events API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Ticketmaster Discovery API v2.
    #[default]
    Ticketmaster,
    /// Bandsintown REST API v3.
    Bandsintown,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Ticketmaster => "https://app.ticketmaster.com/discovery/v2",
            Provider::Bandsintown => "https://rest.bandsintown.com",
        }
    }

    /// Public site used as the feed channel link when no base URL is configured.
    pub fn home_url(self) -> &'static str {
        match self {
            Provider::Ticketmaster => "https://www.ticketmaster.com",
            Provider::Bandsintown => "https://www.bandsintown.com",
        }
    }

    /// Country filter used when `country_filter` is not configured.
    ///
    /// Bandsintown reports venue countries as free-form names, so results
    /// cannot be matched against codes and the lookup is worldwide.
    pub fn default_countries(self) -> &'static [&'static str] {
        match self {
            Provider::Ticketmaster => &EUROPEAN_COUNTRY_CODES,
            Provider::Bandsintown => &[],
        }
    }

    /// Region label used when `region_name` is not configured.
    pub fn default_region(self) -> Option<&'static str> {
        match self {
            Provider::Ticketmaster => Some("Europe"),
            Provider::Bandsintown => None,
        }
    }

    /// Whether the API can restrict a search to a set of country codes.
    pub fn supports_country_filter(self) -> bool {
        matches!(self, Provider::Ticketmaster)
    }

    /// Provider-specific environment variable holding the credential.
    pub fn credential_env(self) -> &'static str {
        match self {
            Provider::Ticketmaster => "TICKETMASTER_API_KEY",
            Provider::Bandsintown => "BANDSINTOWN_APP_ID",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Ticketmaster => f.write_str("ticketmaster"),
            Provider::Bandsintown => f.write_str("bandsintown"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticketmaster" => Ok(Provider::Ticketmaster),
            "bandsintown" => Ok(Provider::Bandsintown),
            other => Err(format!(
                "unknown provider '{other}' (expected 'ticketmaster' or 'bandsintown')"
            )),
        }
    }
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level run configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Custom Debug impl masks `api_key` and `notify_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Provider,

    /// Ticketmaster API key or Bandsintown app id.
    pub api_key: Option<String>,

    /// Automation output file (`GITHUB_OUTPUT`). When unset the digest is
    /// printed to stdout instead.
    pub output_path: Option<PathBuf>,

    /// Base URL the feed is published under; used as the channel link.
    pub feed_base_url: Option<String>,

    pub feed_path: PathBuf,

    pub feed_title: String,

    pub notify_token: Option<String>,

    /// Repository receiving the issue, as `owner/repo`.
    pub notify_target: Option<String>,

    /// When set, the notification digest comes from a second pass restricted
    /// to this single country code.
    pub notify_country: Option<String>,

    pub notify_api_url: String,

    /// Country codes passed to the events API. Empty means worldwide; unset
    /// means the provider's default.
    pub country_filter: Option<Vec<String>>,

    /// Human-readable name for `country_filter`, shown in the digest. Empty
    /// string disables the region wording; unset means the provider's default.
    pub region_name: Option<String>,

    pub classification: String,

    pub sort: String,

    /// Overrides the provider's API base URL.
    pub events_base_url: Option<String>,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            output_path: None,
            feed_base_url: None,
            feed_path: PathBuf::from("concerts.xml"),
            feed_title: "Upcoming Concerts".to_string(),
            notify_token: None,
            notify_target: None,
            notify_country: None,
            notify_api_url: "https://api.github.com".to_string(),
            country_filter: None,
            region_name: None,
            classification: "Music".to_string(),
            sort: "date,asc".to_string(),
            events_base_url: None,
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("output_path", &self.output_path)
            .field("feed_base_url", &self.feed_base_url)
            .field("feed_path", &self.feed_path)
            .field("feed_title", &self.feed_title)
            .field(
                "notify_token",
                &self.notify_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("notify_target", &self.notify_target)
            .field("notify_country", &self.notify_country)
            .field("notify_api_url", &self.notify_api_url)
            .field("country_filter", &self.country_filter)
            .field("region_name", &self.region_name)
            .field("classification", &self.classification)
            .field("sort", &self.sort)
            .field("events_base_url", &self.events_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(provider = %config.provider, "Loaded configuration");
        Ok(config)
    }

    /// Apply environment overrides using the given lookup (usually
    /// `std::env::var(..).ok()`). Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(self.provider.credential_env()).or_else(|| get("TOURWATCH_API_KEY"))
        {
            self.api_key = Some(key);
        }
        if let Some(path) = get("GITHUB_OUTPUT") {
            self.output_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("FEED_BASE_URL") {
            self.feed_base_url = Some(url);
        }
        if let Some(token) = get("GITHUB_TOKEN") {
            self.notify_token = Some(token);
        }
        if let Some(repo) = get("GITHUB_REPOSITORY") {
            self.notify_target = Some(repo);
        }
    }

    /// Check values that serde cannot: URLs, repository shape, country codes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.feed_base_url {
            check_http_url("feed_base_url", base)?;
        }
        if let Some(base) = &self.events_base_url {
            check_http_url("events_base_url", base)?;
        }
        check_http_url("notify_api_url", &self.notify_api_url)?;

        if let Some(target) = &self.notify_target {
            let mut parts = target.split('/');
            let valid = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
            );
            if !valid {
                return Err(ConfigError::Invalid {
                    key: "notify_target",
                    reason: format!("expected 'owner/repo', got '{target}'"),
                });
            }
        }

        for code in self.country_filter.iter().flatten() {
            check_country_code("country_filter", code)?;
        }
        if let Some(code) = &self.notify_country {
            check_country_code("notify_country", code)?;
        }

        if !self.provider.supports_country_filter() {
            if !self.countries().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "country_filter",
                    reason: format!("the {} provider cannot filter by country", self.provider),
                });
            }
            if self.notify_country.is_some() {
                return Err(ConfigError::Invalid {
                    key: "notify_country",
                    reason: format!("the {} provider cannot filter by country", self.provider),
                });
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// The API credential, or the fatal configuration error when absent.
    pub fn require_api_key(&self) -> Result<SecretString, ConfigError> {
        self.api_key
            .clone()
            .map(SecretString::from)
            .ok_or(ConfigError::MissingCredential {
                env: self.provider.credential_env(),
            })
    }

    /// Upper-cased, de-duplicated, sorted country filter.
    pub fn countries(&self) -> BTreeSet<String> {
        match &self.country_filter {
            Some(codes) => codes.iter().map(|c| c.trim().to_ascii_uppercase()).collect(),
            None => self
                .provider
                .default_countries()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    pub fn region(&self) -> Option<&str> {
        match &self.region_name {
            Some(name) => Some(name.trim()).filter(|n| !n.is_empty()),
            None => self.provider.default_region(),
        }
    }

    pub fn events_base_url(&self) -> &str {
        self.events_base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Link used for the feed channel and for items without a ticket URL.
    pub fn channel_link(&self) -> &str {
        self.feed_base_url
            .as_deref()
            .unwrap_or(self.provider.home_url())
    }
}

fn check_country_code(key: &'static str, code: &str) -> Result<(), ConfigError> {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("'{code}' is not a two-letter country code"),
        });
    }
    Ok(())
}

fn check_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
