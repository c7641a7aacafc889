//! Typed decoding of provider JSON into [`EventRecord`]s.
//!
//! Every leaf field goes through [`lenient`], so a missing or wrongly-typed
//! value becomes `None` instead of failing the whole response. Individual
//! events that are not JSON objects are skipped and counted.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::EventRecord;

/// Decoded events plus the number of entries that could not be read.
#[derive(Debug, Default)]
pub struct Decoded {
    pub events: Vec<EventRecord>,
    pub skipped: usize,
}

/// Non-success payloads returned with a 2xx status.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Ticketmaster Discovery v2
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmSearch {
    #[serde(rename = "_embedded", deserialize_with = "lenient")]
    embedded: Option<TmSearchEmbedded>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmSearchEmbedded {
    events: Vec<Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmEvent {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    dates: Option<TmDates>,
    #[serde(rename = "_embedded", deserialize_with = "lenient")]
    embedded: Option<TmEventEmbedded>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmDates {
    #[serde(deserialize_with = "lenient")]
    start: Option<TmStart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmStart {
    #[serde(rename = "localDate", deserialize_with = "lenient")]
    local_date: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmEventEmbedded {
    #[serde(deserialize_with = "lenient")]
    venues: Option<Vec<TmVenue>>,
    #[serde(deserialize_with = "lenient")]
    attractions: Option<Vec<TmNamed>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmVenue {
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    city: Option<TmNamed>,
    #[serde(deserialize_with = "lenient")]
    country: Option<TmCountry>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmNamed {
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TmCountry {
    #[serde(rename = "countryCode", deserialize_with = "lenient")]
    country_code: Option<String>,
}

impl From<TmEvent> for EventRecord {
    fn from(event: TmEvent) -> Self {
        let embedded = event.embedded.unwrap_or_default();
        let venue = embedded
            .venues
            .and_then(|v| v.into_iter().next())
            .unwrap_or_default();

        EventRecord {
            date: non_empty(event.dates.and_then(|d| d.start).and_then(|s| s.local_date)),
            venue: non_empty(venue.name),
            city: non_empty(venue.city.and_then(|c| c.name)),
            country: non_empty(venue.country.and_then(|c| c.country_code)),
            url: non_empty(event.url),
            artist: non_empty(
                embedded
                    .attractions
                    .and_then(|a| a.into_iter().next())
                    .and_then(|a| a.name),
            ),
        }
    }
}

/// Decodes a Discovery API `events.json` response.
///
/// A body without `_embedded` is a successful search with no results.
pub fn decode_ticketmaster(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    let search: TmSearch = serde_json::from_slice(bytes)?;
    let raw = search.embedded.map(|e| e.events).unwrap_or_default();
    Ok(decode_each::<TmEvent>(raw))
}

// ============================================================================
// Bandsintown v3
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct BitEvent {
    #[serde(deserialize_with = "lenient")]
    datetime: Option<String>,
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    venue: Option<BitVenue>,
    #[serde(deserialize_with = "lenient")]
    lineup: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct BitVenue {
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    city: Option<String>,
    #[serde(deserialize_with = "lenient")]
    country: Option<String>,
}

impl From<BitEvent> for EventRecord {
    fn from(event: BitEvent) -> Self {
        let venue = event.venue.unwrap_or_default();
        let date = event
            .datetime
            .and_then(|dt| dt.split('T').next().map(str::to_string));

        EventRecord {
            date: non_empty(date),
            venue: non_empty(venue.name),
            city: non_empty(venue.city),
            country: non_empty(venue.country),
            url: non_empty(event.url),
            artist: non_empty(event.lineup.and_then(|l| l.into_iter().next())),
        }
    }
}

/// Decodes a Bandsintown `artists/{name}/events` response.
///
/// Bandsintown reports unknown artists as a 200 with an object body such as
/// `{"errorMessage": "..."}`; that is surfaced as [`DecodeError::Upstream`].
pub fn decode_bandsintown(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(raw) => Ok(decode_each::<BitEvent>(raw)),
        Value::Object(obj) => {
            let message = obj
                .get("errorMessage")
                .or_else(|| obj.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unexpected object response");
            Err(DecodeError::Upstream(message.to_string()))
        }
        other => Err(DecodeError::Upstream(format!(
            "unexpected response: {}",
            truncate(&other.to_string(), 80)
        ))),
    }
}

fn decode_each<T>(raw: Vec<Value>) -> Decoded
where
    T: DeserializeOwned + Into<EventRecord>,
{
    let mut decoded = Decoded::default();
    for value in raw {
        match T::deserialize(value) {
            Ok(event) => decoded.events.push(event.into()),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable event");
                decoded.skipped += 1;
            }
        }
    }
    decoded
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
