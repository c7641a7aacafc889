use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::events::{ConcertMap, EventRecord};

/// Sort key for events without a usable date; places them after every real date.
pub const SENTINEL_DATE: NaiveDate = NaiveDate::MAX;

/// One feed item, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Ticket URL, or a content hash when the event has none
    pub guid: String,
    /// Whether `guid` is a dereferenceable URL
    pub guid_is_permalink: bool,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Event day at 12:00 UTC, or generation time for undated events
    pub published: DateTime<Utc>,
    /// Event day, or [`SENTINEL_DATE`]
    pub sort_date: NaiveDate,
}

/// Flattens the map into feed entries ordered by event date.
///
/// - The sort is stable: same-day events keep map order, then provider order.
/// - Events with a missing or unparseable date sort last.
/// - A ticket URL seen earlier in the sorted list is dropped; events without
///   a URL are never treated as duplicates.
/// - `fallback_link` is used for events without a ticket URL.
pub fn feed_entries(
    concerts: &ConcertMap,
    fallback_link: &str,
    now: DateTime<Utc>,
) -> Vec<FeedEntry> {
    let mut flat: Vec<(&str, &EventRecord)> = concerts
        .iter()
        .flat_map(|(artist, events)| events.iter().map(move |e| (artist, e)))
        .collect();
    flat.sort_by_key(|(_, event)| event.parsed_date().unwrap_or(SENTINEL_DATE));

    let mut seen_urls = HashSet::new();
    let mut entries = Vec::with_capacity(flat.len());

    for (artist, event) in flat {
        if let Some(url) = event.url.as_deref() {
            if !seen_urls.insert(url) {
                tracing::debug!(url = %url, artist = %artist, "Duplicate ticket URL, skipping feed entry");
                continue;
            }
        }
        entries.push(build_entry(artist, event, fallback_link, now));
    }

    entries
}

fn build_entry(
    artist: &str,
    event: &EventRecord,
    fallback_link: &str,
    now: DateTime<Utc>,
) -> FeedEntry {
    let date = event.parsed_date();
    let venue = event.venue_or_default();
    let city = event.city_or_default();
    let country = event.country_or_default();
    let day = event.date_or_default();
    let headliner = event.artist.as_deref().unwrap_or(artist);

    let (guid, guid_is_permalink) = match event.url.as_deref() {
        Some(url) => (url.to_string(), true),
        None => (content_guid(artist, event), false),
    };

    FeedEntry {
        guid,
        guid_is_permalink,
        title: format!("{artist} at {venue}, {city}, {country} on {day}"),
        description: format!("{headliner} plays {venue} in {city}, {country} on {day}."),
        link: event.url.as_deref().unwrap_or(fallback_link).to_string(),
        published: date.and_then(noon_utc).unwrap_or(now),
        sort_date: date.unwrap_or(SENTINEL_DATE),
    }
}

fn noon_utc(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(12, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Stable identifier for events that have no ticket URL.
fn content_guid(artist: &str, event: &EventRecord) -> String {
    let input = format!(
        "{}|{}|{}|{}",
        artist,
        event.venue.as_deref().unwrap_or(""),
        event.city.as_deref().unwrap_or(""),
        event.date.as_deref().unwrap_or("")
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
