use chrono::NaiveDate;

use super::fetcher::FetchResult;

/// Shown in place of a missing text field.
pub const PLACEHOLDER: &str = "N/A";
/// Shown in place of a missing ticket URL.
pub const PLACEHOLDER_URL: &str = "#";

/// One upcoming event as returned by a provider.
///
/// Every field is optional because the upstream APIs omit fields freely.
/// The `*_or_default` accessors substitute the display placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    /// Local event date, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    /// Country code (Ticketmaster) or country name (Bandsintown).
    pub country: Option<String>,
    /// Ticket page.
    pub url: Option<String>,
    /// Headlining attraction reported by the provider.
    pub artist: Option<String>,
}

impl EventRecord {
    pub fn date_or_default(&self) -> &str {
        self.date.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn venue_or_default(&self) -> &str {
        self.venue.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn city_or_default(&self) -> &str {
        self.city.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn country_or_default(&self) -> &str {
        self.country.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn url_or_default(&self) -> &str {
        self.url.as_deref().unwrap_or(PLACEHOLDER_URL)
    }

    /// The date as a calendar day, if present and well-formed.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }
}

/// Artist name → events, in the order artists were queried.
///
/// Holds only artists whose lookup succeeded; an artist with zero events is
/// kept with an empty list. Failed lookups are left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcertMap {
    entries: Vec<(String, Vec<EventRecord>)>,
}

impl ConcertMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from per-artist fetch results, dropping failures.
    pub fn from_results(results: Vec<FetchResult>) -> Self {
        let mut map = Self::new();
        for FetchResult { artist, result } in results {
            if let Ok(events) = result {
                map.insert(artist, events);
            }
        }
        map
    }

    /// Inserts an artist's events. Re-inserting an artist replaces its
    /// events but keeps its original position.
    pub fn insert(&mut self, artist: impl Into<String>, events: Vec<EventRecord>) {
        let artist = artist.into();
        match self.entries.iter_mut().find(|(name, _)| *name == artist) {
            Some((_, existing)) => *existing = events,
            None => self.entries.push((artist, events)),
        }
    }

    pub fn get(&self, artist: &str) -> Option<&[EventRecord]> {
        self.entries
            .iter()
            .find(|(name, _)| name == artist)
            .map(|(_, events)| events.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EventRecord])> {
        self.entries
            .iter()
            .map(|(name, events)| (name.as_str(), events.as_slice()))
    }

    /// Number of artists in the map (including those without events).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_events(&self) -> usize {
        self.entries.iter().map(|(_, events)| events.len()).sum()
    }

    /// True when at least one artist has at least one event.
    pub fn has_events(&self) -> bool {
        self.entries.iter().any(|(_, events)| !events.is_empty())
    }
}
