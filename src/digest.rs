//! Markdown digest of upcoming shows, grouped by artist.
use chrono::NaiveDate;
use std::fmt::Write;

use crate::events::{ConcertMap, EventRecord};

/// Issue title for a digest generated on `today`.
pub fn digest_title(region: Option<&str>, today: NaiveDate) -> String {
    match region {
        Some(region) => format!("Weekly Concert Alert ({region}): {}", today.format("%Y-%m-%d")),
        None => format!("Weekly Concert Alert: {}", today.format("%Y-%m-%d")),
    }
}

/// Renders the digest body.
///
/// Artists appear in map order and events in the order the provider returned
/// them. Artists without events get no heading. When nobody has events the
/// whole digest is a single "nothing found" sentence.
pub fn format_digest(concerts: &ConcertMap, region: Option<&str>) -> String {
    if !concerts.has_events() {
        return match region {
            Some(region) => format!(
                "No upcoming concerts in {region} found for your followed artists this week."
            ),
            None => "No upcoming concerts found for your followed artists this week.".to_string(),
        };
    }

    let mut body = match region {
        Some(region) => format!("Here are the upcoming shows in {region} for your followed bands:\n\n"),
        None => "Here are the upcoming shows for your followed bands:\n\n".to_string(),
    };

    for (artist, events) in concerts.iter() {
        if events.is_empty() {
            continue;
        }
        // Writing to a String cannot fail
        let _ = writeln!(body, "## {artist}");
        for event in events {
            let _ = writeln!(body, "{}", format_event_line(event));
        }
        body.push('\n');
    }

    body
}

/// One Markdown bullet for an event.
pub fn format_event_line(event: &EventRecord) -> String {
    format!(
        "- **{}** - {} in {}, {} ([See Tickets]({}))",
        event.date_or_default(),
        event.venue_or_default(),
        event.city_or_default(),
        event.country_or_default(),
        event.url_or_default(),
    )
}
