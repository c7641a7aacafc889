//! RSS 2.0 feed of upcoming events.
//!
//! All events from the [`ConcertMap`](crate::events::ConcertMap) are flattened
//! into one date-ordered list ([`entries`]) and rendered as a single document
//! ([`rss`]), one `<item>` per event.

mod entries;
mod rss;

pub use entries::{feed_entries, FeedEntry, SENTINEL_DATE};
pub use rss::{generate_feed, render_rss, FeedChannel};
