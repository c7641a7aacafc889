//! Upcoming concerts for a list of followed artists.
//!
//! A run reads the artist list ([`artists`]), looks up each artist against an
//! events provider ([`events`]), and publishes the results as a Markdown
//! digest ([`digest`], [`output`]), an RSS feed ([`feed`]), and optionally a
//! GitHub issue ([`notify`]). [`app`] wires the steps together.

pub mod app;
pub mod artists;
pub mod config;
pub mod digest;
pub mod events;
pub mod feed;
pub mod http;
pub mod notify;
pub mod output;

pub use app::{App, AppError, NotifyOutcome, RunReport};
pub use config::{Config, ConfigError, Provider};
pub use events::{ConcertMap, EventRecord};
