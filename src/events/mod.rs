//! Upcoming-event lookup against the configured provider.
//!
//! - [`fetcher`] - one sequential HTTP lookup per artist
//! - [`decode`] - provider JSON into typed records with placeholder defaults
//! - [`types`] - [`EventRecord`] and the per-run [`ConcertMap`]

mod decode;
mod fetcher;
mod types;

pub use decode::{decode_bandsintown, decode_ticketmaster, DecodeError, Decoded};
pub use fetcher::{EventClient, FetchError, FetchResult};
pub use types::{ConcertMap, EventRecord, PLACEHOLDER, PLACEHOLDER_URL};
