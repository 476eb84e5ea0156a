//! Client data layer for the journal API.
//!
//! [`api::HttpEntriesApi`] talks to the server, [`photo::PublicUrlResolver`]
//! turns storage paths into display URLs, and [`feed::EntryFeed`] keeps the
//! newest-first list of entry cards in sync with both.

pub mod api;
pub mod error;
pub mod feed;
pub mod photo;

pub use api::{EntriesApi, HttpEntriesApi, PhotoUpload};
pub use error::ClientError;
pub use feed::{Created, EntryCard, EntryFeed, FeedSnapshot, LoadOutcome, PolishOutcome};
pub use photo::{PhotoUrlError, PhotoUrlResolver, PublicUrlResolver};
