//! Feed retrieval and normalization.
//!
//! - [`fetcher`] - HTTP fetch with per-attempt timeout and exponential backoff
//! - [`parser`] - RSS/Atom parsing into normalized [`Article`] records using
//!   the `feed-rs` crate
//!
//! Parsing preserves document order; chronological sorting happens later in
//! the dispatch policy.

mod fetcher;
mod parser;

pub use fetcher::{fetch_with_retry, FetchError, FetchFailure, DEFAULT_ATTEMPTS};
pub use parser::{parse_feed, Article, ParseError, MAX_DESCRIPTION_CHARS};
