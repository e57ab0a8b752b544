//! Feed-to-Discord notification pipeline.
//!
//! Herald watches a single RSS/Atom feed and posts each new entry to a
//! Discord channel exactly once, surviving restarts by keeping a durable
//! ledger of delivered article ids.
//!
//! # Architecture
//!
//! One invocation of the pipeline runs these stages in order:
//!
//! - [`feed::fetch_with_retry`] - HTTP retrieval with bounded retries
//! - [`feed::parse_feed`] - normalization into [`feed::Article`] records
//! - [`ledger::Ledger::load`] - delivered-id set with 30-day pruning
//! - [`dispatch::select`] - pure filter/sort/cap policy
//! - [`deliver::deliver`] - sequential, rate-spaced delivery
//! - [`ledger::Ledger::commit`] - crash-safe recording of successes
//!
//! The Discord side is reached only through the [`notify::Notifier`] trait,
//! so tests can substitute an in-memory notifier.

pub mod config;
pub mod deliver;
pub mod dispatch;
pub mod feed;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod scheduler;

pub use feed::Article;
pub use pipeline::Pipeline;
