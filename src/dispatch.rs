//! Dispatch policy: which articles to deliver this invocation, in what order.
//!
//! Pure selection logic with no I/O, so properties like idempotence and cap
//! behavior are testable without a network or a ledger file.

use crate::feed::Article;
use std::collections::HashSet;

/// Selects the ordered subset of `articles` to deliver now.
///
/// Articles whose id is already in `delivered` are dropped, the remainder is
/// sorted by publish date ascending (oldest delivered first, so the channel
/// reads chronologically), and an optional `cap` keeps only the most recent
/// `cap` articles. The cap bounds a first run against a feed with history;
/// a capped invocation deliberately skips the older backlog for good.
///
/// An empty result is a normal outcome, not an error.
pub fn select(
    articles: Vec<Article>,
    delivered: &HashSet<String>,
    cap: Option<usize>,
) -> Vec<Article> {
    let mut fresh: Vec<Article> = articles
        .into_iter()
        .filter(|a| !delivered.contains(&a.id))
        .collect();

    fresh.sort_by_key(|a| a.published_at);

    if let Some(cap) = cap {
        if fresh.len() > cap {
            // Tail of the ascending sort = the `cap` most recent articles
            fresh.drain(..fresh.len() - cap);
        }
    }

    fresh
}
