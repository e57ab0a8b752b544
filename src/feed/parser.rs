use chrono::{DateTime, Utc};
use feed_rs::parser::{Builder, Parser};
use thiserror::Error;

/// Maximum description length in characters. Stays under Discord's 4096
/// embed description limit with margin for the ellipsis marker.
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Normalized representation of one feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Stable identifier: entry id/GUID, falling back to the link URL,
    /// falling back to empty string. Multiple id-less entries collapse to
    /// the same empty id and dedupe against each other; that degenerate
    /// case is inherited from the feed, not papered over here.
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

/// Feed document could not be parsed as RSS or Atom.
#[derive(Debug, Error)]
#[error("failed to parse feed: {0}")]
pub struct ParseError(#[from] feed_rs::parser::ParseFeedError);

/// Parser configured to leave missing entry ids empty.
///
/// feed-rs would otherwise synthesize an id (a link/title hash, or a random
/// UUID when the entry has neither) before we ever see the entry. A random
/// id changes on every fetch and would re-deliver the same article forever,
/// so id synthesis is disabled and the fallback chain below stays in charge.
fn feed_parser() -> Parser {
    Builder::new().id_generator(|_, _, _| String::new()).build()
}

/// Parses a raw feed document into normalized articles.
///
/// Output order matches the order entries appear in the document; sorting
/// by publish date is the dispatch policy's job. An empty entry list is a
/// valid feed and yields an empty vec.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Article>, ParseError> {
    let feed = feed_parser().parse(bytes)?;

    let articles = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();

            let id = {
                let trimmed = entry.id.trim();
                if trimmed.is_empty() {
                    link.clone()
                } else {
                    trimmed.to_string()
                }
            };

            let title = entry
                .title
                .map(|t| t.content)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            // First non-empty of summary, then full content body
            let description = entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.is_empty())
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            let published_at = entry
                .published
                .or(entry.updated)
                .unwrap_or_else(Utc::now);

            Article {
                id,
                title,
                link,
                description: truncate_description(description),
                published_at,
            }
        })
        .collect();

    Ok(articles)
}

/// Caps the description at [`MAX_DESCRIPTION_CHARS`] characters, appending
/// an ellipsis marker when text was cut. Counts chars, not bytes, so the
/// cut never lands inside a multi-byte codepoint.
fn truncate_description(text: String) -> String {
    match text.char_indices().nth(MAX_DESCRIPTION_CHARS) {
        None => text,
        Some((byte_end, _)) => {
            let mut out = text[..byte_end].to_string();
            out.push_str("...");
            out
        }
    }
}
