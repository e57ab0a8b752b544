//! Pure rendering of an [`Article`] into a Discord message payload.
//!
//! No I/O here; the adapter in [`super::discord`] serializes the returned
//! payload as-is. Keeping this pure lets the formatting rules (title limit,
//! footer, mention) be asserted in plain unit tests.

use crate::feed::Article;
use serde::Serialize;

/// Discord's hard limit for an embed title.
const MAX_TITLE_CHARS: usize = 256;

/// Accent color for the embed sidebar.
const ACCENT_COLOR: u32 = 0xF0_5138;

#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub footer: EmbedFooter,
    /// ISO 8601; Discord renders it localized at the bottom of the embed
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AllowedMentions {
    pub roles: Vec<String>,
}

/// Builds the full message for one article: a role mention line plus a rich
/// embed with title, link, description, accent color and a footer carrying
/// the source and the formatted publish date.
pub fn build_message(article: &Article, role_id: &str, source: &str) -> MessagePayload {
    let date_str = article.published_at.format("%B %-d, %Y");

    MessagePayload {
        content: format!("<@&{role_id}> \u{1F4F0} New article from {source}!"),
        embeds: vec![Embed {
            title: truncate_title(&article.title),
            url: article.link.clone(),
            description: article.description.clone(),
            color: ACCENT_COLOR,
            footer: EmbedFooter {
                text: format!("{source} \u{2022} Published {date_str}"),
            },
            timestamp: article.published_at.to_rfc3339(),
        }],
        allowed_mentions: AllowedMentions {
            roles: vec![role_id.to_string()],
        },
    }
}

/// Keeps the title within Discord's 256-character limit, ellipsis included.
fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{cut}...")
}
