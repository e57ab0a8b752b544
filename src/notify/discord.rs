//! Discord REST adapter for the [`Notifier`] capability.
//!
//! Posts through `POST /channels/{id}/messages` with a bot token. Session
//! and gateway concerns are out of scope; a stateless HTTP call per article
//! is all the pipeline needs.

use super::embed::build_message;
use super::{Notifier, NotifyError};
use crate::feed::Article;
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DiscordNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
    role_id: String,
    source: String,
}

impl DiscordNotifier {
    /// `source` is the human-readable feed origin shown in the embed footer,
    /// e.g. the feed URL's host.
    pub fn new(
        client: reqwest::Client,
        token: String,
        channel_id: String,
        role_id: String,
        source: String,
    ) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            channel_id,
            role_id,
            source,
        }
    }

    /// Points the adapter at a different API base. Used by tests to target a
    /// mock server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, article: &Article) -> Result<(), NotifyError> {
        let payload = build_message(article, &self.role_id, &self.source);
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        tracing::info!(article = %article.id, title = %article.title, "Posted article");
        Ok(())
    }
}
