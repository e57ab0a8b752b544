//! Outbound notification capability.
//!
//! The pipeline only ever sees the [`Notifier`] trait; the Discord REST
//! adapter lives in [`discord`] and the pure article-to-payload rendering in
//! [`embed`]. Tests substitute an in-memory notifier.

pub mod discord;
pub mod embed;

use crate::feed::Article;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport-level failure talking to the channel API
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The channel API rejected the message
    #[error("channel API returned status {0}")]
    Status(u16),
}

/// "Send one notification" capability consumed by the delivery driver.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, article: &Article) -> Result<(), NotifyError>;
}
