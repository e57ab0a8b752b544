//! Delivery driver: sequential, rate-spaced sends with per-article failure
//! isolation.

use crate::feed::Article;
use crate::notify::{Notifier, NotifyError};
use std::time::Duration;

/// Wait between consecutive sends. Safe buffer under the channel's
/// ~5 messages / 5 seconds rate limit.
pub const DELIVERY_SPACING: Duration = Duration::from_secs(2);

/// One article that could not be sent, with its cause.
#[derive(Debug)]
pub struct FailedDelivery {
    pub id: String,
    pub error: NotifyError,
}

/// Outcome of one delivery pass. Partial success is a normal result, not an
/// error: failed ids stay out of the ledger and retry on the next invocation.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

/// Delivers articles strictly in the order given, one at a time, waiting
/// `spacing` between consecutive sends (none after the last). A failure
/// for one article is logged and recorded but never short-circuits the
/// rest.
pub async fn deliver<N: Notifier + ?Sized>(
    notifier: &N,
    articles: &[Article],
    spacing: Duration,
) -> DeliveryReport {
    let mut report = DeliveryReport {
        attempted: articles.len(),
        ..Default::default()
    };

    for (i, article) in articles.iter().enumerate() {
        match notifier.notify(article).await {
            Ok(()) => report.delivered.push(article.id.clone()),
            Err(e) => {
                tracing::error!(
                    article = %article.id,
                    title = %article.title,
                    error = %e,
                    "Failed to deliver article, continuing with the rest"
                );
                report.failed.push(FailedDelivery {
                    id: article.id.clone(),
                    error: e,
                });
            }
        }

        if i + 1 < articles.len() {
            tokio::time::sleep(spacing).await;
        }
    }

    report
}
