//! Pipeline orchestrator: fetch, normalize, select, deliver, commit.
//!
//! One invocation runs the stages in order and ends back at idle. Fetch and
//! parse failures abort the invocation before any ledger write; they are
//! logged, never raised, so a bad poll can't take down the hosting process.
//! The next scheduled trigger simply retries from scratch.

use crate::deliver::{self, DeliveryReport, DELIVERY_SPACING};
use crate::dispatch;
use crate::feed::{fetch_with_retry, parse_feed};
use crate::ledger::Ledger;
use crate::notify::Notifier;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How an invocation ended. Errors are already logged by the time the
/// caller sees `Aborted`; nothing here is worth propagating further.
#[derive(Debug)]
pub enum Outcome {
    /// Ran to completion. The report may be empty (nothing new) or partial
    /// (some deliveries failed and will retry next time).
    Completed(DeliveryReport),
    /// Fetch, parse, or ledger-commit failure ended the invocation early.
    Aborted,
    /// Another invocation was in flight; this trigger was dropped.
    Busy,
}

pub struct Pipeline<N: Notifier> {
    client: reqwest::Client,
    feed_url: String,
    ledger: Ledger,
    notifier: N,
    spacing: Duration,
    busy: AtomicBool,
}

impl<N: Notifier> Pipeline<N> {
    pub fn new(client: reqwest::Client, feed_url: String, ledger: Ledger, notifier: N) -> Self {
        Self {
            client,
            feed_url,
            ledger,
            notifier,
            spacing: DELIVERY_SPACING,
            busy: AtomicBool::new(false),
        }
    }

    /// Overrides the inter-delivery spacing. Tests use this to avoid real
    /// two-second waits.
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }

    /// Scheduled check: deliver everything new, oldest first.
    pub async fn run_full_check(&self) -> Outcome {
        self.run(None).await
    }

    /// Startup sync bounded to the `cap` most recent new articles, so a
    /// first run against a feed with history doesn't flood the channel.
    pub async fn run_initial_sync(&self, cap: usize) -> Outcome {
        self.run(Some(cap)).await
    }

    async fn run(&self, cap: Option<usize>) -> Outcome {
        // Single-flight guard. Overlap can only happen if a trigger fires
        // while a previous invocation is still sleeping between deliveries.
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Pipeline invocation already in flight, skipping trigger");
            return Outcome::Busy;
        }
        let outcome = self.run_stages(cap).await;
        self.busy.store(false, Ordering::Release);
        outcome
    }

    async fn run_stages(&self, cap: Option<usize>) -> Outcome {
        tracing::info!(feed = %self.feed_url, cap = ?cap, "Starting feed check");

        let bytes = match fetch_with_retry(&self.client, &self.feed_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Feed fetch failed, aborting invocation");
                return Outcome::Aborted;
            }
        };

        let articles = match parse_feed(&bytes) {
            Ok(articles) => articles,
            Err(e) => {
                tracing::error!(error = %e, "Feed parse failed, aborting invocation");
                return Outcome::Aborted;
            }
        };

        // Load on every invocation, even when the feed turns out empty, so
        // retention pruning keeps running.
        let delivered_ids = self.ledger.load();

        if articles.is_empty() {
            tracing::info!("Feed contains no entries");
            return Outcome::Completed(DeliveryReport::default());
        }

        let selected = dispatch::select(articles, &delivered_ids, cap);

        if selected.is_empty() {
            tracing::info!("No new articles to deliver");
            return Outcome::Completed(DeliveryReport::default());
        }

        tracing::info!(count = selected.len(), "Delivering new articles");
        let report = deliver::deliver(&self.notifier, &selected, self.spacing).await;

        if !report.delivered.is_empty() {
            let succeeded: HashSet<String> = report.delivered.iter().cloned().collect();
            if let Err(e) = self.ledger.commit(&succeeded) {
                // Deliveries already sent are not undone; without the commit
                // they may repeat next invocation.
                tracing::error!(error = %e, "Ledger commit failed");
                return Outcome::Aborted;
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Feed check finished"
        );
        Outcome::Completed(report)
    }
}
