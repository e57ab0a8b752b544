use anyhow::{Context, Result};
use clap::Parser;
use herald::config::{Config, Environment};
use herald::ledger::Ledger;
use herald::notify::discord::DiscordNotifier;
use herald::pipeline::Pipeline;
use herald::scheduler;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "herald", about = "Feed watcher that posts new articles to a Discord channel")]
struct Args {
    /// Run a single feed check and exit (for external cron setups)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // .env is optional; real deployments set variables directly
    let _ = dotenvy::dotenv();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        feed = %config.feed_url,
        timezone = %config.timezone,
        environment = ?config.environment,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let notifier = DiscordNotifier::new(
        client.clone(),
        config.discord.token.clone(),
        config.discord.channel_id.clone(),
        config.discord.role_id.clone(),
        config.feed_source(),
    );
    let ledger = Ledger::new(&config.data_dir);
    let pipeline = Arc::new(Pipeline::new(
        client,
        config.feed_url.clone(),
        ledger,
        notifier,
    ));

    if args.once {
        pipeline.run_full_check().await;
        return Ok(());
    }

    // Startup invocation: production starts with a bounded sync so a fresh
    // deployment doesn't flood the channel with the feed's whole history.
    match config.environment {
        Environment::Production => {
            pipeline.run_initial_sync(2).await;
        }
        Environment::Development => {
            pipeline.run_full_check().await;
        }
    }

    let schedule = tokio::spawn(scheduler::run_schedule(
        Arc::clone(&pipeline),
        config.timezone,
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping");
    schedule.abort();

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
