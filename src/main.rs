//! fanoutd — notification fan-out worker.
//!
//! Wires the Postgres adapters into the engine, spawns the priority
//! dispatcher, and drains dead letters into the error log until shutdown.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanout::config;
use fanout::engine::Engine;
use fanout::jobs::dispatcher::{Dispatcher, RetryPolicy};
use fanout::store::postgres::PgStore;

#[derive(Parser, Debug)]
#[command(name = "fanoutd", about = "Notification fan-out worker")]
struct Cli {
    /// Override the configured worker count.
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "fanout=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = Cli::parse();
    let workers = args.workers.unwrap_or(cfg.workers);

    let db = PgStore::connect(&cfg.database_url).await?;
    db.migrate().await?;
    tracing::info!(workers, "store connected, migrations applied");

    let db = Arc::new(db);
    let engine = Arc::new(Engine::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        db,
        chrono::Duration::hours(cfg.moderation_cooldown_hours),
    ));

    let policy = RetryPolicy {
        max_attempts: cfg.max_attempts,
        base_backoff: Duration::from_millis(cfg.base_backoff_ms),
        max_backoff: Duration::from_millis(cfg.max_backoff_ms),
    };
    let (dispatcher, mut dead_letters) =
        Dispatcher::start(engine, policy, workers, cfg.queue_capacity);

    // Operational error channel: exhausted jobs end up in the log stream
    // where the alerting pipeline picks them up.
    tokio::spawn(async move {
        while let Some(letter) = dead_letters.recv().await {
            tracing::error!(
                job = letter.job.name(),
                attempts = letter.attempts,
                error = %letter.error,
                "dead-lettered job"
            );
        }
    });

    tracing::info!("fanoutd running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down, draining queues");
    dispatcher.shutdown().await;
    Ok(())
}
