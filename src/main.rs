use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use weir::config::Config;
use weir::fetch::FeedFetcher;
use weir::scheduler;
use weir::storage::Database;
use weir::worker::Pool;

/// A feed-polling daemon: fetches subscribed feeds on a schedule and stores
/// new entries in SQLite.
#[derive(Parser, Debug)]
#[command(name = "weir", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "weir.toml")]
    config: PathBuf,

    /// Override the database path from the config file.
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    let fetcher = FeedFetcher::new(
        Duration::from_secs(config.http_client_timeout_secs),
        config.proxy_url.clone(),
    )
    .context("Failed to build HTTP client")?;

    let pool = Pool::spawn(
        config.worker_pool_size,
        db.clone(),
        fetcher,
        config.scheduling_policy(),
    );
    scheduler::serve(db, pool, &config);

    tracing::info!(
        workers = config.worker_pool_size,
        polling_frequency_minutes = config.polling_frequency_minutes,
        "weir is running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    Ok(())
}
