//! Stock audit - reconciles stored stock quantities against the movement ledger
//!
//! Runs one discrepancy scan over the whole catalog and writes the ranked
//! result to stdout as JSON. Ctrl-C stops the scan and keeps partial results.

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use stock_balance_engine::{ledger::PgLedger, services::CancelHandle, Config, StockEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_audit=info,stock_balance_engine=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting stock audit");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    let ledger = Arc::new(PgLedger::new(db_pool));
    let engine = StockEngine::new(ledger.clone(), ledger, &config.engine, &config.classifier);

    let cancel = CancelHandle::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing with partial results");
            on_signal.cancel();
        }
    });

    let scan = engine
        .find_stock_discrepancies(config.audit.threshold, config.audit.limit, Some(&cancel))
        .await?;

    println!("{}", serde_json::to_string_pretty(&scan)?);

    if !scan.errors.is_empty() {
        tracing::warn!("{} products could not be checked", scan.errors.len());
    }

    Ok(())
}
