//! Stockroom - inventory tracking service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stockroom::{config::Args, db::opener::redact_uri, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("stockroom={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let retry = &args.retry;
    info!("======================================");
    info!("  Stockroom - inventory service");
    info!("======================================");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Listen: {}", args.listen);
    info!("MongoDB: {} (db '{}')", redact_uri(&args.mongodb_uri), args.mongodb_db);
    info!(
        "Connect policy: {} attempts, backoff {}ms x{} (cap {}ms), cool-down {}ms",
        retry.max_attempts,
        retry.backoff_base_ms,
        retry.backoff_factor,
        retry.backoff_cap_ms,
        retry.cooldown_ms
    );
    info!("Data call wait bound: {}ms", retry.wait_timeout_ms);
    info!("Admin account: {}", args.admin_email);
    info!("======================================");

    let state = Arc::new(server::AppState::new(args)?);

    // The database is connected in the background; the port opens regardless
    server::run(state).await?;

    Ok(())
}
