//! League live-ops server.
//!
//! Serves the admin, display and voting front-ends over HTTP and WebSocket,
//! backed by PostgreSQL or, for demos, an in-memory store.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use log::info;
use lpc_live::db::{Database, Stores};
use lpc_server::{
    api,
    config::{ServerConfig, StorageMode},
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run the league live-ops server

USAGE:
  lpc_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep everything in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  LPC_STORAGE              Set to `memory` for the in-memory store
  METRICS_BIND             Prometheus scrape address; metrics are off when unset
  LPC_CHECKPOINT_DIR       Directory for timer checkpoints
  RUST_LOG                 Log filter (e.g., info,lpc_live=debug)
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exposed on {}", addr);
    }

    let (stores, database) = match config.storage {
        StorageMode::Memory => {
            info!("Using in-memory storage; records are lost on exit");
            (Stores::memory(), None)
        }
        StorageMode::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            let store = db.store();
            store.migrate().await.context("Failed to run migrations")?;
            info!("Database connected successfully");
            (Stores::from_store(Arc::new(store)), Some(db))
        }
    };

    let state = api::AppState::new(&stores, config.live.clone(), database).await;
    let timers = state.timers.clone();
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    timers.shutdown_all().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
