//! rowcheck-web - Spreadsheet row validation service
//!
//! Accepts .xlsx uploads, validates each row in the background, and serves
//! the processed spreadsheet and a PDF report per upload.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rowcheck_common::config::{load_toml_config, ConfigOverrides, ServiceConfig};
use rowcheck_common::SystemClock;
use rowcheck_web::services::ReportPipeline;
use rowcheck_web::storage::Storage;
use rowcheck_web::store::TaskStore;
use rowcheck_web::worker::{WorkerPool, SHUTDOWN_TIMEOUT};
use rowcheck_web::AppState;

/// Command-line arguments for rowcheck-web
#[derive(Parser, Debug)]
#[command(name = "rowcheck-web")]
#[command(about = "Spreadsheet row validation service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ROWCHECK_PORT")]
    port: Option<u16>,

    /// Interface to bind to
    #[arg(short, long, env = "ROWCHECK_BIND")]
    bind: Option<String>,

    /// Directory for uploads and generated results
    #[arg(short, long, env = "ROWCHECK_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Number of processing workers
    #[arg(short, long, env = "ROWCHECK_WORKERS")]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ROWCHECK_LOG_LEVEL")]
    log_level: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "ROWCHECK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration file")?;
    let overrides = ConfigOverrides {
        storage_root: args.storage_root,
        bind_address: args.bind,
        port: args.port,
        worker_count: args.workers,
        log_level: args.log_level,
    };
    let config =
        ServiceConfig::resolve(overrides, file_config).context("Invalid configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", config.log_level.to_ascii_lowercase()).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting rowcheck-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = args.config.as_ref().filter(|p| !p.exists()) {
        warn!("Config file not found: {} (using defaults)", path.display());
    }

    let storage = Storage::open(&config.storage_root).with_context(|| {
        format!(
            "Failed to initialize storage root {}",
            config.storage_root.display()
        )
    })?;
    info!("Storage root: {}", storage.root().display());

    let store = Arc::new(TaskStore::new());
    let pipeline = Arc::new(ReportPipeline::new(storage.clone(), Arc::new(SystemClock)));
    let pool = WorkerPool::start(config.workers, Arc::clone(&store), pipeline);

    let state = AppState::new(store, storage, pool.dispatcher(), config.max_upload_bytes);
    let app = rowcheck_web::build_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("Listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.shutdown(SHUTDOWN_TIMEOUT).await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
