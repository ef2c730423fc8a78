//! florai-alerts - Occurrence prediction and alerting service
//!
//! Classifies map locations through the model server, records predictions,
//! and writes in-app alerts for users who opted in.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use florai_common::config::{load_config, ConfigOrigin};
use florai_common::db::{init_database, SqliteDocumentStore};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use florai_alerts::classifier::HttpClassifier;
use florai_alerts::notify::NotificationPipeline;
use florai_alerts::AppState;

/// Command-line arguments for florai-alerts
#[derive(Parser, Debug)]
#[command(name = "florai-alerts")]
#[command(about = "Invasive species occurrence prediction and alerting service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "FLORAI_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides the config file)
    #[arg(short, long, env = "FLORAI_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, origin) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("florai_alerts={0},florai_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting florai-alerts v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &origin {
        ConfigOrigin::File(_) => info!("Configuration: {}", origin),
        ConfigOrigin::MissingFile(_) | ConfigOrigin::Defaults => {
            warn!("Configuration: {}", origin)
        }
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    info!("Database: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteDocumentStore::new(pool));

    let classifier =
        Arc::new(HttpClassifier::new(&config.classifier).context("Failed to build model client")?);
    info!(
        url = %config.classifier.url,
        model_id = %config.classifier.model_id,
        "Model server configured"
    );

    let pipeline = NotificationPipeline::from_config(store, classifier, &config)
        .context("Invalid notification settings")?;
    let settings = pipeline.settings();
    info!(
        notifications_enabled = settings.notifications_enabled,
        fail_closed = settings.fail_closed_on_store_error,
        "Notification pipeline ready"
    );

    let app = florai_alerts::build_router(AppState::new(Arc::new(pipeline)));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
