//! repo-pulse - Repository Health Aggregation Backend
//!
//! Ingests per-change-request risk assessments and maintains a running
//! health score plus bounded recent history for each tracked repository.
//! Falls back to a bounded in-memory store when the database is
//! unavailable.

use std::net::SocketAddr;

use axum::{middleware, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_pulse::api;
use repo_pulse::store::PostgresStore;
use repo_pulse::{Aggregator, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_pulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router
fn build_router(aggregator: Aggregator) -> Router {
    api::create_router()
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(aggregator)
}

/// Connect the durable store if configured and reachable. An unreachable
/// database is logged and tolerated: the service starts memory-only and
/// the liveness endpoint reports `durable: false`.
async fn connect_durable(config: &Config) -> anyhow::Result<Option<PgPool>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory store only (demo mode)");
        return Ok(None);
    };

    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.store_timeout())
        .connect(database_url)
        .await;

    match pool {
        Ok(pool) => {
            // A reachable database with missing tables is an operator
            // error, not an outage; refuse to start.
            if !repo_pulse::db::check_schema(&pool).await? {
                anyhow::bail!("Database schema is not complete. Please run migrations.");
            }
            tracing::info!("Database connected successfully");
            Ok(Some(pool))
        }
        Err(e) => {
            tracing::warn!(
                "Could not connect to database, falling back to in-memory store: {}",
                e
            );
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting repo-pulse server");

    let pool = connect_durable(&config).await?;
    let durable = pool.clone().map(PostgresStore::new);
    let aggregator = Aggregator::new(durable, config.store_timeout());

    tracing::info!("Listening on http://{}", addr);

    // Build router and start server
    let app = build_router(aggregator);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed.");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
