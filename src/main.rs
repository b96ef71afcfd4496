use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roadwatch_engine::{
    api::{create_router, ApiState},
    config::EngineConfig,
    DatabasePool, ScoringEngine, TierTable,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_logging(&config)?;

    info!("Starting RoadWatch scoring & ledger engine");

    let mut engine = ScoringEngine::new(config.rewards.clone())
        .with_tier_table(TierTable::with_payout_minimums(&config.payouts));

    if config.database.postgres_enabled {
        match DatabasePool::new(&config.database.postgres_url).await {
            Ok(db) => {
                let db = Arc::new(db);
                db.init_schema().await.context("Schema init failed")?;
                engine = engine.with_database(db);
                info!("PostgreSQL write-through enabled");
            }
            Err(e) => {
                warn!(error = %e, "PostgreSQL unavailable, running in-memory only");
            }
        }
    } else {
        info!("PostgreSQL disabled, running in-memory only");
    }

    let app = create_router(ApiState { engine }).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

fn init_logging(config: &EngineConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}
