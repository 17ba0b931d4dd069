//! dealdesk - Real-Estate Transaction Negotiation Engine
//!
//! Entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│ Gateway  │───▶│ DealService  │───▶│  Store   │
//! │  (YAML)  │    │  (axum)  │    │ (FSM+offers) │    │ (Pg/mem) │
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! With `postgres_url` set the service runs on PostgreSQL; without it
//! the in-memory store is used (dev mode, no durability).

use std::sync::Arc;
use std::time::Duration;

use dealdesk::engine::{
    DealService, DealStore, MemoryStore, PgStore, PropertyRecord, PropertyStatus, TransactionCache,
    ViewCache,
};
use dealdesk::gateway::{build_router, AppState};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

/// Seed a few properties so the API is exercisable out of the box.
async fn seed_demo_properties(store: &MemoryStore) {
    for owner_id in [1u64, 2, 3] {
        let property_id = dealdesk::engine::PropertyId::new();
        store
            .upsert_property(PropertyRecord {
                property_id,
                owner_id,
                status: PropertyStatus::Available,
            })
            .await;
        tracing::info!(%property_id, owner_id, "seeded demo property");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = dealdesk::config::AppConfig::load(&env)?;
    let _log_guard = dealdesk::logging::init_logging(&config);

    tracing::info!(env = %env, "starting dealdesk");

    let store: Arc<dyn DealStore> = match &config.postgres_url {
        Some(url) => {
            let db = dealdesk::db::Database::connect(url).await?;
            db.health_check().await?;
            Arc::new(PgStore::new(db.pool().clone()))
        }
        None => {
            tracing::warn!("no postgres_url configured, using in-memory store (no durability)");
            let store = MemoryStore::new();
            seed_demo_properties(&store).await;
            Arc::new(store)
        }
    };

    let cache: Arc<dyn TransactionCache> =
        Arc::new(ViewCache::new(Duration::from_secs(config.cache_ttl_secs)));
    let service = Arc::new(DealService::new(store, cache));

    let port = get_port_override().unwrap_or(config.gateway.port);
    let addr = format!("{}:{}", config.gateway.host, port);

    let app = build_router(AppState { service });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
