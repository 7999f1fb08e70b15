use event_bus::{EventBus, InMemoryBus, NatsBus};
use event_outbox::{OutboxDrainLoop, PgOutboxStore, MIGRATOR};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use erp_events::config::{BusType, Config};
use erp_events::{db, version_registry, IntegrationEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting outbox relay...");

    let config = Config::from_env()?;

    tracing::info!(
        bus_type = ?config.bus_type,
        interval_secs = config.drain.interval.as_secs(),
        batch_size = config.drain.batch_size,
        "Configuration loaded"
    );

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    let bus: Arc<dyn EventBus> = match config.bus_type {
        BusType::InMemory => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        BusType::Nats => {
            tracing::info!(url = %config.nats_url, "Connecting to NATS");
            Arc::new(NatsBus::connect(&config.nats_url).await?)
        }
    };

    let types = IntegrationEvent::type_registry();
    let versions = version_registry();
    tracing::info!(event_types = ?types.event_types(), "Event registries loaded");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let relay = OutboxDrainLoop::new(
        Arc::new(PgOutboxStore::new(pool.clone())),
        bus,
        Arc::new(types),
        Arc::new(versions),
    )
    .with_config(config.drain)
    .spawn(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, finishing current drain cycle");

    // Receiver may already be gone if the loop exited on its own
    let _ = shutdown_tx.send(());
    relay.await?;

    pool.close().await;
    tracing::info!("Outbox relay stopped");

    Ok(())
}
