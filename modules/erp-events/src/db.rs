use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connect to the database holding the outbox table
///
/// - `DB_MAX_CONNECTIONS` (default 5): the relay needs one connection for
///   fetching and one for each flush
/// - `DB_MIN_CONNECTIONS` (default 0)
/// - `DB_ACQUIRE_TIMEOUT_SECS` (default 3)
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let max_connections = std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(5);

    let min_connections = std::env::var("DB_MIN_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);

    let acquire_timeout_secs = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(database_url)
        .await
}
