//! Shared Redis connection setup.

use crate::config::mask_connection_string;
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use tracing::info;

/// Connects to Redis and validates the connection with a PING.
///
/// The returned [`ConnectionManager`] reconnects on its own and is cheap to clone,
/// so the redirect cache and the counter store share one.
///
/// # Errors
///
/// Returns the underlying [`RedisError`] if the URL is invalid, the connection
/// cannot be established, or the PING fails.
pub async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    info!("Connecting to Redis at {}", mask_connection_string(redis_url));

    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    conn.ping::<()>().await?;

    info!("✓ Connected to Redis");
    Ok(manager)
}
