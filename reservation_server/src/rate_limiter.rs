//! Per-user admission gate in front of the reserve endpoint.
//!
//! A fixed window counter at `ratelimit:{user_id}:{path}` in the shared Redis keyspace: the first request of a window
//! starts the clock, and requests beyond the cap are refused with the window's remaining time as `retry_after`. The
//! engine stays correct under any admission rate; this gate only protects capacity.
use log::warn;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::errors::ServerError;

const WINDOW_SECONDS: i64 = 60;

#[derive(Clone)]
pub struct RateLimiter {
    conn: Option<ConnectionManager>,
    max_per_window: u32,
}

impl RateLimiter {
    pub fn new(conn: ConnectionManager, max_per_window: u32) -> Self {
        Self { conn: Some(conn), max_per_window }
    }

    /// A limiter that admits everything. Used in tests and single-process deployments without Redis.
    pub fn disabled() -> Self {
        Self { conn: None, max_per_window: 0 }
    }

    pub async fn check(&self, user_id: &str, path: &str) -> Result<(), ServerError> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        let mut conn = conn.clone();
        let key = format!("ratelimit:{user_id}:{path}");
        let count: i64 = conn.incr(&key, 1).await.map_err(|e| ServerError::BackendUnavailable(e.to_string()))?;
        if count == 1 {
            let _: () =
                conn.expire(&key, WINDOW_SECONDS).await.map_err(|e| ServerError::BackendUnavailable(e.to_string()))?;
        }
        if count > i64::from(self.max_per_window) {
            let ttl: i64 = conn.ttl(&key).await.map_err(|e| ServerError::BackendUnavailable(e.to_string()))?;
            let retry_after = if ttl > 0 { ttl } else { WINDOW_SECONDS };
            warn!("🚦️ Rate limit exceeded for user {user_id} on {path}: {count}/{}", self.max_per_window);
            return Err(ServerError::RateLimited { retry_after });
        }
        Ok(())
    }
}
