use std::time::Duration;

use chrono::Utc;
use log::*;
use reservation_engine::{db_types::ReservationId, RedisInventoryStore, ReservationApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each tick finalises up to `batch_size` past-due reservations, restoring their units to the pool. Restarting the
/// worker is safe: the release is atomic and idempotent, so a crashed sweeper just catches up on its next tick
/// without ever double-restoring stock.
pub fn start_expiry_worker(
    api: ReservationApi<RedisInventoryStore, SqliteDatabase>,
    interval: Duration,
    batch_size: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Reservation expiry worker started (every {interval:?}, batch size {batch_size})");
        loop {
            timer.tick().await;
            match api.release_expired(Utc::now(), batch_size).await {
                Ok(result) => {
                    if result.total_count() > 0 {
                        info!(
                            "🕰️ {} reservations expired, {} units restored",
                            result.released_count(),
                            result.restored_units
                        );
                        debug!("🕰️ Released: {}", id_list(&result.released));
                        if result.already_finalised > 0 {
                            debug!(
                                "🕰️ {} due entries were already finalised by a confirm or cancel",
                                result.already_finalised
                            );
                        }
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running reservation expiry job: {e}");
                },
            }
        }
    })
}

fn id_list(ids: &[ReservationId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<String>>().join(", ")
}
