//! Deadline sweep worker.
//!
//! The response deadline is a data attribute, not a live timer:
//! enforcement is sweep-driven. This loop periodically invokes the same
//! idempotent engine entry point used by interactive requests
//! (`sweep_expired`), so there is no separate cancellation code path.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, error};

/// Runs forever, sweeping expired appointments every `interval`. Safe
/// to run concurrently with in-flight confirmations: rows locked by a
/// live transition are skipped and picked up on the next pass.
pub async fn run_deadline_sweeper(pool: PgPool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match caresync_db::repositories::lifecycle::sweep_expired(&pool, Utc::now()).await {
            Ok(events) if events.is_empty() => {
                debug!("Deadline sweep found nothing to cancel");
            }
            Ok(events) => {
                debug!("Deadline sweep cancelled {} appointment(s)", events.len());
            }
            Err(e) => {
                // The next pass retries; a failed sweep must not kill the worker.
                error!("Deadline sweep failed: {}", e);
            }
        }
    }
}
