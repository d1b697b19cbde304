use std::time::Duration;

use tracing::{info, warn};

use souk_api::auth::AppState;

/// Background task that prunes old, already-read notifications.
///
/// Runs on an interval and deletes read notifications older than the
/// configured retention window. Unread notifications are never pruned.
pub async fn run_prune_loop(state: AppState, retention_days: u32, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match state.db.prune_read_notifications(retention_days) {
            Ok(count) => {
                if count > 0 {
                    info!("Pruned {} read notifications", count);
                }
            }
            Err(e) => {
                warn!("Notification prune error: {}", e);
            }
        }
    }
}
