//! Periodic removal of expired pending codes.
//!
//! Expired codes are already rejected on redemption; the sweep keeps the
//! store from growing with codes nobody came back for.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::codes::PendingCodeStore;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(codes: Arc<dyn PendingCodeStore>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Pending code sweeper started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Pending code sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_once(codes.as_ref()).await;
            }
        }
    }
}

/// Purge expired codes once, logging the outcome.
pub async fn sweep_once(codes: &dyn PendingCodeStore) -> u64 {
    match codes.purge_expired(Utc::now()).await {
        Ok(purged) => {
            if purged > 0 {
                tracing::info!(purged, "Pending code sweeper: purged expired codes");
            } else {
                tracing::debug!("Pending code sweeper: nothing to purge");
            }
            purged
        }
        Err(e) => {
            tracing::error!(error = %e, "Pending code sweeper: purge failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    use super::*;
    use crate::codes::{CodePurpose, MemoryCodeStore, PendingCode};

    #[tokio::test]
    async fn sweep_purges_only_expired_codes() {
        let store = MemoryCodeStore::new();
        for (code, ttl) in [("stale", -5), ("fresh", 5)] {
            store
                .insert(PendingCode {
                    purpose: CodePurpose::Pickup,
                    code: code.into(),
                    payload: json!({}),
                    expires_at: Utc::now() + ChronoDuration::minutes(ttl),
                })
                .await
                .unwrap();
        }

        assert_eq!(sweep_once(&store).await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let store: Arc<dyn PendingCodeStore> = Arc::new(MemoryCodeStore::new());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(store, cancel.clone()));

        cancel.cancel();
        let joined = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(joined.is_ok(), "sweeper should exit promptly after cancel");
    }
}
