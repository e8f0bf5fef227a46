//! Background cache sweeper.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::inventory::CatalogCache;

/// Run [`CatalogCache::sweep`] every `period` until `token` is cancelled.
pub fn spawn_sweeper(
    cache: Arc<CatalogCache>,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Cache sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = cache.sweep(Instant::now());
                    debug!(
                        evicted = report.evicted(),
                        remaining = report.remaining,
                        "Cache sweep finished"
                    );
                }
            }
        }
    })
}
