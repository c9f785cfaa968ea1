use std::{sync::Arc, time::Duration};
use tokio::time::interval;

use crate::cache::Cache;

/// Periodically removes expired entries from the cache
pub async fn cache_sweep_job<V>(cache: Arc<dyn Cache<V>>, period: Duration) {
    tracing::debug!("initializing cache sweep job");
    let mut interval = interval(period);
    loop {
        interval.tick().await;
        sweep_expired(cache.as_ref());
    }
}

fn sweep_expired<V>(cache: &dyn Cache<V>) -> usize {
    let removed = cache.sweep();
    if removed > 0 {
        tracing::debug!("cache sweep removed {removed} expired entries");
    }
    removed
}
