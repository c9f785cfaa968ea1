use self::cache_sweep::cache_sweep_job;
use crate::{config::AppConfig, state::AppState};

pub mod cache_sweep;

pub fn spawn_all_jobs(state: &AppState, config: &AppConfig) {
    let cache = state.profile_cache.clone();
    let period = config.cache_sweep_interval;
    // spawn job to drop expired profile cache entries
    tokio::spawn(async move {
        cache_sweep_job(cache, period).await;
    });
}
