//! Job cache persistence between CLI runs.

use crate::cache::JobCache;
use crate::config::Settings;
use crate::error::Result;
use std::sync::Arc;
use tracing::warn;

/// Load the job cache snapshot, or start empty if persistence is off.
///
/// An unreadable snapshot is logged and replaced by an empty cache.
pub fn load_cache(settings: &Settings) -> Arc<JobCache> {
    let Some(path) = settings.snapshot_path() else {
        return Arc::new(JobCache::new());
    };

    match JobCache::load_from(&path) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!("Ignoring unreadable cache snapshot {}: {}", path.display(), e);
            Arc::new(JobCache::new())
        }
    }
}

/// Write the job cache snapshot if persistence is on.
pub fn save_cache(settings: &Settings, cache: &JobCache) -> Result<()> {
    match settings.snapshot_path() {
        Some(path) => cache.save_to(&path),
        None => Ok(()),
    }
}
