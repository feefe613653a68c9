//! Job cache.
//!
//! A process-wide map from video ID to [`JobRecord`]. It is constructed
//! explicitly and shared through an `Arc`; there is no global instance.
//! The lock is only ever held for the duration of a single call, never across
//! an `.await`.

use crate::error::Result;
use crate::job::JobRecord;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// In-memory job store keyed by video ID.
#[derive(Debug, Default)]
pub struct JobCache {
    records: RwLock<HashMap<String, JobRecord>>,
}

impl JobCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the record for a video.
    pub fn get(&self, video_id: &str) -> Option<JobRecord> {
        self.read().get(video_id).cloned()
    }

    /// Replace the record for a video. Last writer wins.
    pub fn put(&self, video_id: &str, record: JobRecord) {
        self.write().insert(video_id.to_string(), record);
    }

    /// Remove the record for a video.
    pub fn delete(&self, video_id: &str) -> Option<JobRecord> {
        self.write().remove(video_id)
    }

    /// Atomically read-modify-write the current record.
    ///
    /// `apply` sees the record as stored right now, so updates made by other
    /// tasks between suspension points are never clobbered. Returns the record
    /// after the update, or `None` if there is no record.
    pub fn update<F>(&self, video_id: &str, apply: F) -> Option<JobRecord>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut records = self.write();
        let record = records.get_mut(video_id)?;
        apply(record);
        Some(record.clone())
    }

    /// Snapshot of all entries, for diagnostic and administrative scans.
    pub fn entries(&self) -> impl Iterator<Item = (String, JobRecord)> {
        let snapshot: Vec<(String, JobRecord)> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        snapshot.into_iter()
    }

    /// Locate a record by the provider's job ID.
    pub fn find_by_external_job_id(&self, external_job_id: &str) -> Option<(String, JobRecord)> {
        self.entries()
            .find(|(_, record)| record.external_job_id.as_deref() == Some(external_job_id))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Load a JSON snapshot written by [`JobCache::save_to`]. A missing file yields an empty cache.
    pub fn load_from(path: &Path) -> Result<Self> {
        let cache = Self::new();
        if !path.exists() {
            debug!("No cache snapshot at {}", path.display());
            return Ok(cache);
        }

        let content = std::fs::read_to_string(path)?;
        let records: Vec<JobRecord> = serde_json::from_str(&content)?;
        {
            let mut map = cache.write();
            for record in records {
                map.insert(record.video_id.clone(), record);
            }
        }

        info!("Loaded {} cached jobs from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Write every record to a JSON snapshot.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut records: Vec<JobRecord> = self.entries().map(|(_, record)| record).collect();
        records.sort_by(|a, b| a.video_id.cmp(&b.video_id));

        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, content)?;
        info!("Saved {} cached jobs to {}", records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobPhase;
    use chrono::Utc;

    #[test]
    fn test_put_get_delete() {
        let cache = JobCache::new();
        assert!(cache.is_empty());

        cache.put("abc", JobRecord::pending("abc", Utc::now()));
        assert_eq!(cache.get("abc").map(|r| r.phase), Some(JobPhase::Pending));
        assert_eq!(cache.len(), 1);

        cache.delete("abc");
        assert!(cache.get("abc").is_none());
    }

    #[test]
    fn test_update_sees_current_record() {
        let cache = JobCache::new();
        let now = Utc::now();
        cache.put("abc", JobRecord::pending("abc", now));

        // A stale copy taken before another writer ran.
        let stale = cache.get("abc").unwrap();
        cache.update("abc", |r| r.mark_submitted("job-1", now));

        let updated = cache
            .update("abc", |r| r.mark_polling(Some(0.5), now))
            .unwrap();
        assert_eq!(stale.external_job_id, None);
        assert_eq!(updated.external_job_id.as_deref(), Some("job-1"));
        assert_eq!(updated.progress, Some(0.5));

        assert!(cache.update("missing", |r| r.mark_polling(None, now)).is_none());
    }

    #[test]
    fn test_find_by_external_job_id() {
        let cache = JobCache::new();
        let now = Utc::now();
        let mut record = JobRecord::pending("abc", now);
        record.mark_submitted("job-1", now);
        cache.put("abc", record);
        cache.put("def", JobRecord::pending("def", now));

        let (video_id, _) = cache.find_by_external_job_id("job-1").unwrap();
        assert_eq!(video_id, "abc");
        assert!(cache.find_by_external_job_id("job-2").is_none());
        assert_eq!(cache.entries().count(), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.json");

        let cache = JobCache::new();
        let now = Utc::now();
        let mut record = JobRecord::pending("abc", now);
        record.mark_submitted("job-1", now);
        cache.put("abc", record.clone());
        cache.save_to(&path).unwrap();

        let loaded = JobCache::load_from(&path).unwrap();
        assert_eq!(loaded.get("abc"), Some(record));

        let empty = JobCache::load_from(&dir.path().join("missing.json")).unwrap();
        assert!(empty.is_empty());
    }
}
