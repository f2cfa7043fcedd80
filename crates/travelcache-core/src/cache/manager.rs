use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{LocalRecordStore, RecordSet, StoreError};

/// Default staleness window for cached travel data.
pub const DEFAULT_STALE_MINUTES: i64 = 60;

const RECORDS_FILE: &str = "travels";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        age_minutes(self.cached_at)
    }

    pub fn age_display(&self) -> String {
        age_display(self.cached_at)
    }

    pub fn is_stale(&self, stale_minutes: i64) -> bool {
        self.age_minutes() > stale_minutes
    }
}

pub fn age_minutes(cached_at: DateTime<Utc>) -> i64 {
    (Utc::now() - cached_at).num_minutes()
}

/// Human-readable cache age: "just now", "5m ago", "2h ago", "3d ago".
pub fn age_display(cached_at: DateTime<Utc>) -> String {
    let minutes = age_minutes(cached_at);
    if minutes < 1 {
        // Clock skew lands here too
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// File-backed record store.
///
/// Records live in one JSON document. A commit writes a staging file next to
/// it and renames it over the live file, so a failed save never leaves a
/// half-written cache behind.
pub struct JsonRecordStore {
    cache_dir: PathBuf,
    current: Option<CachedData<RecordSet>>,
}

impl JsonRecordStore {
    /// Open (or create) a store under `cache_dir`, loading any existing data.
    pub fn open(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;

        let mut store = Self {
            cache_dir,
            current: None,
        };
        store.current = match store.load(RECORDS_FILE) {
            Ok(cached) => cached,
            Err(e) => {
                // The next refresh rewrites it
                warn!(error = %e, "Discarding unreadable travel cache");
                None
            }
        };
        Ok(store)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn staging_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json.tmp", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, cached: &CachedData<T>) -> Result<()> {
        let staging = self.staging_path(name);
        let contents = serde_json::to_string_pretty(cached)?;
        std::fs::write(&staging, contents)
            .with_context(|| format!("Failed to write staging file: {}", staging.display()))?;

        if let Err(e) = std::fs::rename(&staging, self.cache_path(name)) {
            let _ = std::fs::remove_file(&staging);
            return Err(e).with_context(|| format!("Failed to swap in cache file: {}", name));
        }
        Ok(())
    }

    pub fn age_display(&self) -> Option<String> {
        self.current.as_ref().map(CachedData::age_display)
    }

    /// True when nothing is cached or the cache is older than `stale_minutes`.
    pub fn is_stale(&self, stale_minutes: i64) -> bool {
        self.current
            .as_ref()
            .map(|cached| cached.is_stale(stale_minutes))
            .unwrap_or(true)
    }
}

impl LocalRecordStore for JsonRecordStore {
    fn snapshot(&self) -> Result<RecordSet, StoreError> {
        Ok(self
            .current
            .as_ref()
            .map(|cached| cached.data.clone())
            .unwrap_or_default())
    }

    fn commit(&mut self, records: RecordSet) -> Result<(), StoreError> {
        let cached = CachedData::new(records);
        self.save(RECORDS_FILE, &cached)?;
        debug!(
            travels = cached.data.travels.len(),
            segments = cached.data.segments.len(),
            "Travel cache committed"
        );
        self.current = Some(cached);
        Ok(())
    }

    fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|cached| cached.cached_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{segment, travel};
    use chrono::Duration;

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_age_display_rounding() {
        assert_eq!(age_display(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(70)), "1h ago");
        assert_eq!(age_display(Utc::now() - Duration::hours(60)), "3d ago");
        assert_eq!(age_display(Utc::now() + Duration::minutes(10)), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale(DEFAULT_STALE_MINUTES));

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale(DEFAULT_STALE_MINUTES));
    }

    #[test]
    fn test_json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut store = JsonRecordStore::open(dir.path().to_path_buf()).expect("open");
            assert!(store.is_stale(DEFAULT_STALE_MINUTES));
            store
                .replace_all(vec![travel(1)], vec![segment(1, 1, true)])
                .expect("replace");
        }

        let store = JsonRecordStore::open(dir.path().to_path_buf()).expect("reopen");
        let snapshot = store.snapshot().expect("snapshot");
        assert_eq!(snapshot.travels, vec![travel(1)]);
        assert_eq!(snapshot.segments.len(), 1);
        assert!(!store.is_stale(DEFAULT_STALE_MINUTES));
        assert_eq!(store.age_display().as_deref(), Some("just now"));
        assert!(!dir.path().join("travels.json.tmp").exists());
    }

    #[test]
    fn test_json_store_failed_commit_keeps_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonRecordStore::open(dir.path().to_path_buf()).expect("open");
        store.replace_all(vec![travel(1)], vec![]).expect("replace");

        // A directory in the way of the staging file makes the write fail
        std::fs::create_dir(dir.path().join("travels.json.tmp")).expect("block staging");
        let result = store.replace_all(vec![travel(2)], vec![]);
        assert!(result.is_err());

        assert_eq!(store.snapshot().expect("snapshot").travels, vec![travel(1)]);
        let reopened = JsonRecordStore::open(dir.path().to_path_buf()).expect("reopen");
        assert_eq!(reopened.snapshot().expect("snapshot").travels, vec![travel(1)]);
    }

    #[test]
    fn test_json_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("travels.json"), "{not json").expect("write");
        let store = JsonRecordStore::open(dir.path().to_path_buf()).expect("open");
        assert!(store.snapshot().expect("snapshot").is_empty());
    }
}
