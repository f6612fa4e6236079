//! On-disk cache of the last successfully downloaded definitions

use super::definitions::{DefinitionBundle, DefinitionTier};
use super::error::EolError;
use crate::common::Clock;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

const CACHE_FILE_NAME: &str = "eol-definitions.json";

#[derive(Debug, Serialize, Deserialize)]
struct CachedDefinitions {
    fetched_at: DateTime<Utc>,
    /// Dataset exactly as downloaded
    definitions: String,
    query: String,
}

/// Definition cache with an explicit max-age invalidation policy.
///
/// Copies older than `max_age` (by the injected clock) are due for a refresh
/// but stay usable as a fallback.
#[derive(Clone)]
pub struct DefinitionCache {
    dir: PathBuf,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl DefinitionCache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Replace the cached copy. The file is swapped in atomically.
    pub fn store(&self, definitions_json: &str, query: &str) -> Result<(), EolError> {
        fs::create_dir_all(&self.dir)?;
        let entry = CachedDefinitions {
            fetched_at: self.clock.now(),
            definitions: definitions_json.to_string(),
            query: query.to_string(),
        };

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.flush()?;
        file.persist(self.path()).map_err(|e| EolError::Io(e.error))?;

        debug!("Cached EOL definitions at {}", self.path().display());
        Ok(())
    }

    /// The cached bundle at any age, or `None` when there is no copy
    pub fn load(&self) -> Result<Option<DefinitionBundle>, EolError> {
        let path = self.path();
        if !path.exists() {
            debug!("No cached EOL definitions at {}", path.display());
            return Ok(None);
        }

        let entry: CachedDefinitions = serde_json::from_str(&fs::read_to_string(&path)?)?;
        DefinitionBundle::parse(
            &entry.definitions,
            &entry.query,
            DefinitionTier::Cache,
            Some(entry.fetched_at),
        )
        .map(Some)
    }

    /// The cached bundle only while it is younger than `max_age`
    pub fn load_fresh(&self) -> Result<Option<DefinitionBundle>, EolError> {
        Ok(self.load()?.filter(|bundle| {
            let fresh = self.is_fresh(bundle);
            if !fresh {
                debug!(
                    "Cached EOL definitions are {}h old (max {}h), refresh needed",
                    self.age(bundle).num_hours(),
                    self.max_age.num_hours()
                );
            }
            fresh
        }))
    }

    /// Time since the bundle was downloaded; zero when unknown
    pub fn age(&self, bundle: &DefinitionBundle) -> Duration {
        bundle
            .fetched_at
            .map(|fetched_at| self.clock.now() - fetched_at)
            .unwrap_or_else(Duration::zero)
    }

    pub fn is_fresh(&self, bundle: &DefinitionBundle) -> bool {
        self.age(bundle) <= self.max_age
    }

    /// Delete the cached copy. Returns whether anything was removed.
    pub fn invalidate(&self) -> Result<bool, EolError> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        debug!("Removed cached EOL definitions at {}", path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FixedClock;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const DATASET: &str =
        r#"{"1": {"ServiceName": "Load Balancer", "RetirementDate": "2025-09-30"}}"#;

    fn at(hour: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()))
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = DefinitionCache::new(dir.path(), Duration::hours(24), at(0));
        cache.store(DATASET, "resources | project id").unwrap();

        let bundle = cache.load().unwrap().unwrap();
        assert_eq!(bundle.tier, DefinitionTier::Cache);
        assert_eq!(bundle.definitions.len(), 1);
        assert_eq!(bundle.query_template, "resources | project id");
        assert_eq!(
            bundle.fetched_at,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_cache_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = DefinitionCache::new(dir.path().join("nested"), Duration::hours(24), at(0));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_expired_copy_is_not_fresh_but_still_loads() {
        let dir = TempDir::new().unwrap();
        DefinitionCache::new(dir.path(), Duration::hours(2), at(0))
            .store(DATASET, "resources")
            .unwrap();

        let fresh = DefinitionCache::new(dir.path(), Duration::hours(2), at(2));
        assert!(fresh.load_fresh().unwrap().is_some());

        let stale = DefinitionCache::new(dir.path(), Duration::hours(2), at(3));
        assert!(stale.load_fresh().unwrap().is_none());
        let bundle = stale.load().unwrap().unwrap();
        assert!(!stale.is_fresh(&bundle));
        assert_eq!(stale.age(&bundle), Duration::hours(3));
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cache = DefinitionCache::new(dir.path(), Duration::hours(24), at(0));
        fs::write(cache.path(), "{ not json").unwrap();
        assert!(cache.load().is_err());
    }

    #[test]
    fn test_invalidate() {
        let dir = TempDir::new().unwrap();
        let cache = DefinitionCache::new(dir.path(), Duration::hours(24), at(0));
        assert!(!cache.invalidate().unwrap());
        cache.store(DATASET, "resources").unwrap();
        assert!(cache.invalidate().unwrap());
        assert!(cache.load().unwrap().is_none());
    }
}
