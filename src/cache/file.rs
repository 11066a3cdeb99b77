//! On-disk cache, one JSON file per key
//!
//! File names are the SHA256 of the key so arbitrary module paths are safe
//! to store. Writes go to a temporary sibling first and are renamed into
//! place, so concurrent writers never leave a torn entry behind.

use super::{CacheEntry, Clock, SystemClock, VersionCache};
use crate::error::{GoptError, GoptResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Marker recording when the last sweep ran
const SWEEP_MARKER: &str = ".last_sweep";

/// Cache stored under a directory on disk
pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> GoptResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| GoptError::io(format!("creating cache dir {}", dir.display()), e))?;

        Ok(Self {
            dir,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default location under the system temp directory
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("gopt").join("latest_cache")
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sweep expired entries if the last sweep is older than `interval`
    pub async fn sweep_if_due(&self, interval: Duration) -> GoptResult<usize> {
        let marker = self.dir.join(SWEEP_MARKER);
        let now = self.clock.now();

        let last = fs::read_to_string(&marker)
            .await
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| t.with_timezone(&Utc));

        if last.is_some_and(|t| now - t < interval) {
            return Ok(0);
        }

        let removed = self.sweep().await?;
        fs::write(&marker, now.to_rfc3339())
            .await
            .map_err(|e| GoptError::io("writing cache sweep marker", e))?;
        Ok(removed)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    async fn read_entry(path: &Path) -> GoptResult<Option<CacheEntry>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GoptError::io(
                    format!("reading cache file {}", path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                debug!("Discarding corrupt cache file {}: {}", path.display(), e);
                remove_if_exists(path).await?;
                Ok(None)
            }
        }
    }

    async fn json_files(&self) -> GoptResult<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GoptError::io("reading cache directory", e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GoptError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

async fn remove_if_exists(path: &Path) -> GoptResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(GoptError::io(
            format!("removing cache file {}", path.display()),
            e,
        )),
    }
}

#[async_trait]
impl VersionCache for FileCache {
    async fn get(&self, key: &str) -> GoptResult<Option<serde_json::Value>> {
        let path = self.entry_path(key);
        let entry = match Self::read_entry(&path).await? {
            Some(entry) if entry.key == key => entry,
            _ => return Ok(None),
        };

        // Expired files are left for `sweep`; another process may be rewriting this path
        if entry.is_expired_at(self.clock.now()) {
            debug!("Cache entry {} is expired", key);
            return Ok(None);
        }

        debug!("Cache hit for {}", key);
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> GoptResult<()> {
        let path = self.entry_path(key);
        let entry = CacheEntry::new(key, value, self.clock.now(), ttl);
        let content = serde_json::to_string(&entry)?;

        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, content)
            .await
            .map_err(|e| GoptError::io(format!("writing cache file {}", tmp.display()), e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(GoptError::io(
                format!("writing cache file {}", path.display()),
                e,
            ));
        }

        debug!("Cached {} until {}", key, entry.expires_at);
        Ok(())
    }

    async fn remove(&self, key: &str) -> GoptResult<()> {
        remove_if_exists(&self.entry_path(key)).await
    }

    async fn clear(&self) -> GoptResult<usize> {
        let files = self.json_files().await?;
        for path in &files {
            remove_if_exists(path).await?;
        }
        Ok(files.len())
    }

    async fn sweep(&self) -> GoptResult<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        for path in self.json_files().await? {
            match Self::read_entry(&path).await? {
                Some(entry) if !entry.is_expired_at(now) => {}
                Some(_) => {
                    remove_if_exists(&path).await?;
                    removed += 1;
                }
                // Corrupt files are already gone
                None => removed += 1,
            }
        }

        debug!("Swept {} expired cache entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_cache() -> (FileCache, Arc<ManualClock>, TempDir) {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = FileCache::open(temp.path().join("cache"))
            .await
            .unwrap()
            .with_clock(clock.clone());
        (cache, clock, temp)
    }

    #[tokio::test]
    async fn set_and_get() {
        let (cache, _clock, _temp) = test_cache().await;

        cache
            .set("golang.org/x/tools", json!({"Version": "v0.20.0"}), Duration::hours(1))
            .await
            .unwrap();
        let value = cache.get("golang.org/x/tools").await.unwrap().unwrap();

        assert_eq!(value["Version"], "v0.20.0");
        assert!(cache.has("golang.org/x/tools").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_until_swept() {
        let (cache, clock, _temp) = test_cache().await;
        cache.set("k", json!("v"), Duration::hours(1)).await.unwrap();

        clock.advance(Duration::hours(1));

        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.entry_path("k").exists());

        assert_eq!(cache.sweep().await.unwrap(), 1);
        assert!(!cache.entry_path("k").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_leave_one_whole_entry() {
        let (cache, _clock, _temp) = test_cache().await;
        let cache = Arc::new(cache);

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .set(
                            "github.com/a/tool",
                            json!({"Version": format!("v1.0.{i}")}),
                            Duration::hours(1),
                        )
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let value = cache.get("github.com/a/tool").await.unwrap().unwrap();
        let version = value["Version"].as_str().unwrap().to_string();
        assert!((0..16).any(|i| version == format!("v1.0.{i}")));

        let names: Vec<_> = std::fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.iter().filter(|n| n.ends_with(".json")).count(), 1);
        assert!(!names.iter().any(|n| n.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn survives_reopen() {
        let (cache, _clock, _temp) = test_cache().await;
        cache.set("k", json!(42), Duration::hours(1)).await.unwrap();

        let reopened = FileCache::open(cache.dir().to_path_buf()).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), Some(json!(42)));
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let (cache, _clock, _temp) = test_cache().await;
        std::fs::write(cache.entry_path("k"), "{not json").unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
        assert!(!cache.entry_path("k").exists());
    }

    #[tokio::test]
    async fn set_leaves_no_temp_files() {
        let (cache, _clock, _temp) = test_cache().await;
        cache.set("a", json!(1), Duration::hours(1)).await.unwrap();
        cache.set("a", json!(2), Duration::hours(1)).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
        assert_eq!(cache.get("a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let (cache, clock, _temp) = test_cache().await;
        cache.set("short", json!(1), Duration::minutes(5)).await.unwrap();
        cache.set("long", json!(2), Duration::hours(2)).await.unwrap();

        clock.advance(Duration::minutes(10));

        assert_eq!(cache.sweep().await.unwrap(), 1);
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_if_due_respects_interval() {
        let (cache, clock, _temp) = test_cache().await;
        cache.set("short", json!(1), Duration::minutes(5)).await.unwrap();

        // First call always sweeps and records the marker
        assert_eq!(cache.sweep_if_due(Duration::hours(1)).await.unwrap(), 0);

        clock.advance(Duration::minutes(10));
        assert_eq!(cache.sweep_if_due(Duration::hours(1)).await.unwrap(), 0);

        clock.advance(Duration::hours(1));
        assert_eq!(cache.sweep_if_due(Duration::hours(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let (cache, _clock, _temp) = test_cache().await;
        cache.set("a", json!(1), Duration::hours(1)).await.unwrap();
        cache.set("b", json!(2), Duration::hours(1)).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.get("a").await.unwrap().is_none());
    }
}
