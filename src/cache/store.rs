// Cache store for metadata entries and binary blobs.
// Keeps a JSON index keyed by hashed key, with per-entry TTL checked lazily on access.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::{PipeyeError, Result};

use super::paths;

/// What a cache entry holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachePayload {
    /// Inline JSON value stored in the index itself.
    Metadata(serde_json::Value),
    /// Reference to a blob file stored next to the index.
    BlobRef(PathBuf),
}

/// One entry of the on-disk index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The original, unhashed key.
    pub key: String,
    pub payload: CachePayload,
    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn new(key: &str, payload: CachePayload, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            payload,
            cached_at: Utc::now(),
            ttl,
        }
    }

    /// Check if this entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::MAX);

        elapsed > self.ttl
    }

    fn blob_path(&self) -> Option<&Path> {
        match &self.payload {
            CachePayload::BlobRef(path) => Some(path),
            CachePayload::Metadata(_) => None,
        }
    }
}

type Index = BTreeMap<String, CacheEntry>;

/// Two-tier local cache: JSON metadata entries plus blob files.
///
/// Every mutation takes the index lock and rewrites the index file before
/// releasing it, so concurrent callers sharing one store never interleave
/// writes to the directory.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    entries: Mutex<Index>,
}

impl CacheStore {
    /// Open the store in the platform cache directory.
    pub fn load() -> Result<Self> {
        let dir = paths::cache_dir().ok_or(PipeyeError::CacheDirUnavailable)?;
        Self::open(dir)
    }

    /// Open the store rooted at `dir`, creating the directory if needed.
    /// A missing or corrupt index starts an empty cache.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let index_path = paths::index_path(&dir);
        let entries = match fs::read_to_string(&index_path) {
            Ok(contents) => match serde_json::from_str::<Index>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "ignoring corrupt cache index");
                    Index::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Index::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(dir = %dir.display(), entries = entries.len(), "cache loaded");
        Ok(Self {
            dir,
            entries: Mutex::new(entries),
        })
    }

    /// Directory holding the index and blob files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of indexed entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Read a metadata entry. Expired entries are removed and reported as a miss,
    /// as are entries that do not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let digest = paths::hash_key(key);
        let mut entries = self.lock();

        let Some(entry) = entries.get(&digest) else {
            return Ok(None);
        };

        if entry.is_expired() {
            self.evict(&mut entries, &digest)?;
            return Ok(None);
        }

        match &entry.payload {
            CachePayload::Metadata(value) => match serde_json::from_value(value.clone()) {
                Ok(data) => Ok(Some(data)),
                Err(e) => {
                    debug!(key, error = %e, "cached value has unexpected shape");
                    Ok(None)
                }
            },
            CachePayload::BlobRef(_) => Ok(None),
        }
    }

    /// Upsert a metadata entry and persist the index.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let digest = paths::hash_key(key);

        let mut entries = self.lock();
        entries.insert(
            digest,
            CacheEntry::new(key, CachePayload::Metadata(value), ttl),
        );
        self.save(&entries)
    }

    /// Remove an entry (and its blob, if any).
    pub fn delete(&self, key: &str) -> Result<()> {
        let digest = paths::hash_key(key);
        let mut entries = self.lock();
        self.evict(&mut entries, &digest)
    }

    /// Remove every entry and blob file.
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.lock();
        for entry in entries.values() {
            if let Some(path) = entry.blob_path() {
                remove_if_exists(path)?;
            }
        }
        entries.clear();
        self.save(&entries)
    }

    /// Look up a blob. A hit needs both a live TTL and the file still on disk;
    /// otherwise the stale index entry is cleaned up.
    pub fn get_file(&self, key: &str) -> Result<Option<PathBuf>> {
        let digest = paths::hash_key(key);
        let mut entries = self.lock();

        let Some(entry) = entries.get(&digest) else {
            return Ok(None);
        };

        let hit = match entry.blob_path() {
            Some(path) if !entry.is_expired() && path.exists() => Some(path.to_path_buf()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.evict(&mut entries, &digest)?;
        }
        Ok(hit)
    }

    /// Write a blob file named by the hashed key and index a reference to it.
    pub fn set_file(&self, key: &str, data: &[u8], ttl: Duration) -> Result<PathBuf> {
        let digest = paths::hash_key(key);
        let path = paths::blob_path(&self.dir, &digest);

        let mut entries = self.lock();
        write_atomic(&path, data)?;
        entries.insert(
            digest,
            CacheEntry::new(key, CachePayload::BlobRef(path.clone()), ttl),
        );
        self.save(&entries)?;

        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict(&self, entries: &mut Index, digest: &str) -> Result<()> {
        if let Some(entry) = entries.remove(digest) {
            if let Some(path) = entry.blob_path() {
                remove_if_exists(path)?;
            }
            self.save(entries)?;
        }
        Ok(())
    }

    fn save(&self, entries: &Index) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&paths::index_path(&self.dir), json.as_bytes())
    }

    /// Shift an entry's write time into the past.
    #[cfg(test)]
    fn backdate(&self, key: &str, by: Duration) {
        let digest = paths::hash_key(key);
        if let Some(entry) = self.lock().get_mut(&digest) {
            entry.cached_at -= chrono::Duration::from_std(by).unwrap();
        }
    }
}

/// Write via a temp file and rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            name: "test".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        store.set("key", &sample(), Duration::from_secs(60)).unwrap();

        let cached: Option<TestData> = store.get("key").unwrap();
        assert_eq!(cached, Some(sample()));
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        let cached: Option<TestData> = store.get("nope").unwrap();
        assert!(cached.is_none());
        assert!(store.get_file("nope").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        store.set("key", &sample(), Duration::from_secs(300)).unwrap();
        store.backdate("key", Duration::from_secs(301));

        let cached: Option<TestData> = store.get("key").unwrap();
        assert!(cached.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry::new(
            "k",
            CachePayload::Metadata(serde_json::Value::Null),
            Duration::from_secs(10),
        );
        let at_ttl = entry.cached_at + chrono::Duration::seconds(10);
        let past_ttl = entry.cached_at + chrono::Duration::seconds(11);

        assert!(!entry.is_expired_at(at_ttl));
        assert!(entry.is_expired_at(past_ttl));
    }

    #[test]
    fn test_wrong_shape_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        store.set("key", "just a string", Duration::from_secs(60)).unwrap();

        let cached: Option<TestData> = store.get("key").unwrap();
        assert!(cached.is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = CacheStore::open(temp_dir.path()).unwrap();
            store.set("key", &sample(), Duration::from_secs(60)).unwrap();
        }

        let store = CacheStore::open(temp_dir.path()).unwrap();
        let cached: Option<TestData> = store.get("key").unwrap();
        assert_eq!(cached, Some(sample()));

        let index = fs::read_to_string(paths::index_path(temp_dir.path())).unwrap();
        assert!(index.contains(&paths::hash_key("key")));
        assert!(index.contains("\"key\": \"key\""));
    }

    #[test]
    fn test_corrupt_index_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(paths::index_path(temp_dir.path()), "{ not json").unwrap();

        let store = CacheStore::open(temp_dir.path()).unwrap();
        assert!(store.is_empty());

        store.set("key", &sample(), Duration::from_secs(60)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let store = CacheStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn test_delete_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        store.set("one", &1, Duration::from_secs(60)).unwrap();
        store.set("two", &2, Duration::from_secs(60)).unwrap();
        let blob = store
            .set_file("three", b"zip bytes", Duration::from_secs(60))
            .unwrap();

        store.delete("one").unwrap();
        assert!(store.get::<i32>("one").unwrap().is_none());
        assert_eq!(store.get::<i32>("two").unwrap(), Some(2));

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(!blob.exists());

        let reopened = CacheStore::open(temp_dir.path()).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_file_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        let bytes = b"PK\x03\x04 pretend archive";
        let path = store
            .set_file("logs:o:r:1:1", bytes, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), bytes);
        assert_eq!(path.extension().unwrap(), "zip");
        assert_eq!(store.get_file("logs:o:r:1:1").unwrap(), Some(path));
    }

    #[test]
    fn test_file_removed_out_of_band_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        let path = store
            .set_file("blob", b"data", Duration::from_secs(3600))
            .unwrap();
        fs::remove_file(&path).unwrap();

        assert!(store.get_file("blob").unwrap().is_none());
        // Stale index entry is cleaned up as well
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_file_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        let path = store.set_file("blob", b"data", Duration::from_secs(60)).unwrap();
        store.backdate("blob", Duration::from_secs(120));

        assert!(store.get_file("blob").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_tiers_do_not_cross() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path()).unwrap();

        store.set("meta", &sample(), Duration::from_secs(60)).unwrap();
        store.set_file("blob", b"data", Duration::from_secs(60)).unwrap();

        assert!(store.get_file("meta").unwrap().is_none());
        assert!(store.get::<String>("blob").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_writers() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(CacheStore::open(temp_dir.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let key = format!("{}:{}", t, i);
                        store.set(&key, &i, Duration::from_secs(60)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = CacheStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.len(), 80);
        assert_eq!(reopened.get::<i32>("7:9").unwrap(), Some(9));
    }
}
