//! Directory-backed HTTP response cache with online/offline policies.
//!
//! - One JSON file per URL at `{dir}/{first2}/{sha256}.json`
//! - Online: entries younger than [`MAX_AGE`] are served without the network
//! - Offline: entries up to [`MAX_STALE`] old are served, the network is never used
//! - Total size bounded by `max_bytes`, least recently used entries evicted first

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::connectivity::Connectivity;

pub const CACHE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_AGE: Duration = Duration::from_secs(300);
pub const MAX_STALE: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("failed to create cache directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Request-side cache directive, chosen from connectivity right before a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    Online,
    Offline,
}

impl CachePolicy {
    pub fn for_connectivity(has_internet: bool) -> Self {
        if has_internet {
            CachePolicy::Online
        } else {
            CachePolicy::Offline
        }
    }

    /// Value of the `Cache-Control` request header.
    pub fn header_value(self) -> String {
        match self {
            CachePolicy::Online => format!("public, max-age={}", MAX_AGE.as_secs()),
            CachePolicy::Offline => {
                format!("public, only-if-cached, max-stale={}", MAX_STALE.as_secs())
            }
        }
    }

    pub fn allows_network(self) -> bool {
        matches!(self, CachePolicy::Online)
    }

    fn serves(self, age: Duration) -> bool {
        match self {
            CachePolicy::Online => age < MAX_AGE,
            CachePolicy::Offline => age <= MAX_STALE,
        }
    }

    fn miss(self) -> CacheLookup {
        match self {
            CachePolicy::Online => CacheLookup::Miss,
            CachePolicy::Offline => CacheLookup::Unsatisfiable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    /// Stored body usable under the policy.
    Hit(Vec<u8>),
    /// Nothing usable; go to the network.
    Miss,
    /// Nothing usable and the policy forbids the network.
    Unsatisfiable,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    url: String,
    /// Seconds since the unix epoch.
    stored_at: u64,
    /// Base64 response body.
    body: String,
}

pub struct ResponseCache {
    dir: PathBuf,
    max_bytes: u64,
    connectivity: Arc<dyn Connectivity>,
    /// key -> (last access, bytes on disk)
    lru: Mutex<HashMap<String, (SystemTime, u64)>>,
}

impl ResponseCache {
    pub fn open(
        dir: impl Into<PathBuf>,
        max_bytes: u64,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let cache = Self {
            dir,
            max_bytes,
            connectivity,
            lru: Mutex::new(HashMap::new()),
        };
        cache.scan_entries();
        tracing::debug!(
            dir = %cache.dir.display(),
            entries = cache.len(),
            bytes = cache.total_bytes(),
            "response cache opened"
        );
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Consults connectivity now. Call once per request.
    pub fn policy(&self) -> CachePolicy {
        CachePolicy::for_connectivity(self.connectivity.has_internet())
    }

    pub async fn lookup(&self, url: &str, policy: CachePolicy) -> CacheLookup {
        self.lookup_at(url, policy, SystemTime::now()).await
    }

    pub async fn store(&self, url: &str, body: &[u8]) {
        self.store_at(url, body, SystemTime::now()).await;
    }

    pub async fn remove(&self, url: &str) {
        let key = cache_key(url);
        self.index().remove(&key);
        let _ = fs::remove_file(self.entry_path(&key)).await;
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index().contains_key(&cache_key(url))
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.index().values().map(|(_, size)| size).sum()
    }

    pub(crate) async fn lookup_at(
        &self,
        url: &str,
        policy: CachePolicy,
        now: SystemTime,
    ) -> CacheLookup {
        let key = cache_key(url);
        let path = self.entry_path(&key);

        let Ok(content) = fs::read(&path).await else {
            self.index().remove(&key);
            return policy.miss();
        };

        let Some((entry, body)) = decode_entry(&content) else {
            tracing::warn!(url, "dropping corrupt cache entry");
            self.index().remove(&key);
            let _ = fs::remove_file(&path).await;
            return policy.miss();
        };
        if entry.url != url {
            return policy.miss();
        }

        let stored_at = UNIX_EPOCH + Duration::from_secs(entry.stored_at);
        let age = now.duration_since(stored_at).unwrap_or_default();
        if age > MAX_STALE {
            tracing::debug!(url, age_secs = age.as_secs(), "expired cache entry removed");
            self.index().remove(&key);
            let _ = fs::remove_file(&path).await;
            return policy.miss();
        }
        if !policy.serves(age) {
            tracing::debug!(url, age_secs = age.as_secs(), ?policy, "cache entry too old");
            return policy.miss();
        }

        self.index().insert(key, (now, content.len() as u64));
        if let Err(err) = touch(&path, now).await {
            tracing::debug!(url, %err, "failed to record cache access time");
        }
        tracing::debug!(url, age_secs = age.as_secs(), ?policy, "cache hit");
        CacheLookup::Hit(body)
    }

    pub(crate) async fn store_at(&self, url: &str, body: &[u8], now: SystemTime) {
        let key = cache_key(url);
        let entry = CacheEntry {
            url: url.to_string(),
            stored_at: now
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            body: STANDARD.encode(body),
        };
        let content = match serde_json::to_vec(&entry) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(url, %err, "failed to serialize cache entry");
                return;
            }
        };

        let size = content.len() as u64;
        if size > self.max_bytes {
            tracing::debug!(url, size, max = self.max_bytes, "response too large to cache");
            return;
        }

        for victim in self.reserve(&key, size, now) {
            tracing::debug!(key = %victim, "evicting cache entry");
            let _ = fs::remove_file(self.entry_path(&victim)).await;
        }

        let path = self.entry_path(&key);
        if let Err(err) = write_atomic(&path, &content).await {
            tracing::warn!(url, %err, "failed to write cache entry");
            self.release(&key, now);
            return;
        }
        // Another store may have evicted this entry while it was being written.
        if !self.index().contains_key(&key) {
            let _ = fs::remove_file(&path).await;
            return;
        }
        if let Err(err) = touch(&path, now).await {
            tracing::debug!(url, %err, "failed to record cache access time");
        }
    }

    /// Claims `size` bytes for `key` in the index, returning the keys whose
    /// files must be deleted to stay under the cap.
    fn reserve(&self, key: &str, size: u64, now: SystemTime) -> Vec<String> {
        let mut index = self.index();
        index.remove(key);

        let mut total: u64 = index.values().map(|(_, bytes)| bytes).sum();
        if total + size <= self.max_bytes {
            index.insert(key.to_string(), (now, size));
            return Vec::new();
        }

        let mut entries: Vec<(String, SystemTime)> = index
            .iter()
            .map(|(key, (accessed, _))| (key.clone(), *accessed))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut evicted = Vec::new();
        for (victim, _) in entries {
            if total + size <= self.max_bytes {
                break;
            }
            if let Some((_, bytes)) = index.remove(&victim) {
                total = total.saturating_sub(bytes);
                evicted.push(victim);
            }
        }
        index.insert(key.to_string(), (now, size));
        evicted
    }

    /// Drops a reservation made at `now`, unless a later store replaced it.
    fn release(&self, key: &str, now: SystemTime) {
        let mut index = self.index();
        if index.get(key).is_some_and(|(stored, _)| *stored == now) {
            index.remove(key);
        }
    }

    fn scan_entries(&self) {
        let Ok(subdirs) = std::fs::read_dir(&self.dir) else {
            return;
        };

        let mut index = self.index();
        for subdir in subdirs.flatten() {
            let subdir_path = subdir.path();
            if !subdir_path.is_dir() {
                continue;
            }
            let Ok(files) = std::fs::read_dir(&subdir_path) else {
                continue;
            };
            for file in files.flatten() {
                let file_path = file.path();
                match file_path.extension().and_then(|ext| ext.to_str()) {
                    Some("json") => {}
                    Some("tmp") => {
                        // Left behind by an interrupted write.
                        if let Err(err) = std::fs::remove_file(&file_path) {
                            tracing::debug!(path = %file_path.display(), %err, "failed to remove temp file");
                        }
                        continue;
                    }
                    _ => continue,
                }
                let Some(key) = file_path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let Ok(metadata) = file.metadata() else {
                    continue;
                };
                let accessed = metadata.modified().unwrap_or(UNIX_EPOCH);
                index.insert(key.to_string(), (accessed, metadata.len()));
            }
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let prefix = key.get(..2).unwrap_or("00");
        self.dir.join(prefix).join(format!("{key}.json"))
    }

    fn index(&self) -> MutexGuard<'_, HashMap<String, (SystemTime, u64)>> {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

fn decode_entry(content: &[u8]) -> Option<(CacheEntry, Vec<u8>)> {
    let entry: CacheEntry = serde_json::from_slice(content).ok()?;
    let body = STANDARD.decode(&entry.body).ok()?;
    Some((entry, body))
}

async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await
}

/// Records `when` as the entry's mtime so LRU order survives a reopen.
async fn touch(path: &Path, when: SystemTime) -> std::io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path).await?;
    file.into_std().await.set_modified(when)
}
