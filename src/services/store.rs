//! Ranking cache: key-value backends plus the ranking writer/reader
//!
//! Each category's ranking lives under its own key and is replaced by a
//! single `set`. Writers are idempotent, so re-running a whole pipeline after
//! a failed run is safe even though already-written categories are not
//! rolled back.

use crate::types::{CategoryRanking, RankError, Rankings, Result};
use directories::BaseDirs;
use fs2::FileExt;
use std::collections::{BTreeSet, HashMap};
use redis::Commands;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Minimal key-value interface shared by the batch writer and the reader
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional overwrite; readers see either the old or the new value
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RankError::Store("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RankError::Store("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store, one file per key
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    /// Store under `~/.provider-rank/cache`
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| RankError::Store("Cannot determine home directory".into()))?;
        Ok(Self::with_cache_dir(
            base_dirs.home_dir().join(".provider-rank").join("cache"),
        ))
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// File holding `key`. Bytes outside `[A-Za-z0-9_-]` are hex-escaped so
    /// any category name maps to a single, distinct file name.
    pub fn key_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{:02X}", b));
            }
        }
        name.push_str(".json");
        self.cache_dir.join(name)
    }

    /// Lock file serializing renames; escaped key names never start with `.`
    fn lock_path(&self) -> PathBuf {
        self.cache_dir.join(".lock")
    }

    /// Temp file next to `path`, unique per write
    fn temp_path(&self, path: &Path) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
    /// Shared lock on the directory's lock file, if a writer ever created it
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);

        let lock = match File::open(self.lock_path()) {
            Ok(lock) => {
                lock.lock_shared()
                    .map_err(|e| RankError::Store(format!("Failed to acquire read lock: {}", e)))?;
                Some(lock)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(RankError::Store(format!("Failed to open lock file: {}", e))),
        };

        let read = fs::read_to_string(&path);
        if let Some(lock) = lock {
            let _ = lock.unlock();
        }

        match read {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RankError::Store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Synced temp file renamed over the target under the exclusive lock
    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| RankError::Store(format!("Failed to create cache dir: {}", e)))?;

        let path = self.key_path(key);
        let temp_path = self.temp_path(&path);

        let written = write_synced(&temp_path, value);
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| RankError::Store(format!("Failed to open lock file: {}", e)))?;
        lock.lock_exclusive()
            .map_err(|e| RankError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let renamed = fs::rename(&temp_path, &path)
            .map_err(|e| RankError::Store(format!("Failed to rename temp file: {}", e)));
        let _ = lock.unlock();
        if renamed.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        renamed
    }
}

fn write_synced(path: &Path, value: &str) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| RankError::Store(format!("Failed to create temp file: {}", e)))?;
    file.write_all(value.as_bytes())
        .map_err(|e| RankError::Store(format!("Failed to write temp file: {}", e)))?;
    file.sync_all()
        .map_err(|e| RankError::Store(format!("Failed to sync temp file: {}", e)))
}

/// Store shared over the network by the batch writer and the lookup side.
///
/// One connection is kept and re-established after any failed command.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<redis::Connection>>,
}

impl RedisStore {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Parse `url` (e.g. `redis://host:6379/0`); no connection is made yet
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| RankError::Config(format!("invalid redis URL {}: {}", url, e)))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    ) -> Result<T> {
        let mut slot = self
            .conn
            .lock()
            .map_err(|_| RankError::Store("redis connection lock poisoned".into()))?;

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self
                .client
                .get_connection_with_timeout(Self::CONNECT_TIMEOUT)
                .map_err(|e| RankError::Store(format!("redis connection failed: {}", e)))?,
        };

        let result = op(&mut conn)
            .map_err(|e| RankError::Store(format!("redis command failed: {}", e)))?;
        *slot = Some(conn);
        Ok(result)
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| conn.get::<_, Option<String>>(key))
    }

    /// Single `SET`, atomic on the server
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| conn.set::<_, _, ()>(key, value))
    }
}

/// Canonical text encoding of a ranking: compact JSON array, order kept
pub fn encode_ranking(ranking: &CategoryRanking) -> Result<String> {
    serde_json::to_string(ranking)
        .map_err(|e| RankError::Store(format!("Serialization failed: {}", e)))
}

pub fn decode_ranking(category: &str, raw: &str) -> Result<CategoryRanking> {
    serde_json::from_str(raw).map_err(|e| RankError::Corruption {
        category: category.to_string(),
        reason: e.to_string(),
    })
}

/// Reads and writes category rankings through a [`KeyValueStore`]
pub struct RankingStore<'a> {
    kv: &'a dyn KeyValueStore,
}

impl<'a> RankingStore<'a> {
    pub fn new(kv: &'a dyn KeyValueStore) -> Self {
        Self { kv }
    }

    /// Overwrite the ranking stored under `category`
    pub fn save(&self, category: &str, ranking: &CategoryRanking) -> Result<()> {
        let encoded = encode_ranking(ranking)?;
        self.kv.set(category, &encoded)?;
        tracing::debug!(category, providers = ranking.len(), "ranking written");
        Ok(())
    }

    /// Write every category; the first failure aborts the remaining writes
    pub fn save_all(&self, rankings: &Rankings) -> Result<BTreeSet<String>> {
        let mut written = BTreeSet::new();
        for (category, ranking) in rankings {
            self.save(category, ranking).inspect_err(|e| {
                tracing::error!(category = %category, written = written.len(), error = %e, "ranking write failed");
            })?;
            written.insert(category.clone());
        }
        Ok(written)
    }

    /// Stored ranking for `category`.
    ///
    /// A missing key is [`RankError::DataUnavailable`]; a present but empty
    /// ranking is returned as such.
    pub fn load(&self, category: &str) -> Result<CategoryRanking> {
        match self.kv.get(category)? {
            Some(raw) => decode_ranking(category, &raw),
            None => Err(RankError::DataUnavailable(category.to_string())),
        }
    }
}
