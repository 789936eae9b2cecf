//! Repository cache: one local checkout per remote repository
//!
//! Maps a [`CloneKey`] to a directory under the cache root and decides when
//! to reuse it and when to clone again. Locking is per key: the shared map is
//! only locked long enough to find or create a key's slot, and the slot's own
//! async mutex is held across the check-or-clone section. Concurrent callers
//! for one key therefore share a single clone, while unrelated keys clone in
//! parallel.

mod fs_lock;
mod git_command;

pub use git_command::GitCommandCloner;

use crate::config::CacheConfig;
use crate::error::{CloneError, FlattenError, Result};
use crate::source::CloneKey;
use async_trait::async_trait;
use fs_lock::FsLockGuard;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, RwLock};

/// Directory under the cache root that holds per-key lock files
const LOCK_DIR: &str = ".locks";

/// Performs the network side of materialization
#[async_trait]
pub trait Cloner: Send + Sync {
    /// Shallow-clone the default branch of `url` into `target`.
    ///
    /// `target` does not exist yet; its parent does.
    async fn clone_shallow(&self, url: &str, target: &Path) -> Result<(), CloneError>;
}

/// A materialized repository
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CloneKey,
    pub dir: PathBuf,
    /// When the checkout was cloned
    pub fetched_at: SystemTime,
    pub last_used: SystemTime,
}

impl CacheEntry {
    /// Whether this checkout is still inside the freshness window
    pub fn is_fresh(&self, window: Option<Duration>) -> bool {
        match window {
            None => true,
            Some(window) => self
                .fetched_at
                .elapsed()
                .map(|age| age < window)
                // fetched_at in the future (clock skew) counts as fresh
                .unwrap_or(true),
        }
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Process-wide cache of cloned repositories
pub struct RepoCache {
    root: PathBuf,
    freshness: Option<Duration>,
    lock_timeout: Duration,
    cloner: Arc<dyn Cloner>,
    slots: RwLock<HashMap<CloneKey, Slot>>,
}

impl RepoCache {
    /// Cache backed by the system `git` executable
    pub fn new(config: &CacheConfig) -> Self {
        let cloner = GitCommandCloner::new(config.git_binary.clone(), config.clone_timeout());
        Self::with_cloner(
            config.root.clone(),
            config.freshness(),
            config.clone_timeout(),
            Arc::new(cloner),
        )
    }

    /// Cache with an explicit cloner.
    ///
    /// `lock_timeout` bounds how long to wait for another process cloning the
    /// same repository into this root.
    pub fn with_cloner(
        root: PathBuf,
        freshness: Option<Duration>,
        lock_timeout: Duration,
        cloner: Arc<dyn Cloner>,
    ) -> Self {
        Self {
            root,
            freshness,
            lock_timeout,
            cloner,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How long a checkout is reused; `None` means forever
    pub fn freshness(&self) -> Option<Duration> {
        self.freshness
    }

    /// Directory a key's checkout lives in
    pub fn dir_for(&self, key: &CloneKey) -> PathBuf {
        self.root.join(key.dir_name())
    }

    fn lock_path(&self, key: &CloneKey) -> PathBuf {
        self.root
            .join(LOCK_DIR)
            .join(format!("{}.lock", key.dir_name()))
    }

    async fn slot(&self, key: &CloneKey) -> Slot {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Return a local checkout for `key`, cloning only when needed.
    pub async fn materialize(&self, key: &CloneKey) -> Result<PathBuf> {
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;
        let dir = self.dir_for(key);

        if let Some(current) = entry.as_mut() {
            if current.is_fresh(self.freshness) && is_checkout(&current.dir) {
                current.last_used = SystemTime::now();
                tracing::debug!("Reusing cached checkout of {} at {:?}", key, current.dir);
                return Ok(current.dir.clone());
            }
            tracing::info!("Cached checkout of {} is stale or damaged, cloning again", key);
            *entry = None;
        } else if let Some(adopted) = self.adopt(key, &dir) {
            tracing::info!("Reusing existing checkout of {} at {:?}", key, dir);
            *entry = Some(adopted);
            return Ok(dir);
        }

        let fetched_at = self.clone_into_place(key, &dir).await?;
        let now = SystemTime::now();
        *entry = Some(CacheEntry {
            key: key.clone(),
            dir: dir.clone(),
            fetched_at,
            last_used: now,
        });

        Ok(dir)
    }

    /// Pick up a fresh checkout left on disk by an earlier run or another process
    fn adopt(&self, key: &CloneKey, dir: &Path) -> Option<CacheEntry> {
        if !is_checkout(dir) {
            return None;
        }
        let fetched_at = std::fs::metadata(dir.join(".git").join("HEAD"))
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());

        let entry = CacheEntry {
            key: key.clone(),
            dir: dir.to_path_buf(),
            fetched_at,
            last_used: SystemTime::now(),
        };
        entry.is_fresh(self.freshness).then_some(entry)
    }

    /// Clone into a staging directory, then swap it into place.
    ///
    /// A failed clone leaves nothing behind: the staging directory is removed
    /// when it goes out of scope and `dir` is untouched.
    async fn clone_into_place(&self, key: &CloneKey, dir: &Path) -> Result<SystemTime> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| cache_dir_error(&self.root, e))?;

        let _lock = FsLockGuard::acquire(&self.lock_path(key), self.lock_timeout).await?;

        // Another process may have finished this clone while we waited
        if let Some(adopted) = self.adopt(key, dir) {
            tracing::info!("Checkout of {} appeared while waiting, reusing it", key);
            return Ok(adopted.fetched_at);
        }

        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{}-", key.dir_name()))
            .tempdir_in(&self.root)
            .map_err(|e| cache_dir_error(&self.root, e))?;
        let target = staging.path().join("checkout");

        let url = key.canonical_url();
        if let Err(e) = self.cloner.clone_shallow(&url, &target).await {
            tracing::warn!("Clone of {} failed: {}", url, e);
            return Err(e.into());
        }

        if !is_checkout(&target) {
            return Err(CloneError::NotACheckout(url).into());
        }

        if tokio::fs::try_exists(dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(dir)
                .await
                .map_err(|e| cache_dir_error(dir, e))?;
        }
        tokio::fs::rename(&target, dir)
            .await
            .map_err(|e| cache_dir_error(dir, e))?;

        tracing::info!("Cloned {} into {:?}", url, dir);
        Ok(SystemTime::now())
    }

    /// Snapshot of the entries this process knows about, sorted by key
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let slots: Vec<Slot> = self.slots.read().await.values().cloned().collect();
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(entry) = slot.lock().await.as_ref() {
                entries.push(entry.clone());
            }
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Delete every cached checkout. Returns how many directories were removed.
    ///
    /// Waits for in-flight clones in this process to finish first.
    pub async fn clear(&self) -> Result<usize> {
        let mut slots = self.slots.write().await;
        for slot in slots.values() {
            *slot.lock().await = None;
        }
        slots.clear();

        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(FlattenError::from_io(e, &self.root)),
        };

        let mut removed = 0;
        while let Some(child) = read_dir
            .next_entry()
            .await
            .map_err(|e| FlattenError::from_io(e, &self.root))?
        {
            let path = child.path();
            if child.file_name() == LOCK_DIR || !path.is_dir() {
                continue;
            }
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| FlattenError::from_io(e, &path))?;
            removed += 1;
        }

        tracing::info!("Cleared {} cached checkouts from {:?}", removed, self.root);
        Ok(removed)
    }
}

/// A directory that opens as a non-bare git repository
pub fn is_checkout(dir: &Path) -> bool {
    dir.join(".git").exists()
        && git2::Repository::open(dir)
            .map(|repo| !repo.is_bare())
            .unwrap_or(false)
}

fn cache_dir_error(path: &Path, e: std::io::Error) -> CloneError {
    CloneError::CacheDir {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
