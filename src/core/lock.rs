//! Per-repository execution locks
//!
//! Mutating git commands against one working tree must never overlap. Each
//! workflow holds the repository's lock for its whole duration; different
//! repositories never contend.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
pub struct RepoLocks {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `path`
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        // Clone the Arc out so the map shard is not held across the await
        let lock = Arc::clone(self.locks.entry(key).or_default().value());
        lock.lock_owned().await
    }
}
