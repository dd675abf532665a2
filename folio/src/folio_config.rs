//! Configuration of a Folio store.

use crate::common::{
    atomic, Atomic, ReadExecutor, WriteExecutor, DEFAULT_CACHE_CAPACITY, DEFAULT_STORAGE_PATH,
};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Store configuration.
///
/// Values can be changed freely until the store is initialized; afterwards
/// every setter fails with [ErrorKind::InvalidOperation].
///
/// | setting          | default  |
/// |------------------|----------|
/// | `storage_path`   | `./data` |
/// | `cache_capacity` | `1000`   |
/// | `sync_writes`    | `true`   |
#[derive(Clone)]
pub struct FolioConfig {
    inner: Arc<FolioConfigInner>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FolioConfig {
    pub fn new() -> Self {
        FolioConfig {
            inner: Arc::new(FolioConfigInner::new()),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.inner.storage_path.read_with(|it| it.clone())
    }

    pub fn set_storage_path(&self, path: impl Into<PathBuf>) -> FolioResult<()> {
        let path = path.into();
        self.inner.check_not_configured("Storage path")?;
        if path.as_os_str().is_empty() {
            log::error!("Storage path cannot be empty");
            return Err(FolioError::new(
                "Storage path cannot be empty",
                ErrorKind::ValidationError,
            ));
        }
        self.inner.storage_path.write_with(|it| *it = path);
        Ok(())
    }

    pub fn cache_capacity(&self) -> usize {
        self.inner.cache_capacity.read_with(|it| *it)
    }

    /// Maximum number of documents kept in the recent access cache. Zero
    /// disables the cache.
    pub fn set_cache_capacity(&self, capacity: usize) -> FolioResult<()> {
        self.inner.check_not_configured("Cache capacity")?;
        self.inner.cache_capacity.write_with(|it| *it = capacity);
        Ok(())
    }

    pub fn sync_writes(&self) -> bool {
        self.inner.sync_writes.read_with(|it| *it)
    }

    /// Whether files are fsynced before they replace their target.
    pub fn set_sync_writes(&self, sync_writes: bool) -> FolioResult<()> {
        self.inner.check_not_configured("Sync writes")?;
        self.inner.sync_writes.write_with(|it| *it = sync_writes);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Acquire)
    }

    pub(crate) fn initialize(&self) {
        self.inner.configured.store(true, Ordering::Release);
    }
}

struct FolioConfigInner {
    configured: AtomicBool,
    storage_path: Atomic<PathBuf>,
    cache_capacity: Atomic<usize>,
    sync_writes: Atomic<bool>,
}

impl FolioConfigInner {
    fn new() -> Self {
        FolioConfigInner {
            configured: AtomicBool::new(false),
            storage_path: atomic(PathBuf::from(DEFAULT_STORAGE_PATH)),
            cache_capacity: atomic(DEFAULT_CACHE_CAPACITY),
            sync_writes: atomic(true),
        }
    }

    fn check_not_configured(&self, setting: &str) -> FolioResult<()> {
        if self.configured.load(Ordering::Acquire) {
            log::error!("{} cannot be changed after initialization", setting);
            return Err(FolioError::new(
                &format!("{} cannot be changed after initialization", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}
