use crate::collection::{
    CollectionEventInfo, CollectionEventListener, CollectionStore, FolioCollection,
};
use crate::common::{
    FolioEventBus, ReadExecutor, RecentAccessCache, SubscriberRef, WriteSerializer,
    CACHE_KEY_SEPARATOR,
};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use crate::folio_builder::FolioBuilder;
use crate::folio_config::FolioConfig;
use crate::metadata::{CollectionStats, StoreStats};
use crate::store::{Backup, PathIndex, PersistenceEngine};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A file-backed JSON document store.
///
/// Every collection lives in memory and in `<storage>/<name>.json`; the
/// `.manifest.json` file lists the collections on disk. The store is loaded
/// from disk exactly once, on first use or by [FolioBuilder::open].
///
/// `Folio` is cheap to clone; clones share the same store.
///
/// ```rust,no_run
/// use folio::Folio;
/// use serde_json::json;
///
/// # fn main() -> folio::errors::FolioResult<()> {
/// let db = Folio::builder().storage_path("./data").open()?;
/// let users = db.collection("users")?;
/// users.insert(json!({"name": "ada"}))?;
/// assert_eq!(users.size()?, 1);
/// db.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Folio {
    inner: Arc<FolioInner>,
}

impl Folio {
    pub fn builder() -> FolioBuilder {
        FolioBuilder::new()
    }

    pub(crate) fn new(config: FolioConfig) -> Self {
        Folio {
            inner: Arc::new(FolioInner::new(config)),
        }
    }

    /// Loads the store from disk if that has not happened yet. Concurrent
    /// callers wait for the same load; a failed load is retried by the next
    /// caller.
    pub fn ensure_initialized(&self) -> FolioResult<()> {
        self.inner.check_opened()?;
        self.inner.initialized.get_or_try_init(|| self.inner.bootstrap())?;
        Ok(())
    }

    /// Returns a handle to the collection `name`. The collection itself is
    /// created by its first insert or update.
    pub fn collection(&self, name: &str) -> FolioResult<FolioCollection> {
        validate_collection_name(name)?;
        self.ensure_initialized()?;
        Ok(FolioCollection::new(name, self.clone()))
    }

    /// Names of all collections, in ascending order.
    pub fn list_collection_names(&self) -> FolioResult<Vec<String>> {
        self.ensure_initialized()?;
        Ok(self.inner.store.names())
    }

    pub fn has_collection(&self, name: &str) -> FolioResult<bool> {
        self.ensure_initialized()?;
        Ok(self.inner.store.contains(name))
    }

    /// Removes a collection with its file. Returns `false` if it did not exist.
    pub fn drop_collection(&self, name: &str) -> FolioResult<bool> {
        self.ensure_initialized()?;
        self.inner.drop_collection(name)
    }

    /// Removes every collection and its file.
    pub fn clear_all(&self) -> FolioResult<()> {
        self.ensure_initialized()?;
        self.inner.clear_all()
    }

    pub fn total_document_count(&self) -> FolioResult<usize> {
        self.ensure_initialized()?;
        Ok(self.inner.store.total_documents())
    }

    pub fn stats(&self) -> FolioResult<StoreStats> {
        self.ensure_initialized()?;
        Ok(self.inner.stats())
    }

    /// Writes every collection into one backup file at `path`.
    pub fn backup(&self, path: impl AsRef<Path>) -> FolioResult<()> {
        self.ensure_initialized()?;
        self.inner.backup(path.as_ref())
    }

    /// Replaces the whole store with the content of a backup file.
    ///
    /// Collections missing from the backup are deleted. If persisting the
    /// restored state fails, the previous in-memory state is put back; files
    /// that were already rewritten stay rewritten.
    pub fn restore(&self, path: impl AsRef<Path>) -> FolioResult<()> {
        self.ensure_initialized()?;
        self.inner.restore(path.as_ref())
    }

    /// Registers a listener for insert, update and remove events of every
    /// collection.
    pub fn subscribe(&self, listener: CollectionEventListener) -> FolioResult<SubscriberRef> {
        self.inner.check_opened()?;
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> FolioResult<()> {
        self.inner.check_opened()?;
        self.inner.event_bus.deregister(subscriber)
    }

    /// Flushes the manifest, clears the cache and drops all listeners.
    /// Closing twice is a no-op.
    pub fn close(&self) -> FolioResult<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn config(&self) -> FolioConfig {
        self.inner.config.clone()
    }

    pub(crate) fn store(&self) -> &CollectionStore {
        &self.inner.store
    }

    pub(crate) fn cache(&self) -> &RecentAccessCache {
        &self.inner.cache
    }

    pub(crate) fn serializer(&self) -> &WriteSerializer {
        &self.inner.serializer
    }

    pub(crate) fn check_opened(&self) -> FolioResult<()> {
        self.inner.check_opened()
    }

    /// Delivers an event to subscribers. Listener failures are logged; the
    /// mutation that raised the event has already been committed.
    pub(crate) fn publish(&self, event: CollectionEventInfo) {
        if !self.inner.event_bus.has_listeners() {
            return;
        }
        if let Err(e) = self.inner.event_bus.publish(event) {
            log::warn!("Failed to publish collection event: {}", e);
        }
    }
}

struct FolioInner {
    config: FolioConfig,
    store: CollectionStore,
    cache: RecentAccessCache,
    serializer: WriteSerializer,
    event_bus: FolioEventBus<CollectionEventInfo, CollectionEventListener>,
    initialized: OnceCell<()>,
    closed: AtomicBool,
}

impl FolioInner {
    fn new(config: FolioConfig) -> Self {
        config.initialize();
        let storage_path = config.storage_path();
        let path_index = PathIndex::new(&storage_path);
        let engine = PersistenceEngine::new(
            &storage_path,
            path_index.manifest_path(),
            config.sync_writes(),
        );

        FolioInner {
            store: CollectionStore::new(path_index, engine),
            cache: RecentAccessCache::new(config.cache_capacity()),
            serializer: WriteSerializer::new(),
            event_bus: FolioEventBus::new(),
            initialized: OnceCell::new(),
            closed: AtomicBool::new(false),
            config,
        }
    }

    fn check_opened(&self) -> FolioResult<()> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Folio store is closed");
            return Err(FolioError::new(
                "Folio store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn bootstrap(&self) -> FolioResult<()> {
        let engine = self.store.engine();
        log::info!("Opening folio store at {}", engine.storage_dir().display());

        let result = self.load_collections();
        match &result {
            Ok(_) => log::info!(
                "Loaded {} collections with {} documents",
                self.store.names().len(),
                self.store.total_documents()
            ),
            Err(e) => {
                log::error!("Failed to open folio store: {}", e);
                self.store.clear_all();
            }
        }
        result
    }

    fn load_collections(&self) -> FolioResult<()> {
        let engine = self.store.engine();
        engine.ensure_storage_folder()?;

        let (names, mut manifest_stale) = match engine.load_manifest() {
            Some(names) => (names, false),
            None => {
                log::info!("No usable manifest, scanning the storage folder");
                (engine.scan_folder()?, true)
            }
        };

        for name in names {
            if validate_collection_name(&name).is_err() {
                log::warn!("Skipping collection with invalid name {:?}", name);
                manifest_stale = true;
                continue;
            }

            let path = self.store.path_index().path_for(&name);
            if !path.exists() {
                log::warn!("Collection file for {} is missing, dropping it from the manifest", name);
                manifest_stale = true;
                continue;
            }

            if engine.is_empty_file(&path) {
                log::warn!("Collection file for {} is empty, deleting it", name);
                engine.remove_file(&path)?;
                manifest_stale = true;
                continue;
            }

            let documents = engine.load_collection(&path)?;
            if documents.is_empty() {
                log::warn!("Collection {} has no documents, deleting its file", name);
                engine.remove_file(&path)?;
                manifest_stale = true;
                continue;
            }

            log::debug!("Loaded collection {} with {} documents", name, documents.len());
            self.store.register(&name, documents);
        }

        if manifest_stale {
            engine.save_manifest(self.store.names())?;
        }
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> FolioResult<bool> {
        self.serializer.run_exclusive(|| {
            self.check_opened()?;
            let dropped = self.store.drop(name);
            self.cache.delete_collection(name);
            match dropped {
                Some(path) => {
                    let engine = self.store.engine();
                    engine.save_manifest(self.store.names())?;
                    engine.remove_file(&path)?;
                    log::info!("Dropped collection {}", name);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn clear_all(&self) -> FolioResult<()> {
        self.serializer.run_exclusive(|| {
            self.check_opened()?;
            let engine = self.store.engine();
            let names = self.store.names();
            for name in &names {
                let path = self
                    .store
                    .path_index()
                    .get(name)
                    .unwrap_or_else(|| self.store.path_index().path_for(name));
                engine.remove_file(&path)?;
            }
            self.store.clear_all();
            self.cache.clear();
            engine.save_manifest(Vec::new())?;
            log::info!("Cleared {} collections", names.len());
            Ok(())
        })
    }

    fn stats(&self) -> StoreStats {
        let collections: Vec<CollectionStats> = self
            .store
            .names()
            .into_iter()
            .map(|name| {
                let document_count = self
                    .store
                    .get(&name)
                    .map(|documents| documents.read_with(|it| it.len()))
                    .unwrap_or(0);
                CollectionStats {
                    name,
                    document_count,
                }
            })
            .collect();

        StoreStats {
            total_documents: collections.iter().map(|it| it.document_count).sum(),
            collections,
            cache_size: self.cache.len(),
            cache_capacity: self.cache.capacity(),
            storage_path: self.config.storage_path().display().to_string(),
            sync_writes: self.config.sync_writes(),
        }
    }

    fn backup(&self, path: &Path) -> FolioResult<()> {
        self.serializer.run_exclusive(|| {
            self.check_opened()?;
            let mut collections = IndexMap::new();
            for name in self.store.names() {
                if let Some(documents) = self.store.get(&name) {
                    collections.insert(name, documents.read_with(|it| it.clone()));
                }
            }

            let count = collections.len();
            self.store
                .engine()
                .write_backup(path, &Backup::new(collections))?;
            log::info!("Backed up {} collections to {}", count, path.display());
            Ok(())
        })
    }

    fn restore(&self, path: &Path) -> FolioResult<()> {
        let backup = self.store.engine().read_backup(path)?;
        for name in backup.collections.keys() {
            validate_collection_name(name)?;
        }

        self.serializer.run_exclusive(|| {
            self.check_opened()?;
            let snapshot = self.store.snapshot();
            let previous_names = self.store.names();

            self.store.clear_all();
            self.cache.clear();
            for (name, documents) in backup.collections {
                if !documents.is_empty() {
                    self.store.register(&name, documents);
                }
            }

            if let Err(e) = self.persist_restored(&previous_names) {
                log::error!("Restore from {} failed, rolling back: {}", path.display(), e);
                self.store.replace(snapshot);
                self.cache.clear();
                return Err(FolioError::new_with_cause(
                    &format!("Failed to restore from {}", path.display()),
                    e.kind().clone(),
                    e,
                ));
            }

            log::info!(
                "Restored {} collections from {}",
                self.store.names().len(),
                path.display()
            );
            Ok(())
        })
    }

    fn persist_restored(&self, previous_names: &[String]) -> FolioResult<()> {
        let engine = self.store.engine();
        let names = self.store.names();
        for name in &names {
            if let Some(documents) = self.store.get(name) {
                let path = self.store.path_index().path_for(name);
                documents.read_with(|it| engine.save_collection(&path, it))?;
            }
        }

        for name in previous_names.iter().filter(|name| !names.contains(name)) {
            engine.remove_file(&self.store.path_index().path_for(name))?;
        }
        engine.save_manifest(names)
    }

    fn close(&self) -> FolioResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // wait for an in-flight mutation to commit
        let _guard = self.serializer.acquire();
        let result = if self.initialized.get().is_some() {
            self.store.engine().save_manifest(self.store.names())
        } else {
            Ok(())
        };

        self.cache.clear();
        if let Err(e) = self.event_bus.close() {
            log::warn!("Failed to close event bus: {}", e);
        }
        log::info!("Folio store closed");
        result
    }
}

/// Collection names must be usable as file names and as cache key prefixes.
pub(crate) fn validate_collection_name(name: &str) -> FolioResult<()> {
    if name.is_empty() {
        log::error!("Collection name cannot be empty");
        return Err(FolioError::new(
            "Collection name cannot be empty",
            ErrorKind::ValidationError,
        ));
    }

    if name.starts_with('.') {
        log::error!("Collection name '{}' cannot start with '.'", name);
        return Err(FolioError::new(
            &format!("Collection name '{}' cannot start with '.'", name),
            ErrorKind::ValidationError,
        ));
    }

    let invalid = name.chars().find(|c| {
        *c == '/' || *c == '\\' || c.is_whitespace() || c.to_string() == CACHE_KEY_SEPARATOR
    });
    if let Some(c) = invalid {
        log::error!("Collection name '{}' contains invalid character {:?}", name, c);
        return Err(FolioError::new(
            &format!("Collection name '{}' contains invalid character {:?}", name, c),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}
