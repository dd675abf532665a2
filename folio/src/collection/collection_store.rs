use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::FolioResult;
use crate::store::{CollectionMap, PathIndex, PersistenceEngine};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A collection's documents, shared between the store and its handles.
pub type SharedCollection = Atomic<CollectionMap>;

/// The in-memory working set: every loaded collection by name.
///
/// Mutating methods are only called while the write serializer is held.
/// Readers take the per-collection lock for a single access.
#[derive(Clone)]
pub struct CollectionStore {
    inner: Arc<CollectionStoreInner>,
}

/// Saved state of a [CollectionStore], used to undo a failed restore.
/// Holds copies, since removed collections are emptied in place.
pub(crate) struct StoreSnapshot {
    collections: Vec<(String, CollectionMap)>,
    paths: Vec<(String, PathBuf)>,
}

struct CollectionStoreInner {
    collections: Atomic<HashMap<String, SharedCollection>>,
    path_index: PathIndex,
    engine: PersistenceEngine,
}

impl CollectionStore {
    pub fn new(path_index: PathIndex, engine: PersistenceEngine) -> Self {
        CollectionStore {
            inner: Arc::new(CollectionStoreInner {
                collections: atomic(HashMap::new()),
                path_index,
                engine,
            }),
        }
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.inner.path_index
    }

    pub fn engine(&self) -> &PersistenceEngine {
        &self.inner.engine
    }

    pub fn get(&self, name: &str) -> Option<SharedCollection> {
        self.inner
            .collections
            .read_with(|collections| collections.get(name).cloned())
    }

    /// Returns the collection, loading it from its file (or creating it empty)
    /// on first use. Repeated calls return the same shared map.
    pub fn ensure(&self, name: &str) -> FolioResult<SharedCollection> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }

        let path = self.inner.path_index.path_for(name);
        let documents = self.inner.engine.load_collection(&path)?;
        log::debug!(
            "Loaded collection {} with {} documents",
            name,
            documents.len()
        );

        Ok(self.inner.collections.write_with(|collections| {
            let shared = collections
                .entry(name.to_string())
                .or_insert_with(|| atomic(documents))
                .clone();
            self.inner.path_index.register(name);
            shared
        }))
    }

    /// Adds a loaded collection together with its file path.
    pub fn register(&self, name: &str, documents: CollectionMap) -> SharedCollection {
        let shared = atomic(documents);
        self.inner.collections.write_with(|collections| {
            collections.insert(name.to_string(), shared.clone());
        });
        self.inner.path_index.register(name);
        shared
    }

    /// Forgets a collection; the caller removes its file and rewrites the
    /// manifest. Returns the path it was stored at, if it existed.
    ///
    /// The removed map is emptied, so a reader still holding it can no
    /// longer copy its documents into the cache.
    pub fn drop(&self, name: &str) -> Option<PathBuf> {
        let removed = self
            .inner
            .collections
            .write_with(|collections| collections.remove(name));
        let path = self.inner.path_index.remove(name);
        removed.map(|documents| {
            retire(&documents);
            path.unwrap_or_else(|| self.inner.path_index.path_for(name))
        })
    }

    /// Forgets every collection, emptying the removed maps like [CollectionStore::drop].
    pub fn clear_all(&self) {
        let removed: Vec<SharedCollection> = self
            .inner
            .collections
            .write_with(|collections| collections.drain().map(|(_, it)| it).collect());
        self.inner.path_index.clear();
        removed.iter().for_each(retire);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .collections
            .read_with(|collections| collections.contains_key(name))
    }

    /// Loaded collection names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.inner.path_index.names()
    }

    pub fn total_documents(&self) -> usize {
        self.inner.collections.read_with(|collections| {
            collections
                .values()
                .map(|documents| documents.read_with(|it| it.len()))
                .sum()
        })
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        let collections = self.inner.collections.read_with(|collections| {
            collections
                .iter()
                .map(|(name, documents)| (name.clone(), documents.read_with(|it| it.clone())))
                .collect()
        });
        StoreSnapshot {
            collections,
            paths: self.inner.path_index.entries(),
        }
    }

    /// Swaps the working set for a snapshot. Collections loaded since the
    /// snapshot are emptied like dropped ones.
    pub(crate) fn replace(&self, snapshot: StoreSnapshot) {
        let restored: HashMap<String, SharedCollection> = snapshot
            .collections
            .into_iter()
            .map(|(name, documents)| (name, atomic(documents)))
            .collect();
        let replaced = self
            .inner
            .collections
            .write_with(|collections| std::mem::replace(collections, restored));
        self.inner.path_index.replace(snapshot.paths);
        replaced.values().for_each(retire);
    }
}

fn retire(documents: &SharedCollection) {
    documents.write_with(|it| it.clear());
}
