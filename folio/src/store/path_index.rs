use crate::common::{COLLECTION_FILE_EXTENSION, MANIFEST_FILE};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maps collection names to their backing files.
///
/// Holds exactly the collections that are currently loaded. The manifest is
/// always rewritten from [PathIndex::names].
#[derive(Clone)]
pub struct PathIndex {
    inner: Arc<PathIndexInner>,
}

struct PathIndexInner {
    storage_dir: PathBuf,
    manifest_path: PathBuf,
    paths: DashMap<String, PathBuf>,
}

impl PathIndex {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        let manifest_path = storage_dir.join(MANIFEST_FILE);
        PathIndex {
            inner: Arc::new(PathIndexInner {
                storage_dir,
                manifest_path,
                paths: DashMap::new(),
            }),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.inner.storage_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.inner.manifest_path
    }

    /// Path of the file backing `name`, whether or not it is registered.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.inner
            .storage_dir
            .join(format!("{}.{}", name, COLLECTION_FILE_EXTENSION))
    }

    /// Registers `name` and returns its file path.
    pub fn register(&self, name: &str) -> PathBuf {
        let path = self.path_for(name);
        self.inner.paths.insert(name.to_string(), path.clone());
        path
    }

    pub fn remove(&self, name: &str) -> Option<PathBuf> {
        self.inner.paths.remove(name).map(|(_, path)| path)
    }

    pub fn get(&self, name: &str) -> Option<PathBuf> {
        self.inner.paths.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.paths.contains_key(name)
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .paths
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Copy of the current entries, used to swap state back after a failed
    /// restore.
    pub(crate) fn entries(&self) -> Vec<(String, PathBuf)> {
        self.inner
            .paths
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub(crate) fn replace(&self, entries: Vec<(String, PathBuf)>) {
        self.inner.paths.clear();
        for (name, path) in entries {
            self.inner.paths.insert(name, path);
        }
    }

    pub fn clear(&self) {
        self.inner.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.paths.is_empty()
    }
}
