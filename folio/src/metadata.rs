use serde::{Deserialize, Serialize};

/// Document count of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
}

/// Point-in-time statistics of a store, with the configuration it runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub collections: Vec<CollectionStats>,
    pub total_documents: usize,
    pub cache_size: usize,
    pub cache_capacity: usize,
    pub storage_path: String,
    pub sync_writes: bool,
}

impl StoreStats {
    /// Document count of `name`, `None` if the collection does not exist.
    pub fn document_count(&self, name: &str) -> Option<usize> {
        self.collections
            .iter()
            .find(|stats| stats.name == name)
            .map(|stats| stats.document_count)
    }
}
