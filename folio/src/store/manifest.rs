use crate::collection::Document;
use crate::common::{current_timestamp, DEFAULT_COLLECTION, STORE_FORMAT_VERSION};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Documents of one collection keyed by id, in insertion order.
pub type CollectionMap = IndexMap<String, Document>;

/// Content of `.manifest.json`: the collections that have a backing file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    pub collections: Vec<String>,
}

impl Manifest {
    pub fn new(collections: Vec<String>) -> Self {
        Manifest {
            version: STORE_FORMAT_VERSION.to_string(),
            timestamp: current_timestamp(),
            collections,
        }
    }
}

/// A full store snapshot written by `Folio::backup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    pub collections: IndexMap<String, CollectionMap>,
}

impl Backup {
    pub fn new(collections: IndexMap<String, CollectionMap>) -> Self {
        Backup {
            version: STORE_FORMAT_VERSION.to_string(),
            timestamp: current_timestamp(),
            collections,
        }
    }

    /// Reads a backup document.
    ///
    /// Besides the versioned format, a flat `{id: body}` object is accepted
    /// and restored into the default collection.
    pub fn from_value(value: Value) -> FolioResult<Backup> {
        let object = match value {
            Value::Object(object) => object,
            _ => {
                log::error!("Backup content is not a JSON object");
                return Err(FolioError::new(
                    "Backup content is not a JSON object",
                    ErrorKind::FileCorrupted,
                ));
            }
        };

        if object.contains_key("collections") {
            return match serde_json::from_value::<Backup>(Value::Object(object)) {
                Ok(backup) => Ok(backup),
                Err(e) => {
                    log::error!("Invalid backup structure: {}", e);
                    Err(FolioError::new(
                        &format!("Invalid backup structure: {}", e),
                        ErrorKind::FileCorrupted,
                    ))
                }
            };
        }

        log::info!("Reading legacy flat backup into collection {}", DEFAULT_COLLECTION);
        let documents = documents_from_object(object)?;
        let mut collections = IndexMap::new();
        if !documents.is_empty() {
            collections.insert(DEFAULT_COLLECTION.to_string(), documents);
        }
        Ok(Backup::new(collections))
    }
}

/// Converts a flat `{id: body}` object into a collection map. Every body must
/// itself be an object.
pub(crate) fn documents_from_object(object: Document) -> FolioResult<CollectionMap> {
    let mut documents = IndexMap::with_capacity(object.len());
    for (id, body) in object {
        match body {
            Value::Object(body) => {
                documents.insert(id, body);
            }
            _ => {
                log::error!("Document {} is not a JSON object", id);
                return Err(FolioError::new(
                    &format!("Document {} is not a JSON object", id),
                    ErrorKind::FileCorrupted,
                ));
            }
        }
    }
    Ok(documents)
}
