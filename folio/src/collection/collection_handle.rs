use crate::collection::aggregate::{run_pipeline, validate_pipeline};
use crate::collection::{
    into_document, with_id, AggregateOutput, AggregateStage, CollectionEventInfo,
    CollectionEvents, CountQuery, Document, DocumentId, Filter, FindOptions, IdGenerator,
    SharedCollection,
};
use crate::common::{ReadExecutor, RecentAccessCache, WriteExecutor};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use crate::folio::Folio;
use serde_json::Value;

/// Handle to a named collection of a [Folio] store.
///
/// Handles are cheap to create and clone. They hold no documents: every call
/// resolves the collection in the store, so a handle stays valid across
/// drops, restores and re-creation of its collection.
///
/// Mutations (`insert`, `insert_with_id`, `update`, `delete`) run one at a
/// time across the whole store. Each commits memory, cache and file before
/// the next one starts. Reads do not wait for mutations.
#[derive(Clone)]
pub struct FolioCollection {
    name: String,
    db: Folio,
}

impl std::fmt::Debug for FolioCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolioCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl FolioCollection {
    pub(crate) fn new(name: &str, db: Folio) -> Self {
        FolioCollection {
            name: name.to_string(),
            db,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents, zero if the collection does not exist.
    pub fn size(&self) -> FolioResult<usize> {
        self.db.ensure_initialized()?;
        Ok(self
            .shared()
            .map(|documents| documents.read_with(|it| it.len()))
            .unwrap_or(0))
    }

    /// Inserts `body` under a generated id and returns `{id, ...body}`.
    pub fn insert(&self, body: Value) -> FolioResult<Document> {
        self.insert_with_id(IdGenerator::next_id(), body)
    }

    /// Inserts `body` under `id` and returns `{id, ...body}`.
    ///
    /// Fails with [ErrorKind::AlreadyExists], without changing anything, if
    /// the id is taken.
    pub fn insert_with_id(&self, id: impl Into<DocumentId>, body: Value) -> FolioResult<Document> {
        self.db.ensure_initialized()?;
        let id: DocumentId = id.into();
        id.validate()?;
        let body = into_document(body)?;
        let id = id.into_string();

        let view = self.db.serializer().run_exclusive(|| -> FolioResult<Document> {
            self.db.check_opened()?;
            let documents = self.db.store().ensure(&self.name)?;

            if documents.read_with(|it| it.contains_key(&id)) {
                log::error!("Document {} already exists in {}", id, self.name);
                return Err(FolioError::new(
                    &format!("Document {} already exists in collection {}", id, self.name),
                    ErrorKind::AlreadyExists,
                ));
            }

            documents.write_with(|it| it.insert(id.clone(), body.clone()));
            self.db.cache().put(self.cache_key(&id), body.clone());

            if let Err(e) = self.persist(&documents) {
                documents.write_with(|it| it.shift_remove(&id));
                self.db.cache().delete(&self.cache_key(&id));
                self.discard_if_empty(&documents);
                return Err(e);
            }

            log::debug!("Inserted document {} into {}", id, self.name);
            Ok(with_id(&id, &body))
        })?;

        self.notify(&id, Some(view.clone()), CollectionEvents::Insert);
        Ok(view)
    }

    /// Creates or fully replaces the document `id` and returns
    /// `{id, ...body}`. The document keeps its position when replaced.
    pub fn update(&self, id: impl Into<DocumentId>, body: Value) -> FolioResult<Document> {
        self.db.ensure_initialized()?;
        let id: DocumentId = id.into();
        id.validate()?;
        let body = into_document(body)?;
        let id = id.into_string();

        let view = self.db.serializer().run_exclusive(|| -> FolioResult<Document> {
            self.db.check_opened()?;
            let documents = self.db.store().ensure(&self.name)?;

            let previous = documents.write_with(|it| it.insert(id.clone(), body.clone()));
            self.db.cache().put(self.cache_key(&id), body.clone());

            if let Err(e) = self.persist(&documents) {
                documents.write_with(|it| match previous {
                    // same key, so the original slot is kept
                    Some(previous) => {
                        it.insert(id.clone(), previous);
                    }
                    None => {
                        it.shift_remove(&id);
                    }
                });
                self.db.cache().delete(&self.cache_key(&id));
                self.discard_if_empty(&documents);
                return Err(e);
            }

            log::debug!("Updated document {} in {}", id, self.name);
            Ok(with_id(&id, &body))
        })?;

        self.notify(&id, Some(view.clone()), CollectionEvents::Update);
        Ok(view)
    }

    /// Looks a document up by id. A miss is `Ok(None)`.
    pub fn find_by_id(&self, id: impl Into<DocumentId>) -> FolioResult<Option<Document>> {
        self.db.ensure_initialized()?;
        let id: DocumentId = id.into();
        let key = self.cache_key(id.as_str());

        if let Some(body) = self.db.cache().get(&key) {
            return Ok(Some(with_id(id.as_str(), &body)));
        }

        // filled under the read lock, so a writer's refresh or eviction lands after it
        let body = self.shared().and_then(|documents| {
            documents.read_with(|it| {
                let body = it.get(id.as_str()).cloned();
                if let Some(body) = &body {
                    self.db.cache().put(key, body.clone());
                }
                body
            })
        });
        Ok(body.map(|body| with_id(id.as_str(), &body)))
    }

    /// Scans the collection in insertion order.
    ///
    /// `skip` drops raw entries before the filter runs, `limit` caps the
    /// number of entries that pass it.
    pub fn find(&self, options: FindOptions) -> FolioResult<Vec<Document>> {
        self.db.ensure_initialized()?;
        let documents = match self.shared() {
            Some(documents) => documents,
            None => return Ok(Vec::new()),
        };

        let mut skip = options.skip.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        documents.read_with(|it| {
            for (id, body) in it.iter() {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                if let Some(filter) = &options.filter {
                    if !filter.apply(id, body) {
                        continue;
                    }
                }
                results.push(with_id(id, body));
                if results.len() >= limit {
                    break;
                }
            }
        });
        Ok(results)
    }

    /// First document accepted by `filter`, if any.
    pub fn find_one(&self, filter: Filter) -> FolioResult<Option<Document>> {
        let mut found = self.find(FindOptions::new().filter(filter).limit(1))?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Removes a document. Returns `false` if it did not exist.
    ///
    /// Removing the last document removes the collection: its file, its
    /// manifest entry and its in-memory entry.
    pub fn delete(&self, id: impl Into<DocumentId>) -> FolioResult<bool> {
        self.db.ensure_initialized()?;
        let id: DocumentId = id.into();
        let id = id.into_string();

        let removed = self.db.serializer().run_exclusive(|| -> FolioResult<Option<Document>> {
            self.db.check_opened()?;
            let documents = match self.shared() {
                Some(documents) => documents,
                None => return Ok(None),
            };

            let removed = documents.write_with(|it| it.shift_remove_full(&id));
            let (index, _, body) = match removed {
                Some(removed) => removed,
                None => return Ok(None),
            };
            self.db.cache().delete(&self.cache_key(&id));

            let now_empty = documents.read_with(|it| it.is_empty());
            let result = if now_empty {
                self.remove_collection()
            } else {
                self.persist(&documents)
            };

            if let Err(e) = result {
                documents.write_with(|it| {
                    it.shift_insert(index, id.clone(), body.clone());
                });
                if now_empty && !self.db.store().contains(&self.name) {
                    let store = self.db.store();
                    let restored = documents.read_with(|it| it.clone());
                    store.register(&self.name, restored);
                    // the manifest may already omit the collection whose file is still on disk
                    if let Err(e) = store.engine().save_manifest(store.names()) {
                        log::warn!("Failed to relist collection {} in the manifest: {}", self.name, e);
                    }
                }
                return Err(e);
            }

            log::debug!("Deleted document {} from {}", id, self.name);
            Ok(Some(with_id(&id, &body)))
        })?;

        match removed {
            Some(view) => {
                self.notify(&id, Some(view), CollectionEvents::Remove);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Counts every document, or the ones accepted by the query's filter.
    /// Skip and limit carried by [FindOptions] are ignored.
    pub fn count(&self, query: impl Into<CountQuery>) -> FolioResult<usize> {
        self.db.ensure_initialized()?;
        let documents = match self.shared() {
            Some(documents) => documents,
            None => return Ok(0),
        };

        let query: CountQuery = query.into();
        Ok(match query.into_filter() {
            None => documents.read_with(|it| it.len()),
            Some(filter) => documents
                .read_with(|it| it.iter().filter(|(id, body)| filter.apply(id, body)).count()),
        })
    }

    /// Lazily iterates `{id, ...body}` in insertion order, one live entry
    /// at a time.
    pub fn stream(&self) -> FolioResult<DocumentStream> {
        self.db.ensure_initialized()?;
        Ok(DocumentStream {
            documents: self.shared(),
            position: 0,
        })
    }

    /// Runs an aggregation pipeline over all documents.
    pub fn aggregate(&self, stages: &[AggregateStage]) -> FolioResult<AggregateOutput> {
        validate_pipeline(stages)?;
        let documents = self.find(FindOptions::new())?;
        run_pipeline(documents, stages)
    }

    fn shared(&self) -> Option<SharedCollection> {
        self.db.store().get(&self.name)
    }

    fn cache_key(&self, id: &str) -> String {
        RecentAccessCache::key(&self.name, id)
    }

    /// Writes the collection file and the manifest.
    fn persist(&self, documents: &SharedCollection) -> FolioResult<()> {
        let store = self.db.store();
        let path = store
            .path_index()
            .get(&self.name)
            .unwrap_or_else(|| store.path_index().register(&self.name));

        documents
            .read_with(|it| store.engine().save_collection(&path, it))
            .map_err(|e| {
                log::error!("Failed to persist collection {}: {}", self.name, e);
                FolioError::new_with_cause(
                    &format!("Failed to persist collection {}", self.name),
                    e.kind().clone(),
                    e,
                )
            })?;
        store.engine().save_manifest(store.names())
    }

    /// Removes the now empty collection from memory, manifest and disk.
    ///
    /// The manifest is rewritten before the file is deleted, so a failure
    /// never leaves a listed collection without its file.
    fn remove_collection(&self) -> FolioResult<()> {
        let store = self.db.store();
        let path = store
            .drop(&self.name)
            .unwrap_or_else(|| store.path_index().path_for(&self.name));
        store.engine().save_manifest(store.names())?;
        store.engine().remove_file(&path)?;
        log::debug!("Collection {} is empty and was removed", self.name);
        Ok(())
    }

    /// Forgets a collection that a rolled back mutation left empty, so an
    /// empty collection never lingers in memory or in the manifest.
    fn discard_if_empty(&self, documents: &SharedCollection) {
        if documents.read_with(|it| it.is_empty()) {
            self.db.store().drop(&self.name);
        }
    }

    fn notify(&self, id: &str, item: Option<Document>, event_type: CollectionEvents) {
        let event = CollectionEventInfo::new(&self.name, id, item, event_type);
        self.db.publish(event);
    }
}

/// Lazy iterator over a collection, created by [FolioCollection::stream].
///
/// Reads the live collection one entry at a time. Entries inserted while
/// streaming are visible; deleting entries while streaming shifts later
/// entries down and may skip one.
pub struct DocumentStream {
    documents: Option<SharedCollection>,
    position: usize,
}

impl Iterator for DocumentStream {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        let documents = self.documents.as_ref()?;
        let next = documents.read_with(|it| {
            it.get_index(self.position)
                .map(|(id, body)| with_id(id, body))
        });
        match next {
            Some(document) => {
                self.position += 1;
                Some(document)
            }
            None => {
                self.documents = None;
                None
            }
        }
    }
}
