use crate::collection::Document;
use crate::common::current_millis;
use crate::errors::FolioResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

/// Mutations that notify subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvents {
    Insert,
    Update,
    Remove,
}

/// Details of a committed mutation, delivered to every subscriber.
///
/// For `Insert` and `Update` the item is the `{id, ...body}` view that was
/// stored. For `Remove` it is the removed document.
///
/// ```ignore
/// db.subscribe(CollectionEventListener::new(|event: CollectionEventInfo| {
///     if event.event_type() == CollectionEvents::Insert {
///         println!("{} got {}", event.collection(), event.id());
///     }
///     Ok(())
/// }))?;
/// ```
#[derive(Clone)]
pub struct CollectionEventInfo {
    inner: Arc<CollectionEventInner>,
}

impl CollectionEventInfo {
    pub fn new(
        collection: &str,
        id: &str,
        item: Option<Document>,
        event_type: CollectionEvents,
    ) -> Self {
        CollectionEventInfo {
            inner: Arc::new(CollectionEventInner {
                collection: collection.to_string(),
                id: id.to_string(),
                item,
                event_type,
                timestamp: current_millis(),
            }),
        }
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn event_type(&self) -> CollectionEvents {
        self.inner.event_type.clone()
    }

    pub fn item(&self) -> Option<Document> {
        self.inner.item.clone()
    }

    /// Milliseconds since the Unix epoch at which the event was created.
    pub fn timestamp(&self) -> u128 {
        self.inner.timestamp
    }
}

impl Debug for CollectionEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventInfo")
            .field("collection", &self.collection())
            .field("id", &self.id())
            .field("event_type", &self.event_type())
            .field("item", &self.inner.item)
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

struct CollectionEventInner {
    collection: String,
    id: String,
    item: Option<Document>,
    event_type: CollectionEvents,
    timestamp: u128,
}

/// Signature of a closure-based event handler.
pub trait CollectionEventCallback: Send + Sync + Fn(CollectionEventInfo) -> FolioResult<()> {}

impl<F> CollectionEventCallback for F where F: Send + Sync + Fn(CollectionEventInfo) -> FolioResult<()> {}

/// Listener registered through `Folio::subscribe`.
#[derive(Clone)]
pub struct CollectionEventListener {
    on_event: Arc<dyn CollectionEventCallback>,
}

impl CollectionEventListener {
    pub fn new(on_event: impl CollectionEventCallback + 'static) -> Self {
        CollectionEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<CollectionEventInfo> for CollectionEventListener {
    fn handle(&self, event: &Event<CollectionEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}
