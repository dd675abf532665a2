use crate::common::FOLIO_EVENT;
use crate::errors::{ErrorKind, FolioError, FolioResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publishes store events to registered listeners.
///
/// Wraps a `basu` event bus on a single topic. Publishing without any
/// listener is a cheap no-op, so mutations pay nothing when nobody observes
/// the store.
///
/// # Example
///
/// ```ignore
/// let event_bus: FolioEventBus<E, L> = FolioEventBus::new();
/// let subscriber = event_bus.register(listener)?;
/// event_bus.publish(event)?;
/// event_bus.deregister(subscriber)?;
/// ```
#[derive(Clone)]
pub struct FolioEventBus<E, L> {
    inner: Arc<FolioEventBusInner<E, L>>,
}

impl<E, L> Default for FolioEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> FolioEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        FolioEventBus {
            inner: Arc::new(FolioEventBusInner::new()),
        }
    }

    /// Registers an event listener with the bus.
    pub fn register(&self, listener: L) -> FolioResult<SubscriberRef> {
        self.inner.register(listener)
    }

    /// Deregisters a previously registered event listener.
    pub fn deregister(&self, subscriber: SubscriberRef) -> FolioResult<()> {
        self.inner.deregister(subscriber)
    }

    /// Publishes an event to all registered listeners.
    pub fn publish(&self, event: E) -> FolioResult<()> {
        self.inner.publish(event)
    }

    /// Clears all registered listeners.
    pub fn close(&self) -> FolioResult<()> {
        self.inner.close()
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

/// Handle returned by a subscription, used to unsubscribe later.
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct FolioEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> FolioEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        FolioEventBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> FolioResult<SubscriberRef> {
        match self.event_bus.subscribe(FOLIO_EVENT, Box::new(listener)) {
            Ok(handler_id) => Ok(SubscriberRef::new(handler_id)),
            Err(e) => {
                let err = Self::folio_error(e);
                log::error!("Failed to register event listener: {}", err);
                Err(err)
            }
        }
    }

    fn deregister(&self, subscriber: SubscriberRef) -> FolioResult<()> {
        match self.event_bus.unsubscribe(FOLIO_EVENT, &subscriber.inner) {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = Self::folio_error(e);
                log::error!("Failed to deregister event listener: {}", err);
                Err(err)
            }
        }
    }

    fn publish(&self, event: E) -> FolioResult<()> {
        let handler_count = match self.event_bus.get_handler_count(FOLIO_EVENT) {
            Ok(count) => count,
            // topic is created by the first subscription
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::folio_error(e)),
        };

        if handler_count == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(FOLIO_EVENT, &basu_event)
            .map_err(Self::folio_error)
    }

    fn close(&self) -> FolioResult<()> {
        self.event_bus.clear().map_err(Self::folio_error)
    }

    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(FOLIO_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    fn folio_error(e: BasuError) -> FolioError {
        match e {
            BasuError::EventTypeNotFOUND => FolioError::new(
                "Event bus error: no listener has been registered yet",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => FolioError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => FolioError::new(
                &format!("Event handler error: {}", e),
                ErrorKind::EventError,
            ),
        }
    }
}
