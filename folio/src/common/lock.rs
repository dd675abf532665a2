use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Global mutual-exclusion gate for every mutating store operation.
///
/// The serializer hands out tickets in arrival order and admits exactly one
/// holder at a time, so queued writers are released strictly first-in,
/// first-out. It is shared by every collection of a store: two mutations never
/// interleave their in-memory changes or their file writes, even when they
/// target different collections.
///
/// The serializer is not reentrant. Acquiring it again from inside a section
/// that already holds it deadlocks; callers must not nest mutations.
///
/// # Examples
///
/// ```
/// use folio::common::WriteSerializer;
/// let serializer = WriteSerializer::new();
/// let answer = serializer.run_exclusive(|| 40 + 2);
/// assert_eq!(answer, 42);
/// ```
#[derive(Clone)]
pub struct WriteSerializer {
    inner: Arc<SerializerInner>,
}

struct SerializerInner {
    state: Mutex<TicketState>,
    turn_changed: Condvar,
}

#[derive(Default)]
struct TicketState {
    next_ticket: u64,
    now_serving: u64,
}

impl WriteSerializer {
    /// Creates a new, unlocked serializer.
    pub fn new() -> Self {
        WriteSerializer {
            inner: Arc::new(SerializerInner {
                state: Mutex::new(TicketState::default()),
                turn_changed: Condvar::new(),
            }),
        }
    }

    /// Blocks until it is this caller's turn and returns a guard that holds
    /// the serializer until dropped.
    pub fn acquire(&self) -> SerializerGuard<'_> {
        let mut state = self.inner.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        while state.now_serving != ticket {
            self.inner.turn_changed.wait(&mut state);
        }
        SerializerGuard { serializer: self }
    }

    /// Runs `f` while holding the serializer and returns its result.
    ///
    /// The serializer is released when `f` returns, including when it panics.
    pub fn run_exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.acquire();
        f()
    }

    /// Returns `true` if some caller currently holds the serializer.
    pub fn is_locked(&self) -> bool {
        let state = self.inner.state.lock();
        state.next_ticket != state.now_serving
    }

    /// Number of callers holding or waiting for the serializer.
    pub fn queue_length(&self) -> u64 {
        let state = self.inner.state.lock();
        state.next_ticket.wrapping_sub(state.now_serving)
    }

    fn release(&self) {
        let mut state = self.inner.state.lock();
        state.now_serving = state.now_serving.wrapping_add(1);
        drop(state);
        // every waiter re-checks its own ticket, only the next one proceeds
        self.inner.turn_changed.notify_all();
    }
}

impl Default for WriteSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the [WriteSerializer] until dropped.
pub struct SerializerGuard<'a> {
    serializer: &'a WriteSerializer,
}

impl Drop for SerializerGuard<'_> {
    fn drop(&mut self) {
        self.serializer.release();
    }
}
