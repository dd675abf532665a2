use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, lock-protected state. Clones point at the same value.
pub type Atomic<T> = Arc<RwLock<T>>;

#[inline]
pub fn atomic<T>(value: T) -> Atomic<T> {
    Arc::new(RwLock::new(value))
}

/// Runs a closure under the read lock of an [Atomic].
///
/// The lock is held only for the duration of the closure, so callers never
/// keep a guard across a persistence call.
pub trait ReadExecutor<T: ?Sized> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

/// Runs a closure under the write lock of an [Atomic].
pub trait WriteExecutor<T: ?Sized> {
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

impl<T> ReadExecutor<T> for Atomic<T> {
    #[inline]
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.read())
    }
}

impl<T> WriteExecutor<T> for Atomic<T> {
    #[inline]
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.write())
    }
}
