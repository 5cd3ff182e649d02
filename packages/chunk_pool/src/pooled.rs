use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::PooledMut;

/// Shared handle to a value stored in a [`ChunkPool`](crate::ChunkPool).
///
/// Cloning the handle increments an atomic reference count. When the last clone is dropped,
/// on whichever thread that happens, the value is dropped and its slot returned to the pool.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use chunk_pool::ChunkPool;
///
/// let pool = ChunkPool::new(1, 32);
/// let greeting = pool
///     .insert_shared("hello".to_string())
///     .expect("slot available");
///
/// let remote = greeting.clone();
/// let length = thread::spawn(move || remote.len())
///     .join()
///     .expect("worker completed");
///
/// assert_eq!(length, 5);
/// drop(greeting);
/// assert!(pool.is_empty());
/// ```
pub struct Pooled<T: ?Sized> {
    inner: Arc<PooledMut<T>>,
}

impl<T: ?Sized> Pooled<T> {
    #[must_use]
    pub(crate) fn new(exclusive: PooledMut<T>) -> Self {
        Self {
            inner: Arc::new(exclusive),
        }
    }

    /// Returns a pointer to the stored value.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.inner.ptr()
    }

    /// Converts back to an exclusive handle if this is the only clone.
    ///
    /// # Errors
    ///
    /// Returns the handle unchanged if other clones still exist.
    pub fn try_into_mut(self) -> Result<PooledMut<T>, Self> {
        Arc::try_unwrap(self.inner).map_err(|inner| Self { inner })
    }
}

impl<T: ?Sized> Clone for Pooled<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &**self.inner
    }
}

impl<T: ?Sized> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("inner", &self.inner)
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}
