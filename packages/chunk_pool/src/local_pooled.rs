use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::LocalPooledMut;

/// Shared handle to a value stored in a [`LocalChunkPool`](crate::LocalChunkPool).
///
/// Cloning the handle increments a reference count. When the last clone is dropped, the value
/// is dropped and its slot returned to the pool.
///
/// # Single-threaded Design
///
/// This type is designed for single-threaded use and is neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use chunk_pool::LocalChunkPool;
///
/// let pool = LocalChunkPool::new(1, 8);
/// let value_handle = pool.insert_shared(42_u64).expect("slot available");
///
/// let cloned_handle = value_handle.clone();
/// drop(value_handle);
///
/// assert_eq!(*cloned_handle, 42);
/// assert_eq!(pool.len(), 1);
/// ```
pub struct LocalPooled<T: ?Sized> {
    inner: Rc<LocalPooledMut<T>>,
}

impl<T: ?Sized> LocalPooled<T> {
    #[must_use]
    pub(crate) fn new(exclusive: LocalPooledMut<T>) -> Self {
        Self {
            inner: Rc::new(exclusive),
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
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::LocalChunkPool;
    ///
    /// let pool = LocalChunkPool::new(1, 8);
    /// let shared = pool.insert_shared(1_u64).expect("slot available");
    /// let other = shared.clone();
    ///
    /// let shared = shared.try_into_mut().expect_err("another clone exists");
    /// drop(other);
    ///
    /// let mut exclusive = shared.try_into_mut().expect("only clone left");
    /// *exclusive += 1;
    /// assert_eq!(*exclusive, 2);
    /// ```
    pub fn try_into_mut(self) -> Result<LocalPooledMut<T>, Self> {
        Rc::try_unwrap(self.inner).map_err(|inner| Self { inner })
    }
}

impl<T: ?Sized> Clone for LocalPooled<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for LocalPooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &**self.inner
    }
}

impl<T: ?Sized> fmt::Debug for LocalPooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPooled")
            .field("inner", &self.inner)
            .field("strong_count", &Rc::strong_count(&self.inner))
            .finish()
    }
}
