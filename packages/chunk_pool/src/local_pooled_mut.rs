use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::ptr::{self, NonNull};

use crate::{LocalChunkPool, LocalPooled, RawPooled};

/// Exclusive handle to a value stored in a [`LocalChunkPool`].
///
/// Dropping the handle drops the value and returns its slot to the pool, exactly once. Moving
/// the handle moves that responsibility along with it.
///
/// Unlike [`LocalPooled<T>`], this type does not implement [`Clone`] and provides exclusive
/// access through [`DerefMut`].
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
/// let pool = LocalChunkPool::new(2, 32);
/// let mut text = pool.insert("Test".to_string()).expect("slot available");
///
/// text.push_str(" - Modified");
/// assert_eq!(*text, "Test - Modified");
///
/// // Ownership moves with the handle; the slot is only released once.
/// let moved = text;
/// assert_eq!(pool.len(), 1);
///
/// drop(moved);
/// assert!(pool.is_empty());
/// ```
pub struct LocalPooledMut<T: ?Sized> {
    pooled: RawPooled<T>,

    /// Keeps the pool alive as long as this item exists.
    pool: LocalChunkPool,
}

impl<T: ?Sized> LocalPooledMut<T> {
    #[must_use]
    pub(crate) fn new(pooled: RawPooled<T>, pool: LocalChunkPool) -> Self {
        Self { pooled, pool }
    }

    /// Returns a pointer to the stored value.
    ///
    /// The pointer is valid for as long as this handle (or a shared handle created from it)
    /// exists.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.pooled.ptr()
    }

    /// Converts this exclusive handle into a shared, reference-counted one.
    ///
    /// The reference count lives in a separate heap allocation, not in the pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::LocalChunkPool;
    ///
    /// let pool = LocalChunkPool::new(1, 8);
    /// let shared = pool.insert(7_u64).expect("slot available").into_shared();
    /// let other = shared.clone();
    ///
    /// assert_eq!(*shared, *other);
    /// ```
    #[must_use]
    #[inline]
    pub fn into_shared(self) -> LocalPooled<T> {
        LocalPooled::new(self)
    }

    /// Forgets the static type of the value.
    ///
    /// Dropping the erased handle still runs the destructor of the original type.
    #[must_use]
    pub fn erase(self) -> LocalPooledMut<()> {
        let this = ManuallyDrop::new(self);

        // SAFETY: `this` is never used again and ManuallyDrop keeps our Drop from running,
        // so moving the fields out cannot cause a double release.
        let pooled = unsafe { ptr::read(ptr::addr_of!(this.pooled)) };
        // SAFETY: As above.
        let pool = unsafe { ptr::read(ptr::addr_of!(this.pool)) };

        LocalPooledMut {
            pooled: pooled.erase(),
            pool,
        }
    }

    /// Returns a pinned reference to the stored value.
    ///
    /// Values never move out of their slot while a handle exists, so pinning is free.
    #[must_use]
    #[inline]
    pub fn as_pin(&self) -> Pin<&T> {
        // SAFETY: The value stays at a fixed address in its slot until it is dropped.
        unsafe { Pin::new_unchecked(&**self) }
    }

    /// Returns a pinned mutable reference to the stored value.
    #[must_use]
    #[inline]
    pub fn as_pin_mut(&mut self) -> Pin<&mut T> {
        // SAFETY: The value stays at a fixed address in its slot until it is dropped, and we
        // have exclusive access through &mut self.
        unsafe { Pin::new_unchecked(&mut **self) }
    }
}

impl<T: ?Sized> Deref for LocalPooledMut<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot holds an initialized T for as long as this handle exists.
        unsafe { self.pooled.ptr().as_ref() }
    }
}

impl<T: ?Sized> DerefMut for LocalPooledMut<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The slot holds an initialized T and this handle is its only owner.
        unsafe { self.pooled.ptr().as_mut() }
    }
}

impl<T: ?Sized> Drop for LocalPooledMut<T> {
    fn drop(&mut self) {
        let slot = self.pooled.slot();
        let pool = &self.pool;

        // The slot goes back even if the destructor panics. The pool is not borrowed while
        // the destructor runs, so values may own handles into the same pool.
        let _release = scopeguard::guard((), |()| {
            // SAFETY: The slot was issued by this pool and this handle is its only owner.
            unsafe { pool.free(slot) };
        });

        // SAFETY: The value is initialized and this is the only place that drops it.
        unsafe { self.pooled.dropper().drop_target() };
    }
}

// The value never moves while a handle exists, whatever T is, so the handle itself can move.
impl<T: ?Sized> Unpin for LocalPooledMut<T> {}

impl<T: ?Sized> fmt::Debug for LocalPooledMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPooledMut")
            .field("pooled", &self.pooled)
            .field("pool", &self.pool)
            .finish()
    }
}
