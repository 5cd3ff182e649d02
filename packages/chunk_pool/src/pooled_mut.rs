use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::ptr::{self, NonNull};

use crate::{ChunkPool, Pooled, RawPooled};

/// Exclusive handle to a value stored in a [`ChunkPool`].
///
/// Dropping the handle drops the value and returns its slot to the pool, exactly once. Moving
/// the handle moves that responsibility along with it.
///
/// Unlike [`Pooled<T>`], this type does not implement [`Clone`] and provides exclusive access
/// through [`DerefMut`].
///
/// # Thread Safety
///
/// The handle is [`Send`] if `T` is [`Send`] and [`Sync`] if `T` is [`Sync`].
///
/// # Example
///
/// ```rust
/// use chunk_pool::ChunkPool;
///
/// let pool = ChunkPool::new(2, 32);
/// let mut items = pool.insert(vec![1, 2]).expect("slot available");
///
/// items.push(3);
/// assert_eq!(*items, [1, 2, 3]);
///
/// drop(items);
/// assert!(pool.is_empty());
/// ```
pub struct PooledMut<T: ?Sized> {
    pooled: RawPooled<T>,

    /// Keeps the pool alive as long as this item exists.
    pool: ChunkPool,
}

impl<T: ?Sized> PooledMut<T> {
    #[must_use]
    pub(crate) fn new(pooled: RawPooled<T>, pool: ChunkPool) -> Self {
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
    #[must_use]
    #[inline]
    pub fn into_shared(self) -> Pooled<T> {
        Pooled::new(self)
    }

    /// Returns a pinned reference to the stored value.
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

impl<T: ?Sized + Send + Sync> PooledMut<T> {
    /// Forgets the static type of the value.
    ///
    /// Dropping the erased handle still runs the destructor of the original type. The erased
    /// handle is [`Send`] and [`Sync`] whatever the original type was, so only values that are
    /// themselves [`Send`] and [`Sync`] can be erased.
    ///
    /// ```compile_fail
    /// use std::rc::Rc;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::new(1, 16);
    /// let handle = pool.insert(Rc::new(1_u32)).expect("slot available");
    ///
    /// // Rc is neither Send nor Sync, so it cannot hide behind an erased handle.
    /// let _erased = handle.erase();
    /// ```
    #[must_use]
    pub fn erase(self) -> PooledMut<()> {
        let this = ManuallyDrop::new(self);

        // SAFETY: `this` is never used again and ManuallyDrop keeps our Drop from running,
        // so moving the fields out cannot cause a double release.
        let pooled = unsafe { ptr::read(ptr::addr_of!(this.pooled)) };
        // SAFETY: As above.
        let pool = unsafe { ptr::read(ptr::addr_of!(this.pool)) };

        PooledMut {
            pooled: pooled.erase(),
            pool,
        }
    }
}

impl<T: ?Sized> Deref for PooledMut<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot holds an initialized T for as long as this handle exists.
        unsafe { self.pooled.ptr().as_ref() }
    }
}

impl<T: ?Sized> DerefMut for PooledMut<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: The slot holds an initialized T and this handle is its only owner.
        unsafe { self.pooled.ptr().as_mut() }
    }
}

impl<T: ?Sized> Drop for PooledMut<T> {
    fn drop(&mut self) {
        let slot = self.pooled.slot();
        let pool = &self.pool;

        // The lock is not held while the destructor runs, so values may own handles into the
        // same pool.
        let _release = scopeguard::guard((), |()| {
            // SAFETY: The slot was issued by this pool and this handle is its only owner.
            unsafe { pool.free(slot) };
        });

        // SAFETY: The value is initialized and this is the only place that drops it.
        unsafe { self.pooled.dropper().drop_target() };
    }
}

impl<T: ?Sized> Unpin for PooledMut<T> {}

// SAFETY: The handle owns its T exclusively and the pool is thread-safe, so moving the handle
// to another thread is equivalent to moving the T. An erased handle still drops the original
// type, which erase() only permits for types that are Send and Sync.
unsafe impl<T: ?Sized + Send> Send for PooledMut<T> {}

// SAFETY: Through &PooledMut<T> only &T is reachable, which is fine to share if T is Sync.
unsafe impl<T: ?Sized + Sync> Sync for PooledMut<T> {}

impl<T: ?Sized> fmt::Debug for PooledMut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledMut")
            .field("pooled", &self.pooled)
            .field("pool", &self.pool)
            .finish()
    }
}
