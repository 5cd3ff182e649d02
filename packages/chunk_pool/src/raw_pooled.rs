use std::ptr::NonNull;
use std::{any, fmt};

use crate::Dropper;

/// Unmanaged handle to a value stored in a [`RawChunkPool`].
///
/// The handle remembers which slot holds the value and how to drop it, but does nothing when
/// it goes out of scope. Pass it to [`RawChunkPool::remove()`] to drop the value and free the
/// slot. A handle that is never removed leaks its slot until the pool itself is dropped.
///
/// The handle is neither [`Copy`] nor [`Clone`], so removal consumes the only way to reach the
/// value.
///
/// # Example
///
/// ```rust
/// use chunk_pool::RawChunkPool;
///
/// let mut pool = RawChunkPool::new(2, 16);
///
/// let item = pool.insert(7_u32).expect("slot available");
///
/// // SAFETY: The handle has not been removed, so the value is alive.
/// assert_eq!(unsafe { item.ptr().read() }, 7);
///
/// pool.remove(item);
/// ```
///
/// [`RawChunkPool`]: crate::RawChunkPool
/// [`RawChunkPool::remove()`]: crate::RawChunkPool::remove
#[must_use = "a RawPooled that is never passed to RawChunkPool::remove() leaks its slot"]
pub struct RawPooled<T: ?Sized> {
    pool_id: u64,

    ptr: NonNull<T>,

    /// Drops the value with its original type, even after erase().
    dropper: Dropper,
}

impl<T> RawPooled<T> {
    /// # Safety
    ///
    /// `ptr` must point to an initialized `T` in a slot issued by the pool with `pool_id`,
    /// and no other handle may claim that slot.
    pub(crate) unsafe fn new(pool_id: u64, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            ptr,
            // SAFETY: Forwarding the guarantee that ptr holds an initialized T that only this
            // handle will drop.
            dropper: unsafe { Dropper::new(ptr) },
        }
    }
}

impl<T: ?Sized> RawPooled<T> {
    /// Returns a pointer to the stored value.
    ///
    /// The pointer is valid until the handle is passed to
    /// [`RawChunkPool::remove()`](crate::RawChunkPool::remove) or the pool is dropped.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Forgets the static type of the value.
    ///
    /// Removing the erased handle still runs the destructor of the original type.
    #[inline]
    pub fn erase(self) -> RawPooled<()> {
        RawPooled {
            pool_id: self.pool_id,
            ptr: self.ptr.cast::<()>(),
            dropper: self.dropper,
        }
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub(crate) fn slot(&self) -> NonNull<u8> {
        self.ptr.cast::<u8>()
    }

    pub(crate) fn dropper(&self) -> Dropper {
        self.dropper
    }
}

impl<T: ?Sized> fmt::Debug for RawPooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPooled")
            .field("type_name", &any::type_name::<T>())
            .field("pool_id", &self.pool_id)
            .field("ptr", &self.ptr)
            .finish_non_exhaustive()
    }
}
