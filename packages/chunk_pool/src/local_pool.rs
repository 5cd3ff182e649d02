use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use scopeguard::ScopeGuard;

use crate::{
    AllocError, LocalChunkPoolBuilder, LocalPooled, LocalPooledMut, RawChunkPool, RawPooled,
};

/// A single-threaded wrapper around [`RawChunkPool`] that returns slots automatically.
///
/// This type acts as a cloneable handle to a shared [`RawChunkPool`] instance. Every handle
/// issued by the pool holds a clone, so the backing buffer stays alive for as long as any
/// value stored in it does.
///
/// # Single-threaded Design
///
/// This type is designed for single-threaded use and is neither [`Send`] nor [`Sync`].
/// For multi-threaded scenarios, use [`crate::ChunkPool`] instead.
///
/// # Example
///
/// ```rust
/// use chunk_pool::LocalChunkPool;
///
/// let pool = LocalChunkPool::new(4, 64);
///
/// let mut counter = pool.insert(0_u32).expect("slot available");
/// *counter += 1;
/// assert_eq!(*counter, 1);
///
/// drop(counter);
/// assert!(pool.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct LocalChunkPool {
    inner: Rc<RefCell<RawChunkPool>>,
}

impl From<RawChunkPool> for LocalChunkPool {
    /// Wraps an existing raw pool in single-threaded reference counting.
    ///
    /// Slots already outstanding in the raw pool stay outstanding.
    fn from(pool: RawChunkPool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(pool)),
        }
    }
}

impl LocalChunkPool {
    /// Creates a pool of `capacity` slots of `slot_size` bytes each, with default policies.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero.
    #[must_use]
    pub fn new(capacity: usize, slot_size: usize) -> Self {
        Self::from(RawChunkPool::new(capacity, slot_size))
    }

    /// Returns a builder for configuring a new pool.
    pub fn builder() -> LocalChunkPoolBuilder {
        LocalChunkPoolBuilder::new()
    }

    /// Takes a raw slot able to hold `requested_size` bytes.
    ///
    /// See [`RawChunkPool::alloc()`].
    #[must_use]
    pub fn alloc(&self, requested_size: usize) -> Option<NonNull<u8>> {
        self.inner.borrow_mut().alloc(requested_size)
    }

    /// Takes a raw slot able to hold `requested_size` bytes, explaining any failure.
    ///
    /// # Errors
    ///
    /// See [`RawChunkPool::try_alloc()`].
    pub fn try_alloc(&self, requested_size: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner.borrow_mut().try_alloc(requested_size)
    }

    /// Returns a raw slot to the pool.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `slot` was issued by this pool (or a clone of it) via
    /// [`alloc()`](Self::alloc) or [`try_alloc()`](Self::try_alloc) and has not been freed
    /// since.
    pub unsafe fn free(&self, slot: NonNull<u8>) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { self.inner.borrow_mut().free(slot) };
    }

    /// Moves `value` into a free slot and returns an exclusive handle to it.
    ///
    /// Returns `None` if `T` does not fit a slot or every slot is outstanding, in which case
    /// `value` is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::LocalChunkPool;
    ///
    /// let pool = LocalChunkPool::new(1, 32);
    ///
    /// let text = pool.insert("hello".to_string()).expect("slot available");
    /// assert_eq!(*text, "hello");
    ///
    /// // Exhausted until the handle is dropped.
    /// assert!(pool.insert(1_u8).is_none());
    /// ```
    #[must_use]
    pub fn insert<T>(&self, value: T) -> Option<LocalPooledMut<T>> {
        self.try_insert(value).ok()
    }

    /// Moves `value` into a free slot, explaining any failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding. `value` is dropped.
    pub fn try_insert<T>(&self, value: T) -> Result<LocalPooledMut<T>, AllocError> {
        self.try_insert_with(|| value)
    }

    /// Constructs a value in a free slot and returns an exclusive handle to it.
    ///
    /// `f` is only called once a slot has been secured, so failure has no side effects.
    #[must_use]
    pub fn insert_with<T>(&self, f: impl FnOnce() -> T) -> Option<LocalPooledMut<T>> {
        self.try_insert_with(f).ok()
    }

    /// Constructs a value in a free slot, explaining any failure.
    ///
    /// `f` is only called once a slot has been secured and runs without the pool being
    /// borrowed, so it may itself insert into the same pool. If `f` panics, the slot is
    /// returned to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding.
    pub fn try_insert_with<T>(
        &self,
        f: impl FnOnce() -> T,
    ) -> Result<LocalPooledMut<T>, AllocError> {
        let (pool_id, ptr) = {
            let mut pool = self.inner.borrow_mut();
            (pool.pool_id(), pool.reserve_for::<T>()?)
        };

        let guard = scopeguard::guard((), |()| {
            // SAFETY: The slot was issued above and nothing else has seen it yet.
            unsafe { self.free(ptr.cast()) };
        });

        // SAFETY: The slot is large enough and aligned for T, and it is exclusively ours.
        unsafe { ptr.write(f()) };

        ScopeGuard::into_inner(guard);

        // SAFETY: The slot now holds an initialized T issued by the pool with this ID.
        let pooled = unsafe { RawPooled::new(pool_id, ptr) };

        Ok(LocalPooledMut::new(pooled, self.clone()))
    }

    /// Moves `value` into a free slot and returns a shared, reference-counted handle to it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::LocalChunkPool;
    ///
    /// let pool = LocalChunkPool::new(2, 16);
    ///
    /// let first = pool.insert_shared(42_u64).expect("slot available");
    /// let second = first.clone();
    ///
    /// drop(first);
    /// assert_eq!(*second, 42);
    /// assert_eq!(pool.len(), 1);
    ///
    /// drop(second);
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn insert_shared<T>(&self, value: T) -> Option<LocalPooled<T>> {
        self.insert(value).map(LocalPooledMut::into_shared)
    }

    /// Number of slots currently outstanding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether no slots are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Number of slots that can still be issued.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.borrow().available()
    }

    /// Whether every slot is outstanding.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.borrow().is_full()
    }

    /// Total number of slots in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity()
    }

    /// Size of every slot in bytes.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        self.inner.borrow().slot_size()
    }

    /// Alignment that every slot address is guaranteed to have.
    #[must_use]
    pub fn slot_alignment(&self) -> usize {
        self.inner.borrow().slot_alignment()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::InitPolicy;

    assert_not_impl_any!(LocalChunkPool: Send, Sync);

    #[test]
    fn clones_share_the_same_pool() {
        let pool = LocalChunkPool::new(2, 16);
        let pool_clone = pool.clone();

        let _a = pool.insert(1_u32).expect("slot available");
        let _b = pool_clone.insert(2_u32).expect("slot available");

        assert_eq!(pool.len(), 2);
        assert!(pool_clone.is_full());
        assert!(pool.insert(3_u32).is_none());
    }

    #[test]
    fn raw_and_typed_allocations_share_capacity() {
        let pool = LocalChunkPool::new(2, 16);

        let raw = pool.alloc(16).expect("slot available");
        let _typed = pool.insert(1_u64).expect("slot available");

        assert_eq!(pool.try_alloc(1), Err(AllocError::Exhausted { capacity: 2 }));

        // SAFETY: Issued by this pool, freed once.
        unsafe { pool.free(raw) };
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn constructor_may_use_the_same_pool() {
        let pool = LocalChunkPool::new(2, 64);

        let outer = pool
            .insert_with(|| pool.insert(5_u32).expect("second slot available"))
            .expect("first slot available");

        assert_eq!(**outer, 5);
        assert_eq!(pool.len(), 2);

        drop(outer);
        assert!(pool.is_empty());
    }

    #[test]
    fn constructor_panic_returns_slot() {
        let pool = LocalChunkPool::new(1, 8);

        let result = catch_unwind(AssertUnwindSafe(|| {
            pool.insert_with::<u32>(|| panic!("constructor failed"))
        }));

        assert!(result.is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn failed_insert_does_not_construct() {
        let pool = LocalChunkPool::new(1, 4);
        let called = Cell::new(false);

        let result = pool.try_insert_with(|| {
            called.set(true);
            0_u64
        });

        assert_eq!(
            result.err(),
            Some(AllocError::Oversized {
                requested: 8,
                slot_size: 4
            })
        );
        assert!(!called.get());
    }

    #[test]
    fn lazy_pool_serves_typed_values() {
        let pool = LocalChunkPool::builder()
            .capacity(3)
            .slot_size_of::<u64>()
            .init_policy(InitPolicy::Lazy)
            .build();

        let handles: Vec<_> = (0..3_u64)
            .map(|i| pool.insert(i).expect("slot available"))
            .collect();

        assert!(pool.is_full());

        for (expected, handle) in (0..3_u64).zip(&handles) {
            assert_eq!(**handle, expected);
        }

        drop(handles);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn reports_configuration() {
        let pool = LocalChunkPool::new(5, 24);

        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.slot_size(), 24);
        assert_eq!(pool.slot_alignment(), 8);
    }
}
