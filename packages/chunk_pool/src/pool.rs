use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use scopeguard::ScopeGuard;

use crate::constants::ERR_POISONED_LOCK;
use crate::{AllocError, ChunkPoolBuilder, Pooled, PooledMut, RawChunkPool, RawPooled};

/// A thread-safe wrapper around [`RawChunkPool`] that returns slots automatically.
///
/// This type acts as a cloneable handle to a shared [`RawChunkPool`] instance guarded by a
/// mutex. Every handle issued by the pool holds a clone, so the backing buffer stays alive for
/// as long as any value stored in it does.
///
/// Value constructors and destructors run without the lock held.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use chunk_pool::ChunkPool;
///
/// let pool = ChunkPool::new(8, 64);
///
/// let workers: Vec<_> = (0..4_u64)
///     .map(|i| {
///         let pool = pool.clone();
///         thread::spawn(move || {
///             let value = pool.insert(i * 10).expect("slot available");
///             *value
///         })
///     })
///     .collect();
///
/// let mut results: Vec<_> = workers
///     .into_iter()
///     .map(|worker| worker.join().expect("worker completed"))
///     .collect();
/// results.sort_unstable();
///
/// assert_eq!(results, vec![0, 10, 20, 30]);
/// assert!(pool.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct ChunkPool {
    inner: Arc<Mutex<RawChunkPool>>,
}

impl From<RawChunkPool> for ChunkPool {
    /// Wraps an existing raw pool in thread-safe reference counting.
    fn from(pool: RawChunkPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }
}

impl ChunkPool {
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
    pub fn builder() -> ChunkPoolBuilder {
        ChunkPoolBuilder::new()
    }

    /// Takes a raw slot able to hold `requested_size` bytes.
    ///
    /// See [`RawChunkPool::alloc()`].
    #[must_use]
    pub fn alloc(&self, requested_size: usize) -> Option<NonNull<u8>> {
        self.inner
            .lock()
            .expect(ERR_POISONED_LOCK)
            .alloc(requested_size)
    }

    /// Takes a raw slot able to hold `requested_size` bytes, explaining any failure.
    ///
    /// # Errors
    ///
    /// See [`RawChunkPool::try_alloc()`].
    pub fn try_alloc(&self, requested_size: usize) -> Result<NonNull<u8>, AllocError> {
        self.inner
            .lock()
            .expect(ERR_POISONED_LOCK)
            .try_alloc(requested_size)
    }

    /// Returns a raw slot to the pool.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `slot` was issued by this pool (or a clone of it) via
    /// [`alloc()`](Self::alloc) or [`try_alloc()`](Self::try_alloc) and has not been freed
    /// since.
    pub unsafe fn free(&self, slot: NonNull<u8>) {
        let mut pool = self.inner.lock().expect(ERR_POISONED_LOCK);

        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { pool.free(slot) };
    }

    /// Moves `value` into a free slot and returns an exclusive handle to it.
    ///
    /// Returns `None` if `T` does not fit a slot or every slot is outstanding, in which case
    /// `value` is dropped.
    #[must_use]
    pub fn insert<T>(&self, value: T) -> Option<PooledMut<T>> {
        self.try_insert(value).ok()
    }

    /// Moves `value` into a free slot, explaining any failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding. `value` is dropped.
    pub fn try_insert<T>(&self, value: T) -> Result<PooledMut<T>, AllocError> {
        self.try_insert_with(|| value)
    }

    /// Constructs a value in a free slot and returns an exclusive handle to it.
    ///
    /// `f` is only called once a slot has been secured, so failure has no side effects.
    #[must_use]
    pub fn insert_with<T>(&self, f: impl FnOnce() -> T) -> Option<PooledMut<T>> {
        self.try_insert_with(f).ok()
    }

    /// Constructs a value in a free slot, explaining any failure.
    ///
    /// `f` is only called once a slot has been secured and runs without the lock held. If `f`
    /// panics, the slot is returned to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding.
    pub fn try_insert_with<T>(&self, f: impl FnOnce() -> T) -> Result<PooledMut<T>, AllocError> {
        let (pool_id, ptr) = {
            let mut pool = self.inner.lock().expect(ERR_POISONED_LOCK);
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

        Ok(PooledMut::new(pooled, self.clone()))
    }

    /// Moves `value` into a free slot and returns a shared, reference-counted handle to it.
    #[must_use]
    pub fn insert_shared<T>(&self, value: T) -> Option<Pooled<T>> {
        self.insert(value).map(PooledMut::into_shared)
    }

    /// Number of slots currently outstanding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).len()
    }

    /// Whether no slots are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect(ERR_POISONED_LOCK).is_empty()
    }

    /// Number of slots that can still be issued.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).available()
    }

    /// Whether every slot is outstanding.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.lock().expect(ERR_POISONED_LOCK).is_full()
    }

    /// Total number of slots in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).capacity()
    }

    /// Size of every slot in bytes.
    #[must_use]
    pub fn slot_size(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).slot_size()
    }

    /// Alignment that every slot address is guaranteed to have.
    #[must_use]
    pub fn slot_alignment(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).slot_alignment()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ChunkPool: Send, Sync, Clone);

    #[test]
    fn concurrent_allocations_never_alias() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 8;

        let pool = ChunkPool::new(THREADS * PER_THREAD, 16);
        let barrier = Arc::new(Barrier::new(THREADS));

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = pool.clone();
                let barrier = Arc::clone(&barrier);

                thread::spawn(move || {
                    barrier.wait();

                    (0..PER_THREAD)
                        .map(|_| pool.alloc(16).expect("capacity covers every thread").addr())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let addresses: HashSet<_> = workers
            .into_iter()
            .flat_map(|worker| worker.join().expect("worker completed"))
            .collect();

        assert_eq!(addresses.len(), THREADS * PER_THREAD);
        assert!(pool.is_full());
        assert_eq!(pool.alloc(1), None);
    }

    #[test]
    fn handles_can_be_dropped_on_other_threads() {
        let pool = ChunkPool::new(2, 32);
        let handle = pool.insert("moved".to_string()).expect("slot available");

        thread::spawn(move || {
            assert_eq!(*handle, "moved");
        })
        .join()
        .expect("worker completed");

        assert!(pool.is_empty());
    }

    #[test]
    fn destructor_may_use_the_same_pool() {
        let pool = ChunkPool::new(2, 64);

        let outer = pool
            .insert_with(|| pool.insert(1_u16).expect("second slot available"))
            .expect("first slot available");
        assert_eq!(pool.len(), 2);

        // Would deadlock if the lock were held while the outer destructor runs.
        drop(outer);
        assert!(pool.is_empty());
    }

    #[test]
    fn exhaustion_and_oversize_are_reported() {
        let pool = ChunkPool::new(1, 8);

        assert_eq!(
            pool.try_insert([0_u8; 9]).err(),
            Some(AllocError::Oversized {
                requested: 9,
                slot_size: 8
            })
        );

        let _held = pool.insert(0_u64).expect("slot available");
        assert_eq!(
            pool.try_insert(1_u64).err(),
            Some(AllocError::Exhausted { capacity: 1 })
        );
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn reports_configuration() {
        let pool = ChunkPool::new(3, 40);

        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.slot_size(), 40);
        assert_eq!(pool.slot_alignment(), 8);
        assert!(pool.is_empty());
    }
}
