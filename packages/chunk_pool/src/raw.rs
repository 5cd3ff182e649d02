use std::alloc::{Layout, alloc, dealloc};
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, mem, thread};

use scopeguard::ScopeGuard;

use crate::constants::BUFFER_ALIGNMENT;
use crate::{AllocError, DropPolicy, InitPolicy, RawChunkPoolBuilder, RawPooled};

static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A fixed number of equal-size memory slots carved out of one preallocated buffer.
///
/// Slots are handed out by [`alloc()`](Self::alloc) and taken back by [`free()`](Self::free),
/// both in O(1). Freed slots are kept on a LIFO stack so the most recently freed slot, the one
/// most likely to still be in cache, is the next one issued.
///
/// The pool can also construct typed values in its slots via [`insert()`](Self::insert) and
/// friends. The returned [`RawPooled<T>`] does not clean up after itself; it must be passed
/// back to [`remove()`](Self::remove). For automatic cleanup, wrap the pool in a
/// [`LocalChunkPool`](crate::LocalChunkPool) or [`ChunkPool`](crate::ChunkPool).
///
/// # Example
///
/// ```rust
/// use chunk_pool::RawChunkPool;
///
/// let mut pool = RawChunkPool::new(4, 64);
///
/// let slots: Vec<_> = (0..4).map(|_| pool.alloc(64).expect("slot available")).collect();
/// assert!(pool.alloc(64).is_none());
///
/// for slot in slots {
///     // SAFETY: Each slot was issued by this pool and is freed exactly once.
///     unsafe { pool.free(slot) };
/// }
///
/// assert!(pool.is_empty());
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]). Use
/// [`ChunkPool`](crate::ChunkPool) to share a pool between threads.
pub struct RawChunkPool {
    /// Ensures typed handles can only be returned to the pool they came from.
    pool_id: u64,

    buffer: NonNull<u8>,
    buffer_layout: Layout,

    slot_size: NonZero<usize>,
    capacity: NonZero<usize>,

    /// Stack of slots available for reuse. Preallocated to `capacity`, so pushes by callers
    /// honoring the free() contract never reallocate.
    free_slots: Vec<NonNull<u8>>,

    /// Byte offset of the first slot that has never been issued. Starts at the end of the
    /// buffer under the eager policy, since every slot is already on the free stack.
    high_watermark: usize,

    /// Number of slots currently held by callers.
    len: usize,

    init_policy: InitPolicy,
    drop_policy: DropPolicy,

    /// Which slots are currently issued, used to catch double frees and foreign addresses.
    #[cfg(debug_assertions)]
    occupied: Vec<bool>,
}

impl RawChunkPool {
    /// Creates a pool of `capacity` slots of `slot_size` bytes each, with default policies.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero or the backing buffer would exceed the maximum
    /// allocation size.
    #[must_use]
    pub fn new(capacity: usize, slot_size: usize) -> Self {
        Self::builder()
            .capacity(capacity)
            .slot_size(slot_size)
            .build()
    }

    /// Returns a builder for configuring a new pool.
    #[inline]
    pub fn builder() -> RawChunkPoolBuilder {
        RawChunkPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(
        capacity: NonZero<usize>,
        slot_size: NonZero<usize>,
        init_policy: InitPolicy,
        drop_policy: DropPolicy,
    ) -> Self {
        let buffer_size = capacity
            .get()
            .checked_mul(slot_size.get())
            .expect("chunk pool buffer size overflows usize");

        let buffer_layout = Layout::from_size_align(buffer_size, BUFFER_ALIGNMENT)
            .expect("chunk pool buffer size exceeds the maximum allocation size");

        // SAFETY: The layout has a non-zero size because both capacity and slot size are
        // non-zero, as guaranteed by the NonZero types.
        let buffer = NonNull::new(unsafe { alloc(buffer_layout) }).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM results in panic",
        );

        let mut free_slots = Vec::with_capacity(capacity.get());

        let high_watermark = match init_policy {
            InitPolicy::Eager => {
                // Pushed in reverse so that pops issue slots in ascending address order.
                for index in (0..capacity.get()).rev() {
                    // Cannot overflow because index * slot_size < buffer_size.
                    let offset = index.wrapping_mul(slot_size.get());

                    // SAFETY: The offset is within the buffer we just allocated.
                    free_slots.push(unsafe { buffer.add(offset) });
                }

                buffer_size
            }
            InitPolicy::Lazy => 0,
        };

        tracing::debug!(
            capacity = capacity.get(),
            slot_size = slot_size.get(),
            ?init_policy,
            ?drop_policy,
            "created chunk pool"
        );

        Self {
            pool_id: generate_pool_id(),
            buffer,
            buffer_layout,
            slot_size,
            capacity,
            free_slots,
            high_watermark,
            len: 0,
            init_policy,
            drop_policy,
            #[cfg(debug_assertions)]
            occupied: vec![false; capacity.get()],
        }
    }

    /// Total number of slots in the pool.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Size of every slot in bytes.
    #[must_use]
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size.get()
    }

    /// Alignment that every slot address is guaranteed to have.
    ///
    /// This is the largest power of two that divides the slot size, capped at the alignment of
    /// the backing buffer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::RawChunkPool;
    ///
    /// assert_eq!(RawChunkPool::new(4, 24).slot_alignment(), 8);
    /// assert_eq!(RawChunkPool::new(4, 12).slot_alignment(), 4);
    /// assert_eq!(RawChunkPool::new(4, 4096).slot_alignment(), 16);
    /// ```
    #[must_use]
    #[inline]
    pub fn slot_alignment(&self) -> usize {
        let slot_size = self.slot_size.get();

        // Isolates the lowest set bit.
        (slot_size & slot_size.wrapping_neg()).min(BUFFER_ALIGNMENT)
    }

    /// The initialization policy the pool was built with.
    #[must_use]
    #[inline]
    pub fn init_policy(&self) -> InitPolicy {
        self.init_policy
    }

    /// Number of slots currently outstanding.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slots are outstanding.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots that can still be issued.
    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity.get().saturating_sub(self.len)
    }

    /// Whether every slot is outstanding, so the next allocation will fail.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity.get()
    }

    /// Whether `ptr` is the address of one of this pool's slots.
    ///
    /// This does not say whether the slot is currently outstanding.
    #[must_use]
    pub fn contains<T: ?Sized>(&self, ptr: NonNull<T>) -> bool {
        self.slot_index(ptr.cast()).is_some()
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    fn slot_index(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = ptr
            .as_ptr()
            .addr()
            .checked_sub(self.buffer.as_ptr().addr())?;

        if offset >= self.buffer_layout.size() || offset.checked_rem(self.slot_size.get())? != 0 {
            return None;
        }

        offset.checked_div(self.slot_size.get())
    }

    /// Takes a slot able to hold `requested_size` bytes.
    ///
    /// Returns `None` if the request is larger than a slot or if every slot is outstanding.
    /// Use [`try_alloc()`](Self::try_alloc) to learn which.
    ///
    /// The returned memory is uninitialized. It stays valid until it is passed to
    /// [`free()`](Self::free) or the pool is dropped.
    #[must_use]
    #[inline]
    pub fn alloc(&mut self, requested_size: usize) -> Option<NonNull<u8>> {
        self.try_alloc(requested_size).ok()
    }

    /// Takes a slot able to hold `requested_size` bytes, explaining any failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] if `requested_size` exceeds the slot size, whatever
    /// the state of the pool, and [`AllocError::Exhausted`] if every slot is outstanding.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::{AllocError, RawChunkPool};
    ///
    /// let mut pool = RawChunkPool::new(1, 16);
    ///
    /// assert_eq!(
    ///     pool.try_alloc(17),
    ///     Err(AllocError::Oversized {
    ///         requested: 17,
    ///         slot_size: 16
    ///     })
    /// );
    ///
    /// let slot = pool.try_alloc(16)?;
    /// assert_eq!(pool.try_alloc(1), Err(AllocError::Exhausted { capacity: 1 }));
    ///
    /// // SAFETY: The slot was issued by this pool and has not been freed yet.
    /// unsafe { pool.free(slot) };
    /// # Ok::<(), AllocError>(())
    /// ```
    pub fn try_alloc(&mut self, requested_size: usize) -> Result<NonNull<u8>, AllocError> {
        if requested_size > self.slot_size.get() {
            return Err(AllocError::Oversized {
                requested: requested_size,
                slot_size: self.slot_size.get(),
            });
        }

        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None if self.high_watermark < self.buffer_layout.size() => {
                // SAFETY: The watermark is below the buffer size and slot-aligned, so the
                // resulting pointer is the start of a slot inside the buffer.
                let slot = unsafe { self.buffer.add(self.high_watermark) };

                // Cannot overflow because the watermark never exceeds the buffer size.
                self.high_watermark = self.high_watermark.wrapping_add(self.slot_size.get());

                slot
            }
            None => {
                return Err(AllocError::Exhausted {
                    capacity: self.capacity.get(),
                });
            }
        };

        #[cfg(debug_assertions)]
        self.mark_issued(slot);

        // Cannot overflow because len is bounded by capacity.
        self.len = self.len.wrapping_add(1);

        Ok(slot)
    }

    /// Returns a slot to the pool, making it the next one to be issued.
    ///
    /// Nothing stored in the slot is dropped. In debug builds, freeing an address that is not
    /// an outstanding slot of this pool panics. Release builds do not check.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `slot` was returned by [`alloc()`](Self::alloc) or
    /// [`try_alloc()`](Self::try_alloc) on this same pool and has not been freed since.
    /// Violating this lets the pool issue the same slot twice.
    pub unsafe fn free(&mut self, slot: NonNull<u8>) {
        #[cfg(debug_assertions)]
        self.mark_released(slot);

        self.free_slots.push(slot);
        self.len = self.len.saturating_sub(1);
    }

    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    fn mark_issued(&mut self, slot: NonNull<u8>) {
        let index = self
            .slot_index(slot)
            .expect("issued slot must lie on a slot boundary inside the pool buffer");

        let occupied = self
            .occupied
            .get_mut(index)
            .expect("slot index is always less than capacity");

        assert!(
            !*occupied,
            "slot {index} issued while still outstanding in pool of capacity {}",
            self.capacity
        );

        *occupied = true;
    }

    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    fn mark_released(&mut self, slot: NonNull<u8>) {
        let Some(index) = self.slot_index(slot) else {
            panic!(
                "attempted to free {slot:?} which is not a slot of this pool (buffer {:?}, {} slots of {} bytes)",
                self.buffer, self.capacity, self.slot_size
            );
        };

        let occupied = self
            .occupied
            .get_mut(index)
            .expect("slot index is always less than capacity");

        assert!(
            *occupied,
            "attempted to free slot {index} which is not outstanding (double free?)"
        );

        *occupied = false;
    }

    /// Takes a slot suitable for a `T`, checking both size and alignment.
    pub(crate) fn reserve_for<T>(&mut self) -> Result<NonNull<T>, AllocError> {
        let size = mem::size_of::<T>();

        if size > self.slot_size.get() {
            return Err(AllocError::Oversized {
                requested: size,
                slot_size: self.slot_size.get(),
            });
        }

        let required = mem::align_of::<T>();

        if required > self.slot_alignment() {
            return Err(AllocError::Misaligned {
                required,
                slot_alignment: self.slot_alignment(),
            });
        }

        Ok(self.try_alloc(size)?.cast::<T>())
    }

    /// Moves `value` into a free slot.
    ///
    /// Returns `None` if `T` does not fit a slot or every slot is outstanding, in which case
    /// `value` is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::RawChunkPool;
    ///
    /// let mut pool = RawChunkPool::new(2, 32);
    ///
    /// let item = pool.insert("hello".to_string()).expect("slot available");
    ///
    /// // SAFETY: The handle has not been removed, so the value is alive.
    /// assert_eq!(unsafe { item.ptr().as_ref() }, "hello");
    ///
    /// pool.remove(item);
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn insert<T>(&mut self, value: T) -> Option<RawPooled<T>> {
        self.try_insert(value).ok()
    }

    /// Moves `value` into a free slot, explaining any failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding. `value` is dropped.
    pub fn try_insert<T>(&mut self, value: T) -> Result<RawPooled<T>, AllocError> {
        self.try_insert_with(|| value)
    }

    /// Constructs a value in a free slot.
    ///
    /// `f` is only called once a slot has been secured, so failure has no side effects.
    #[must_use]
    pub fn insert_with<T>(&mut self, f: impl FnOnce() -> T) -> Option<RawPooled<T>> {
        self.try_insert_with(f).ok()
    }

    /// Constructs a value in a free slot, explaining any failure.
    ///
    /// `f` is only called once a slot has been secured. If `f` panics, the slot is returned
    /// to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] or [`AllocError::Misaligned`] if `T` does not fit a
    /// slot and [`AllocError::Exhausted`] if every slot is outstanding.
    pub fn try_insert_with<T>(
        &mut self,
        f: impl FnOnce() -> T,
    ) -> Result<RawPooled<T>, AllocError> {
        let ptr = self.reserve_for::<T>()?;

        let guard = scopeguard::guard(&mut *self, |pool| {
            // SAFETY: The slot was issued above and nothing else has seen it yet.
            unsafe { pool.free(ptr.cast()) };
        });

        // SAFETY: The slot is large enough and aligned for T, and it is exclusively ours.
        unsafe { ptr.write(f()) };

        let pool = ScopeGuard::into_inner(guard);

        // SAFETY: The slot now holds an initialized T.
        Ok(unsafe { RawPooled::new(pool.pool_id, ptr) })
    }

    /// Drops the value behind a handle and returns its slot to the pool.
    ///
    /// The slot is returned even if the value's destructor panics.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different pool.
    pub fn remove<T: ?Sized>(&mut self, pooled: RawPooled<T>) {
        assert!(
            pooled.pool_id() == self.pool_id,
            "attempted to remove a handle from a different pool (handle pool ID: {}, current pool ID: {})",
            pooled.pool_id(),
            self.pool_id
        );

        let slot = pooled.slot();
        let dropper = pooled.dropper();

        let _release = scopeguard::guard(&mut *self, |pool| {
            // SAFETY: The handle proves the slot was issued by this pool and, since the handle
            // is consumed here, it cannot be freed a second time.
            unsafe { pool.free(slot) };
        });

        // SAFETY: The handle held the only claim on the initialized value and is consumed.
        unsafe { dropper.drop_target() };
    }
}

impl Drop for RawChunkPool {
    fn drop(&mut self) {
        let leaking = !self.is_empty();

        // SAFETY: The buffer was allocated in new_inner() with this same layout.
        unsafe { dealloc(self.buffer.as_ptr(), self.buffer_layout) };

        if matches!(self.drop_policy, DropPolicy::MustNotLeakItems) && !thread::panicking() {
            assert!(
                !leaking,
                "RawChunkPool dropped with {} outstanding slots (drop policy is MustNotLeakItems)",
                self.len
            );
        }
    }
}

impl fmt::Debug for RawChunkPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawChunkPool")
            .field("pool_id", &self.pool_id)
            .field("buffer", &self.buffer)
            .field("capacity", &self.capacity)
            .field("slot_size", &self.slot_size)
            .field("len", &self.len)
            .field("free_slots", &self.free_slots.len())
            .field("high_watermark", &self.high_watermark)
            .field("init_policy", &self.init_policy)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

// SAFETY: RawChunkPool exclusively owns its buffer and the slot addresses it tracks point into
// that buffer, so it can move between threads. Values stored in slots are owned by handles,
// which carry their own Send/Sync rules.
unsafe impl Send for RawChunkPool {}
