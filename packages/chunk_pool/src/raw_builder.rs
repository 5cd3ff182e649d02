use std::cell::Cell;
use std::marker::PhantomData;
use std::mem;
use std::num::NonZero;

use crate::{DropPolicy, InitPolicy, RawChunkPool};

/// Builder for creating an instance of [`RawChunkPool`].
///
/// The capacity and the slot size are mandatory. Use either `.slot_size()` to provide a size
/// in bytes or `.slot_size_of::<T>()` to size slots for a specific type. Other settings are
/// optional.
///
/// # Examples
///
/// ```
/// use chunk_pool::{InitPolicy, RawChunkPool};
///
/// let pool = RawChunkPool::builder()
///     .capacity(16)
///     .slot_size(64)
///     .init_policy(InitPolicy::Lazy)
///     .build();
///
/// assert_eq!(pool.capacity(), 16);
/// assert_eq!(pool.slot_size(), 64);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct RawChunkPoolBuilder {
    capacity: Option<NonZero<usize>>,
    slot_size: Option<NonZero<usize>>,
    init_policy: InitPolicy,
    drop_policy: DropPolicy,

    _not_sync: PhantomData<Cell<()>>,
}

impl RawChunkPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            slot_size: None,
            init_policy: InitPolicy::default(),
            drop_policy: DropPolicy::default(),
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of slots in the pool.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn capacity(mut self, capacity: usize) -> Self {
        let capacity = NonZero::new(capacity).expect("chunk pool must have non-zero capacity");
        self.capacity = Some(capacity);
        self
    }

    /// Sets the size of every slot in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `slot_size` is zero.
    pub fn slot_size(mut self, slot_size: usize) -> Self {
        let slot_size = NonZero::new(slot_size).expect("chunk pool must have non-zero slot size");
        self.slot_size = Some(slot_size);
        self
    }

    /// Sizes slots to hold exactly one `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::RawChunkPool;
    ///
    /// let pool = RawChunkPool::builder()
    ///     .capacity(8)
    ///     .slot_size_of::<[u64; 4]>()
    ///     .build();
    ///
    /// assert_eq!(pool.slot_size(), 32);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn slot_size_of<T>(self) -> Self {
        self.slot_size(mem::size_of::<T>())
    }

    /// Sets the [initialization policy][InitPolicy] of the pool.
    pub fn init_policy(mut self, policy: InitPolicy) -> Self {
        self.init_policy = policy;
        self
    }

    /// Sets the [drop policy][DropPolicy] of the pool. This governs how to treat outstanding
    /// slots when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, allocating its backing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the capacity or the slot size has not been set, or if the backing buffer
    /// would be larger than the maximum allocation size.
    #[must_use]
    pub fn build(self) -> RawChunkPool {
        let capacity = self
            .capacity
            .expect("capacity must be set using .capacity() before calling .build()");
        let slot_size = self.slot_size.expect(
            "slot size must be set using .slot_size() or .slot_size_of::<T>() before calling .build()",
        );

        RawChunkPool::new_inner(capacity, slot_size, self.init_policy, self.drop_policy)
    }
}
