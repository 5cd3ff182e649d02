use crate::{ChunkPool, DropPolicy, InitPolicy, RawChunkPoolBuilder};

/// Builder for creating an instance of [`ChunkPool`].
///
/// Accepts the same settings as [`RawChunkPoolBuilder`] and wraps the result for thread-safe
/// shared use.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkPool, InitPolicy};
///
/// let pool = ChunkPool::builder()
///     .capacity(1024)
///     .slot_size(256)
///     .init_policy(InitPolicy::Lazy)
///     .build();
///
/// assert_eq!(pool.available(), 1024);
/// ```
#[derive(Debug)]
#[must_use]
pub struct ChunkPoolBuilder {
    raw: RawChunkPoolBuilder,
}

impl ChunkPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            raw: RawChunkPoolBuilder::new(),
        }
    }

    /// Sets the number of slots in the pool.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn capacity(self, capacity: usize) -> Self {
        Self {
            raw: self.raw.capacity(capacity),
        }
    }

    /// Sets the size of every slot in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `slot_size` is zero.
    pub fn slot_size(self, slot_size: usize) -> Self {
        Self {
            raw: self.raw.slot_size(slot_size),
        }
    }

    /// Sizes slots to hold exactly one `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn slot_size_of<T>(self) -> Self {
        Self {
            raw: self.raw.slot_size_of::<T>(),
        }
    }

    /// Sets the [initialization policy][InitPolicy] of the pool.
    pub fn init_policy(self, policy: InitPolicy) -> Self {
        Self {
            raw: self.raw.init_policy(policy),
        }
    }

    /// Sets the [drop policy][DropPolicy] of the pool.
    pub fn drop_policy(self, policy: DropPolicy) -> Self {
        Self {
            raw: self.raw.drop_policy(policy),
        }
    }

    /// Builds a thread-safe pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the capacity or the slot size has not been set.
    #[must_use]
    pub fn build(self) -> ChunkPool {
        ChunkPool::from(self.raw.build())
    }
}
