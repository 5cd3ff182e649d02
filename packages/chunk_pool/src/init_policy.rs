/// Determines how slots are registered with a pool's free set.
///
/// Both policies behave the same from the caller's perspective: no more than `capacity` slots
/// are ever outstanding at once, every slot address is a multiple of the slot size into the
/// backing buffer, and freed slots are reused most-recently-freed first.
///
/// # Examples
///
/// ```
/// use chunk_pool::{InitPolicy, RawChunkPool};
///
/// let mut pool = RawChunkPool::builder()
///     .capacity(1024)
///     .slot_size(48)
///     .init_policy(InitPolicy::Lazy)
///     .build();
///
/// assert!(pool.alloc(48).is_some());
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum InitPolicy {
    /// Every slot is pushed onto the free set when the pool is built. Construction costs
    /// O(capacity), after which every allocation is a single pop. This is the default.
    #[default]
    Eager,

    /// No slot is registered up front. A cursor over the buffer advances by one slot on each
    /// first-time issuance, and the free set is consulted before the cursor. Construction
    /// is O(1) and untouched parts of the buffer are never written.
    Lazy,
}
