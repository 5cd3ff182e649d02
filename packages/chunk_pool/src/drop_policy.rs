/// Determines what happens when a [`RawChunkPool`][crate::RawChunkPool] is dropped while some
/// of its slots are still outstanding.
///
/// The pool never runs destructors of values that still occupy slots when it is dropped. The
/// backing memory is released and those values are leaked. By default this is permitted.
///
/// Managed pools ([`LocalChunkPool`][crate::LocalChunkPool] and
/// [`ChunkPool`][crate::ChunkPool]) are kept alive by their handles, so outstanding managed
/// handles can never observe a dropped pool. The policy only matters for slots obtained via
/// `alloc()` or [`RawPooled`][crate::RawPooled] handles that were never returned.
///
/// # Examples
///
/// ```
/// use chunk_pool::{DropPolicy, RawChunkPool};
///
/// let pool = RawChunkPool::builder()
///     .capacity(8)
///     .slot_size(32)
///     .drop_policy(DropPolicy::MustNotLeakItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Outstanding slots are abandoned when the pool is dropped. This is the default.
    #[default]
    MayLeakItems,

    /// The pool will panic if it still has outstanding slots when it is dropped.
    ///
    /// Useful to catch handles or raw slot addresses that outlive their pool, which would
    /// otherwise dangle silently.
    MustNotLeakItems,
}
