use std::sync::OnceLock;

use crate::{ChunkPool, ChunkPoolBuilder};

static GLOBAL_POOL: OnceLock<ChunkPool> = OnceLock::new();

/// Starts the process-wide pool with `capacity` slots of `slot_size` bytes each.
///
/// Returns `true` if this call started the pool. Once started, the pool lives until the process
/// exits. Any later call leaves the existing pool in place, logs a warning and returns `false`,
/// so handles issued by the running pool are never invalidated.
///
/// Prefer passing a [`ChunkPool`] to the code that needs it. The global pool is meant for call
/// sites that cannot be given one.
///
/// # Panics
///
/// Panics if either argument is zero.
///
/// # Example
///
/// ```rust
/// use chunk_pool::{global, start_global};
///
/// assert!(start_global(32, 64));
///
/// let value = global().insert(5_u32).expect("slot available");
/// assert_eq!(*value, 5);
///
/// // Already running; the original configuration stays.
/// assert!(!start_global(8, 8));
/// assert_eq!(global().capacity(), 32);
/// ```
pub fn start_global(capacity: usize, slot_size: usize) -> bool {
    start_global_with(
        ChunkPool::builder()
            .capacity(capacity)
            .slot_size(slot_size),
    )
}

/// Starts the process-wide pool from a configured builder.
///
/// Behaves like [`start_global()`] but allows setting the initialization and drop policies.
/// If the pool is already started, the builder is ignored and nothing is allocated.
///
/// # Panics
///
/// Panics if the pool has not been started yet and the builder is missing the capacity or the
/// slot size.
pub fn start_global_with(builder: ChunkPoolBuilder) -> bool {
    let mut started = false;

    let pool = GLOBAL_POOL.get_or_init(|| {
        started = true;
        builder.build()
    });

    if !started {
        tracing::warn!(
            capacity = pool.capacity(),
            slot_size = pool.slot_size(),
            "global chunk pool already started, ignoring repeated start"
        );
    }

    started
}

/// Returns the process-wide pool.
///
/// # Panics
///
/// Panics if [`start_global()`] has not been called yet.
#[must_use]
pub fn global() -> &'static ChunkPool {
    GLOBAL_POOL
        .get()
        .expect("global chunk pool accessed before start_global() was called")
}

/// Returns the process-wide pool, or `None` if it has not been started yet.
#[must_use]
pub fn try_global() -> Option<&'static ChunkPool> {
    GLOBAL_POOL.get()
}
