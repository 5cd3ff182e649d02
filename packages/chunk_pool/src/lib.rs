//! A fixed-capacity pool of equal-size memory slots, with owning handles that return their
//! slot to the pool when dropped.
//!
//! The pool preallocates one contiguous buffer of `capacity × slot_size` bytes and hands out
//! slots from it in O(1). There is no fragmentation search, no splitting or coalescing and no
//! fallback to the general-purpose heap: when every slot is in use, allocation fails and the
//! caller decides what to do next.
//!
//! # Pool types
//!
//! - [`RawChunkPool`] owns the buffer and exposes the slot algorithm directly. It requires
//!   `&mut self` for every mutation and leaves cleanup of typed values to the caller.
//! - [`LocalChunkPool`] is a cloneable single-threaded handle to a shared raw pool. Values
//!   inserted into it are cleaned up automatically when their handles are dropped.
//! - [`ChunkPool`] is the thread-safe counterpart of [`LocalChunkPool`], guarding the raw pool
//!   with a mutex. The process-wide pool behind [`global()`] is of this type.
//!
//! # Handle types
//!
//! - [`LocalPooledMut<T>`] and [`PooledMut<T>`] give exclusive access to a value through
//!   [`Deref`](std::ops::Deref) and [`DerefMut`](std::ops::DerefMut). Dropping the handle
//!   drops the value and frees its slot.
//! - [`LocalPooled<T>`] and [`Pooled<T>`] are reference-counted shared handles. The value is
//!   dropped and the slot freed when the last clone goes away.
//! - [`RawPooled<T>`] is the unmanaged handle returned by [`RawChunkPool`], to be passed back to
//!   [`RawChunkPool::remove()`].
//!
//! # Initialization policies
//!
//! Slots can be registered all at once when the pool is built ([`InitPolicy::Eager`]) or issued
//! on first use from a bump cursor ([`InitPolicy::Lazy`]). Both behave identically from the
//! caller's point of view: at most `capacity` slots are ever outstanding and freed slots are
//! reused most-recently-freed first.
//!
//! # Example
//!
//! ```rust
//! use chunk_pool::LocalChunkPool;
//!
//! let pool = LocalChunkPool::new(4, 64);
//!
//! let mut counter = pool.insert(0_u64).expect("pool has free slots");
//! *counter += 1;
//! assert_eq!(*counter, 1);
//! assert_eq!(pool.available(), 3);
//!
//! // Dropping the handle returns the slot to the pool.
//! drop(counter);
//! assert_eq!(pool.available(), 4);
//! ```
//!
//! Raw slot allocation:
//!
//! ```rust
//! use chunk_pool::RawChunkPool;
//!
//! let mut pool = RawChunkPool::new(2, 32);
//!
//! let a = pool.alloc(32).expect("first slot");
//! let b = pool.alloc(16).expect("second slot");
//! assert_ne!(a, b);
//!
//! // Larger than a slot, never served.
//! assert!(pool.alloc(33).is_none());
//!
//! // Exhausted.
//! assert!(pool.alloc(1).is_none());
//!
//! // SAFETY: `a` was issued by this pool and has not been freed yet.
//! unsafe { pool.free(a) };
//!
//! // The most recently freed slot is issued next.
//! assert_eq!(pool.alloc(8), Some(a));
//! # // SAFETY: Both slots were issued by this pool and have not been freed yet.
//! # unsafe { pool.free(a); pool.free(b) };
//! ```

mod builder;
mod constants;
mod drop_policy;
mod dropper;
mod error;
mod global;
mod init_policy;
mod local_builder;
mod local_pool;
mod local_pooled;
mod local_pooled_mut;
mod pool;
mod pooled;
mod pooled_mut;
mod raw;
mod raw_builder;
mod raw_pooled;

pub use builder::*;
pub use drop_policy::*;
pub(crate) use dropper::*;
pub use error::*;
pub use global::*;
pub use init_policy::*;
pub use local_builder::*;
pub use local_pool::*;
pub use local_pooled::*;
pub use local_pooled_mut::*;
pub use pool::*;
pub use pooled::*;
pub use pooled_mut::*;
pub use raw::*;
pub use raw_builder::*;
pub use raw_pooled::*;
