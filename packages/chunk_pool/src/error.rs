use thiserror::Error;

/// Reasons a pool could not supply a slot.
///
/// All variants are ordinary, recoverable conditions. The caller is expected to fall back to
/// another pool, to the heap, or to propagate the failure.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum AllocError {
    /// The request is larger than one slot. Pools never split or combine slots.
    #[error("requested {requested} bytes but slots are only {slot_size} bytes")]
    Oversized {
        /// Number of bytes requested.
        requested: usize,

        /// Size of each slot in the pool.
        slot_size: usize,
    },

    /// Every slot is currently outstanding.
    #[error("all {capacity} slots are in use")]
    Exhausted {
        /// Total number of slots in the pool.
        capacity: usize,
    },

    /// The type being inserted needs a stricter alignment than slot addresses guarantee.
    #[error("type requires {required}-byte alignment but slots are only {slot_alignment}-byte aligned")]
    Misaligned {
        /// Alignment required by the type.
        required: usize,

        /// Alignment every slot address in the pool is guaranteed to have.
        slot_alignment: usize,
    },
}
