pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - continued execution \
    is not safe because we can no longer ensure that we uphold security and privacy guarantees";

/// Alignment of the backing buffer. Matches what the system allocator guarantees for a plain
/// byte allocation on common 64-bit targets.
pub(crate) const BUFFER_ALIGNMENT: usize = 16;
