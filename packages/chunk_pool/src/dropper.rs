use std::mem;
use std::ptr::{self, NonNull};

/// Remembers how to drop an object while forgetting its type.
///
/// Unlike a guard, a `Dropper` does nothing when it goes out of scope. The owner decides when
/// the target is dropped by calling [`drop_target()`](Self::drop_target), which lets it order
/// the destructor relative to returning the slot to its pool.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Dropper {
    ptr: NonNull<()>,
    drop_fn: fn(NonNull<()>),
}

impl Dropper {
    /// Creates a `Dropper` for the `T` at `target`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the target holds an initialized `T` for as long as the
    /// `Dropper` (or any copy of it) may still be used to drop it.
    pub(crate) unsafe fn new<T>(target: NonNull<T>) -> Self {
        let drop_fn = drop_fn::<T>;

        // Erase the type of the pointer in the function arguments.
        // SAFETY: We are just changing the target of the pointer arg, everything is ABI-equal.
        let drop_fn = unsafe { mem::transmute::<fn(NonNull<T>), fn(NonNull<()>)>(drop_fn) };

        Self {
            ptr: target.cast(),
            drop_fn,
        }
    }

    /// Drops the target in place. The memory itself is not released.
    ///
    /// # Safety
    ///
    /// The target must still be initialized and must not be dropped or accessed by anyone
    /// afterwards. In particular, this must be called at most once across all copies.
    pub(crate) unsafe fn drop_target(self) {
        (self.drop_fn)(self.ptr);
    }
}

fn drop_fn<T>(ptr: NonNull<T>) {
    // SAFETY: Dropper::drop_target() forwards the guarantee that the target is initialized
    // and dropped exactly once.
    unsafe {
        ptr::drop_in_place(ptr.as_ptr());
    }
}
