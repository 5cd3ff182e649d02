//! Integration tests for the thread-safe `ChunkPool` and its handles.
//!
//! These exercise the pool through its public API only: capacity bounds, slot reuse, typed
//! construction with automatic cleanup and use from multiple threads.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicUsize};
use std::thread;

use chunk_pool::{AllocError, ChunkPool, DropPolicy, InitPolicy, PooledMut, RawChunkPool};

#[derive(Debug)]
struct Counter {
    value: u64,
}

impl Counter {
    fn new(value: u64) -> Self {
        Self { value }
    }

    fn increment(&mut self) {
        self.value = self.value.wrapping_add(1);
    }
}

#[test]
fn fifth_allocation_from_four_slots_fails() {
    let pool = ChunkPool::new(4, 64);

    let slots: Vec<_> = [64, 32, 1, 64]
        .into_iter()
        .map(|size| pool.alloc(size).expect("slot available"))
        .collect();

    let distinct: HashSet<_> = slots.iter().copied().collect();
    assert_eq!(distinct.len(), 4);

    assert_eq!(pool.alloc(1), None);

    let freed = slots.get(2).copied().expect("four slots were taken");
    // SAFETY: Issued by this pool above and not freed yet.
    unsafe { pool.free(freed) };

    assert_eq!(pool.alloc(64), Some(freed));

    for slot in slots {
        // SAFETY: Each slot was issued by this pool and is freed exactly once here.
        unsafe { pool.free(slot) };
    }

    assert!(pool.is_empty());
}

#[test]
fn oversized_request_fails_in_every_state() {
    let pool = ChunkPool::new(2, 16);

    assert_eq!(
        pool.try_alloc(17),
        Err(AllocError::Oversized {
            requested: 17,
            slot_size: 16
        })
    );

    let held = pool.alloc(16).expect("slot available");
    assert_eq!(pool.alloc(17), None);

    // SAFETY: Issued by this pool above.
    unsafe { pool.free(held) };
    assert_eq!(pool.alloc(usize::MAX), None);
    assert!(pool.is_empty());
}

#[test]
fn counter_handle_releases_slot_on_drop() {
    let pool = ChunkPool::new(2, 64);

    {
        let mut counter = pool.insert(Counter::new(0)).expect("slot available");
        counter.increment();
        counter.increment();

        assert_eq!(counter.value, 2);
        assert_eq!(pool.available(), 1);
    }

    assert_eq!(pool.available(), 2);
    assert!(pool.alloc(64).is_some());
}

#[test]
fn moved_handle_releases_only_at_destination() {
    let pool = ChunkPool::new(1, 64);

    let destination: PooledMut<Counter>;
    {
        let source = pool.insert(Counter::new(7)).expect("slot available");
        destination = source;
    }

    // The source scope ended but the slot is still held by the destination.
    assert!(pool.is_full());
    assert_eq!(destination.value, 7);

    drop(destination);
    assert!(pool.is_empty());
}

#[test]
fn shared_handles_across_threads() {
    struct Tracked {
        id: usize,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, atomic::Ordering::SeqCst);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let pool = ChunkPool::new(4, 64);
    let shared = pool
        .insert_shared(Tracked {
            id: 3,
            drops: Arc::clone(&drops),
        })
        .expect("slot available");

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.id)
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().expect("worker completed"), 3);
    }

    assert_eq!(drops.load(atomic::Ordering::SeqCst), 0);
    drop(shared);

    assert_eq!(drops.load(atomic::Ordering::SeqCst), 1);
    assert!(pool.is_empty());
}

#[test]
fn pool_outlives_its_last_clone_while_handles_exist() {
    let handle = {
        let pool = ChunkPool::new(1, 32);
        pool.insert("kept alive".to_string()).expect("slot available")
    };

    // The handle holds its own reference to the pool.
    assert_eq!(*handle, "kept alive");
}

#[test]
fn contended_insert_and_drop_keeps_bookkeeping_consistent() {
    const THREADS: usize = 8;
    const ITERATIONS: u64 = 500;

    let pool = ChunkPool::builder()
        .capacity(4)
        .slot_size_of::<u64>()
        .init_policy(InitPolicy::Lazy)
        .drop_policy(DropPolicy::MustNotLeakItems)
        .build();

    let successes = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            let successes = Arc::clone(&successes);

            thread::spawn(move || {
                for i in 0..ITERATIONS {
                    if let Some(value) = pool.insert(i) {
                        assert_eq!(*value, i);
                        successes.fetch_add(1, atomic::Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker completed");
    }

    assert!(successes.load(atomic::Ordering::Relaxed) > 0);
    assert!(pool.is_empty());
    assert_eq!(pool.available(), 4);
}

#[test]
fn wraps_a_preconfigured_raw_pool() {
    let raw = RawChunkPool::builder()
        .capacity(2)
        .slot_size(8)
        .init_policy(InitPolicy::Lazy)
        .build();

    let pool = ChunkPool::from(raw);
    let a = pool.insert(1_u64).expect("slot available");
    let b = pool.insert(2_u64).expect("slot available");

    assert_ne!(a.ptr().cast::<u8>(), b.ptr().cast::<u8>());
    assert_eq!(
        pool.try_insert(3_u64).err(),
        Some(AllocError::Exhausted { capacity: 2 })
    );
}
