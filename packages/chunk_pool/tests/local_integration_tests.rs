//! Integration tests for the single-threaded `LocalChunkPool` and the unmanaged
//! `RawChunkPool`.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use chunk_pool::{InitPolicy, LocalChunkPool, LocalPooledMut, RawChunkPool};

#[test]
fn eager_and_lazy_pools_behave_the_same() {
    for policy in [InitPolicy::Eager, InitPolicy::Lazy] {
        let mut pool = RawChunkPool::builder()
            .capacity(4)
            .slot_size(64)
            .init_policy(policy)
            .build();

        let slots: Vec<_> = (0..4)
            .map(|_| pool.alloc(64).expect("slot available"))
            .collect();

        let distinct: HashSet<_> = slots.iter().copied().collect();
        assert_eq!(distinct.len(), 4, "{policy:?}");
        assert!(pool.alloc(1).is_none(), "{policy:?}");

        for slot in &slots {
            assert!(pool.contains(*slot), "{policy:?}");
        }

        let last = slots.last().copied().expect("four slots were taken");
        // SAFETY: Issued by this pool above and not freed yet.
        unsafe { pool.free(last) };
        assert_eq!(pool.alloc(64), Some(last), "{policy:?}");

        for slot in slots {
            // SAFETY: Each slot was issued by this pool and is freed exactly once here.
            unsafe { pool.free(slot) };
        }
        assert!(pool.is_empty(), "{policy:?}");
    }
}

#[test]
fn freed_slots_come_back_most_recent_first() {
    let mut pool = RawChunkPool::new(3, 16);

    let a = pool.alloc(16).expect("slot available");
    let b = pool.alloc(16).expect("slot available");
    let c = pool.alloc(16).expect("slot available");

    // SAFETY: All three were issued by this pool and each is freed once.
    unsafe {
        pool.free(a);
    }
    // SAFETY: As above.
    unsafe {
        pool.free(c);
    }

    assert_eq!(pool.alloc(8), Some(c));
    assert_eq!(pool.alloc(8), Some(a));

    // SAFETY: All three are outstanding again and each is freed once.
    unsafe {
        pool.free(a);
    }
    // SAFETY: As above.
    unsafe {
        pool.free(b);
    }
    // SAFETY: As above.
    unsafe {
        pool.free(c);
    }
}

#[test]
fn raw_typed_values_are_removed_explicitly() {
    let drops = Rc::new(Cell::new(0_usize));

    let mut pool = RawChunkPool::new(2, 32);

    let first = pool
        .insert(Rc::clone(&drops))
        .expect("slot available")
        .erase();
    let second = pool.insert(Rc::clone(&drops)).expect("slot available");

    assert_eq!(Rc::strong_count(&drops), 3);

    pool.remove(first);
    pool.remove(second);

    assert_eq!(Rc::strong_count(&drops), 1);
    assert!(pool.is_empty());
}

#[test]
fn counter_scenario() {
    struct Counter {
        value: u32,
    }

    let pool = LocalChunkPool::new(4, 64);

    {
        let mut counter = pool.insert_with(|| Counter { value: 0 }).expect("slot available");
        counter.value = counter.value.wrapping_add(1);

        assert_eq!(counter.value, 1);
        assert_eq!(pool.available(), 3);
    }

    assert_eq!(pool.available(), 4);
}

#[test]
fn values_may_hold_handles_into_their_own_pool() {
    struct Tree {
        children: Vec<LocalPooledMut<Tree>>,
        visits: Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    }

    impl Drop for Tree {
        fn drop(&mut self) {
            self.visits.borrow_mut().push(self.name);
        }
    }

    let visits = Rc::new(RefCell::new(Vec::new()));
    let pool = LocalChunkPool::new(3, 64);

    let leaf = |name| {
        pool.insert(Tree {
            children: Vec::new(),
            visits: Rc::clone(&visits),
            name,
        })
        .expect("slot available")
    };

    let left = leaf("left");
    let right = leaf("right");
    let root = pool
        .insert(Tree {
            children: vec![left, right],
            visits: Rc::clone(&visits),
            name: "root",
        })
        .expect("slot available");

    assert!(pool.is_full());
    assert_eq!(root.children.len(), 2);

    drop(root);

    assert!(pool.is_empty());
    assert_eq!(*visits.borrow(), ["root", "left", "right"]);
}

#[test]
fn shared_handles_keep_value_until_last_clone() {
    let pool = LocalChunkPool::new(1, 32);

    let a = pool.insert_shared(vec![1_u8, 2, 3]).expect("slot available");
    let b = a.clone();
    let c = b.clone();

    drop(a);
    drop(b);
    assert_eq!(c.len(), 3);
    assert!(pool.is_full());

    drop(c);
    assert!(pool.is_empty());
}
