//! Basic usage of the chunk pool types.
//!
//! Shows raw slot allocation, typed insertion with automatic cleanup and what happens when the
//! pool runs out of slots.

use chunk_pool::{AllocError, LocalChunkPool, RawChunkPool};

#[derive(Debug)]
struct Counter {
    value: u64,
}

fn main() {
    println!("=== Raw slots ===");

    let mut raw = RawChunkPool::new(4, 64);
    let mut slots = Vec::new();

    while let Some(slot) = raw.alloc(48) {
        println!("issued slot at {slot:p}");
        slots.push(slot);
    }

    println!("pool full: {} of {} slots in use", raw.len(), raw.capacity());
    println!("oversized request: {:?}", raw.try_alloc(65));

    for slot in slots {
        // SAFETY: Every slot was issued by this pool above and is freed exactly once.
        unsafe { raw.free(slot) };
    }

    println!();
    println!("=== Typed values ===");

    let pool = LocalChunkPool::new(2, 64);

    {
        let mut counter = pool
            .insert(Counter { value: 0 })
            .expect("pool starts empty");

        for _ in 0..3 {
            counter.value = counter.value.wrapping_add(1);
        }

        println!("counter: {counter:?}");
        println!("available while counter is alive: {}", pool.available());
    }

    println!("available after counter is dropped: {}", pool.available());

    println!();
    println!("=== Exhaustion ===");

    let first = pool.insert(1_u32).expect("slot available");
    let second = pool.insert(2_u32).expect("slot available");

    match pool.try_insert(3_u32) {
        Ok(_) => println!("unexpected: third value fit into a two-slot pool"),
        Err(AllocError::Exhausted { capacity }) => {
            println!("all {capacity} slots in use, falling back to the heap");
            let fallback = Box::new(3_u32);
            println!("values: {}, {}, {fallback}", *first, *second);
        }
        Err(other) => println!("unexpected error: {other}"),
    }
}
