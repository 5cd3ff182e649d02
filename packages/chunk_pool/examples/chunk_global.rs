//! Using the process-wide pool from several threads, with log output.
//!
//! The subscriber is fixed at DEBUG level so the pool construction event and the warning
//! about a repeated start are both visible.

use std::thread;

use chunk_pool::{global, start_global};
use tracing::Level;

const WORKERS: usize = 4;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .init();

    start_global(64, 128);

    // A second start keeps the existing pool and only logs a warning.
    start_global(8, 8);

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            thread::spawn(move || {
                let message = global()
                    .insert(format!("hello from worker {worker}"))
                    .expect("global pool has room for every worker");

                tracing::info!(%worker, message = message.as_str(), "stored message");
                message.len()
            })
        })
        .collect();

    let total: usize = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker completed"))
        .sum();

    tracing::info!(
        total,
        outstanding = global().len(),
        capacity = global().capacity(),
        "all workers finished"
    );
}
