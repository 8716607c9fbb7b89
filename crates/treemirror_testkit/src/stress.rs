//! Stress harnesses for the capture/drain pipeline.
//!
//! These exercise long scripted runs and concurrent producer/consumer
//! load, including deliberate overflow and resynchronization.

use std::thread;
use std::time::{Duration, Instant};

use treemirror_core::sync_tree;
use treemirror_model::{Value, ROOT};

use crate::fixtures::{sample_project, MutationOp};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Mutations performed on the source tree.
    pub total_ops: usize,
    /// Records the reconciler replayed individually.
    pub applied_ops: usize,
    /// Full resynchronizations the reconciler performed.
    pub resyncs: usize,
    /// Whether the shadow matched the source at quiescence.
    pub converged: bool,
    /// Total duration.
    pub duration: Duration,
    /// Mutations per second.
    pub ops_per_second: f64,
}

impl StressResult {
    /// Creates a new result.
    pub fn new(total: usize, applied: usize, resyncs: usize, converged: bool, duration: Duration) -> Self {
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            applied_ops: applied,
            resyncs,
            converged,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total mutations: {}", self.total_ops);
        println!("Replayed individually: {}", self.applied_ops);
        println!("Resyncs: {}", self.resyncs);
        println!("Converged: {}", self.converged);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of mutations to perform.
    pub operations: usize,
    /// Ring capacity for the channel under test.
    pub capacity: usize,
    /// Source mutations between drains (scripted run only).
    pub drain_interval: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            capacity: 64,
            drain_interval: 8,
        }
    }
}

/// Run a single-threaded scripted stress test.
///
/// Mutations are structural (inserts, removes, moves, property writes)
/// with seeds derived from the step counter, drained in batches. With
/// `drain_interval` larger than `capacity` this deliberately overflows
/// and recovers through resync.
pub fn stress_scripted_replay(config: &StressConfig) -> StressResult {
    let (source, mut reconciler) =
        sync_tree(sample_project(), config.capacity).expect("valid capacity");

    let start = Instant::now();

    for i in 0..config.operations {
        let op = scripted_op(i);
        source
            .edit(|tracked| op.apply_tracked(tracked).map(|_| ()))
            .expect("resolved steps apply cleanly");

        if i % config.drain_interval == config.drain_interval - 1 {
            reconciler.drain().expect("drain succeeds");
        }
    }
    reconciler.drain().expect("drain succeeds");

    let duration = start.elapsed();
    let stats = reconciler.stats();
    let converged = *reconciler.shadow() == source.current();

    StressResult::new(
        config.operations,
        stats.records_applied as usize,
        stats.resyncs as usize,
        converged,
        duration,
    )
}

/// Run a concurrent producer/consumer stress test.
///
/// The producer rewrites a single root property while the consumer
/// drains as fast as it can. Property writes are last-wins, so the
/// shadow converges at quiescence no matter how the drains interleave
/// with overflow.
pub fn stress_concurrent_counter(config: &StressConfig) -> StressResult {
    let (source, mut reconciler) =
        sync_tree(sample_project(), config.capacity).expect("valid capacity");

    let operations = config.operations;
    let producer_handle = source.clone();

    let start = Instant::now();

    let producer = thread::spawn(move || {
        for i in 0..operations {
            producer_handle
                .edit(|tracked| {
                    tracked.set_property(ROOT, "counter", Value::Int(i as i64))?;
                    Ok(())
                })
                .expect("root property write succeeds");
        }
    });

    loop {
        reconciler.drain().expect("drain succeeds");
        if producer.is_finished() && reconciler.pending() == 0 && !reconciler.overflow_pending() {
            break;
        }
        thread::yield_now();
    }
    producer.join().expect("Thread panicked");
    // One more pass in case the producer raced the last check.
    reconciler.drain().expect("drain succeeds");

    let duration = start.elapsed();
    let stats = reconciler.stats();
    let converged = *reconciler.shadow() == source.current();

    StressResult::new(
        operations,
        stats.records_applied as usize,
        stats.resyncs as usize,
        converged,
        duration,
    )
}

/// Run a concurrent structural stress test.
///
/// The producer applies the same scripted mix of inserts, removes,
/// moves and property writes as the scripted harness while the
/// consumer drains concurrently. With a small capacity this interleaves
/// overflow recovery with live captures of non-idempotent mutations,
/// which is where a replay of an already-snapshotted record would show
/// up as divergence.
pub fn stress_concurrent_structural(config: &StressConfig) -> StressResult {
    let (source, mut reconciler) =
        sync_tree(sample_project(), config.capacity).expect("valid capacity");

    let operations = config.operations;
    let producer_handle = source.clone();

    let start = Instant::now();

    let producer = thread::spawn(move || {
        for i in 0..operations {
            let op = scripted_op(i);
            producer_handle
                .edit(|tracked| op.apply_tracked(tracked).map(|_| ()))
                .expect("resolved steps apply cleanly");
        }
    });

    loop {
        reconciler.drain().expect("drain succeeds");
        if producer.is_finished() && reconciler.pending() == 0 && !reconciler.overflow_pending() {
            break;
        }
        thread::yield_now();
    }
    producer.join().expect("Thread panicked");
    // One more pass in case the producer raced the last check.
    reconciler.drain().expect("drain succeeds");

    let duration = start.elapsed();
    let stats = reconciler.stats();
    let converged = *reconciler.shadow() == source.current();

    StressResult::new(
        operations,
        stats.records_applied as usize,
        stats.resyncs as usize,
        converged,
        duration,
    )
}

/// Deterministic structural mutation for step `i`.
fn scripted_op(i: usize) -> MutationOp {
    match i % 6 {
        0 => MutationOp::SetProperty {
            node_seed: i / 6,
            name: "level".into(),
            value: Value::Int(i as i64),
        },
        1 => MutationOp::InsertChild {
            node_seed: i / 3,
            slot_seed: i / 2,
            kind: "clip".into(),
        },
        2 => MutationOp::MoveChild {
            node_seed: i / 6,
            from_seed: i,
            to_seed: i / 4,
        },
        3 => MutationOp::SetProperty {
            node_seed: i / 2,
            name: "gain".into(),
            value: Value::Float((i % 100) as f64 / 100.0),
        },
        4 => MutationOp::RemoveChild {
            node_seed: i / 5,
            slot_seed: i,
        },
        _ => MutationOp::RemoveProperty {
            node_seed: i / 4,
            name_seed: i,
        },
    }
}
