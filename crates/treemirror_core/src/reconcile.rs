//! Consumer-side shadow reconciliation.

use crate::capture::ChangeCapture;
use crate::error::CoreResult;
use crate::stats::ReconcilerStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use treemirror_ring::{blob_ring, RingConsumer};

/// Replays one encoded change record against the shadow.
///
/// The engine treats records as opaque bytes; the applier owns the
/// format. It is called strictly in capture order, once per record.
pub trait ChangeApplier<T>: Send {
    /// Applies a single record to the shadow.
    ///
    /// # Errors
    ///
    /// Any error aborts the current drain and propagates to the caller;
    /// the record is consumed either way.
    fn apply(&self, shadow: &mut T, record: &[u8]) -> CoreResult<()>;
}

impl<T, F> ChangeApplier<T> for F
where
    F: Fn(&mut T, &[u8]) -> CoreResult<()> + Send,
{
    fn apply(&self, shadow: &mut T, record: &[u8]) -> CoreResult<()> {
        self(shadow, record)
    }
}

/// Produces a complete snapshot of the authoritative source state.
///
/// Invoked only during overflow recovery, on the consumer thread, so
/// implementations must synchronise their view of the source (for
/// example by locking the structure the producer mutates under).
pub trait SnapshotSource<T>: Send {
    /// Returns the full authoritative state.
    ///
    /// # Errors
    ///
    /// A failure leaves the shadow unchanged and the overflow pending,
    /// so the next drain retries the resynchronization.
    fn snapshot(&self) -> CoreResult<T>;

    /// Takes a snapshot with the producer excluded.
    ///
    /// `sync` must run exactly once, inside the same critical section
    /// the state is read in, before it is read. The engine uses it to
    /// discard buffered records during overflow recovery: a record
    /// captured before the exclusion begins is discarded by `sync`, and
    /// a record captured after it ends is strictly newer than the
    /// snapshot, so no record is ever replayed on top of a snapshot
    /// that already contains it.
    ///
    /// The default runs `sync` and then [`snapshot`](Self::snapshot),
    /// which is correct only for sources that cannot be mutated while
    /// the recovery runs. A source fed by a live producer must override
    /// this and hold its lock across both steps, as the bundled tree
    /// wiring does.
    ///
    /// # Errors
    ///
    /// Same contract as [`snapshot`](Self::snapshot).
    fn snapshot_with(&self, sync: &mut dyn FnMut()) -> CoreResult<T> {
        sync();
        self.snapshot()
    }
}

impl<T, F> SnapshotSource<T> for F
where
    F: Fn() -> CoreResult<T> + Send,
{
    fn snapshot(&self) -> CoreResult<T> {
        self()
    }
}

/// Creates a shadow channel: the capture half for the mutating thread
/// and the reconciler half for the replica thread.
///
/// `capacity` bounds the number of buffered-but-unconsumed records;
/// size it to the expected burst of mutations between drains. Bursts
/// beyond it are not an error, they just cost a full resync.
///
/// # Errors
///
/// Returns [`CoreError::InvalidCapacity`] if `capacity` is zero.
///
/// [`CoreError::InvalidCapacity`]: crate::CoreError::InvalidCapacity
pub fn shadow_channel<T, A, S>(
    capacity: usize,
    shadow: T,
    applier: A,
    source: S,
) -> CoreResult<(ChangeCapture, ShadowReconciler<T, A, S>)>
where
    A: ChangeApplier<T>,
    S: SnapshotSource<T>,
{
    let (producer, consumer) = blob_ring(capacity)?;
    let overflow = Arc::new(AtomicBool::new(false));

    Ok((
        ChangeCapture::new(producer, Arc::clone(&overflow)),
        ShadowReconciler::from_parts(consumer, overflow, shadow, applier, source),
    ))
}

/// The consumer half of a shadow channel.
///
/// Owns the shadow replica outright: only [`drain`](Self::drain) ever
/// mutates it, so the replica thread can read [`shadow`](Self::shadow)
/// freely between drains, and other threads take value-semantic
/// [`snapshot`](Self::snapshot)s.
pub struct ShadowReconciler<T, A, S>
where
    A: ChangeApplier<T>,
    S: SnapshotSource<T>,
{
    consumer: RingConsumer,
    overflow: Arc<AtomicBool>,
    shadow: T,
    applier: A,
    source: S,
    stats: ReconcilerStats,
}

impl<T, A, S> ShadowReconciler<T, A, S>
where
    A: ChangeApplier<T>,
    S: SnapshotSource<T>,
{
    pub(crate) fn from_parts(
        consumer: RingConsumer,
        overflow: Arc<AtomicBool>,
        shadow: T,
        applier: A,
        source: S,
    ) -> Self {
        Self {
            consumer,
            overflow,
            shadow,
            applier,
            source,
            stats: ReconcilerStats::default(),
        }
    }

    /// Brings the shadow up to date with everything captured so far.
    ///
    /// If an overflow is pending, first discards the stale buffered
    /// records, clears the flag and rebuilds the shadow from a full
    /// snapshot. Then pops one record at a time, replaying each in
    /// strict FIFO order, until the ring reports empty. Records pushed
    /// concurrently after that point wait for the next call, so the
    /// work per call is bounded.
    ///
    /// Returns `Ok(true)` iff a resync or at least one record was
    /// applied.
    ///
    /// # Errors
    ///
    /// Propagates applier and snapshot failures. An apply error leaves
    /// the already-replayed prefix in place; remaining records stay
    /// buffered for the next drain.
    pub fn drain(&mut self) -> CoreResult<bool> {
        let mut changed = false;

        if self.overflow.load(Ordering::Acquire) {
            self.resync()?;
            changed = true;
        }

        let mut applied = 0u64;
        while let Some(record) = self.consumer.pop() {
            if let Err(e) = self.applier.apply(&mut self.shadow, &record) {
                self.stats.records_applied += applied;
                return Err(e);
            }
            applied += 1;
        }

        self.stats.records_applied += applied;
        self.stats.drains += 1;
        trace!(applied, resynced = changed, "drained shadow channel");

        Ok(changed || applied > 0)
    }

    /// Forces a full resynchronization from the snapshot source.
    ///
    /// Discards every buffered record, clears the overflow flag and
    /// overwrites the shadow wholesale. The discard and the flag reset
    /// run inside the snapshot source's critical section (see
    /// [`SnapshotSource::snapshot_with`]), so a record captured while
    /// the recovery is in flight is either discarded with the rest or
    /// strictly newer than the snapshot it will later be replayed onto.
    ///
    /// `drain` calls this when it observes the flag; it is public for
    /// callers that want to rebuild the shadow regardless (for example
    /// after attaching to an already-populated source).
    ///
    /// # Errors
    ///
    /// If the snapshot source fails, the overflow flag is left set so
    /// the next drain retries.
    pub fn resync(&mut self) -> CoreResult<()> {
        let consumer = &mut self.consumer;
        let overflow = &self.overflow;
        let mut discarded = 0;

        let result = self.source.snapshot_with(&mut || {
            discarded = consumer.clear();
            // An overflow signalled after this point belongs to a
            // record the snapshot cannot contain, so it must survive
            // into the next drain rather than be swallowed here.
            overflow.store(false, Ordering::Release);
        });
        self.stats.records_discarded += discarded as u64;

        match result {
            Ok(snapshot) => self.shadow = snapshot,
            Err(e) => {
                // Restore the flag so the next drain retries.
                self.overflow.store(true, Ordering::Release);
                return Err(e);
            }
        }

        debug!(
            discarded,
            "rebuilt shadow from full snapshot after overflow"
        );
        self.stats.resyncs += 1;
        Ok(())
    }

    /// Returns the current shadow, readable freely on this thread.
    pub fn shadow(&self) -> &T {
        &self.shadow
    }

    /// Returns a value-semantics snapshot of the shadow.
    ///
    /// The clone is consistent as long as the caller does not run
    /// `drain` concurrently, which the single-consumer contract already
    /// forbids.
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.shadow.clone()
    }

    /// Returns true if an overflow is pending recovery.
    pub fn overflow_pending(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    /// Returns the number of records currently buffered.
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }

    /// Returns the reconciliation counters.
    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }
}

impl<T, A, S> std::fmt::Debug for ShadowReconciler<T, A, S>
where
    A: ChangeApplier<T>,
    S: SnapshotSource<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowReconciler")
            .field("pending", &self.pending())
            .field("overflow_pending", &self.overflow_pending())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use parking_lot::Mutex;

    /// Shadow type for tests: an append-only log of applied payloads.
    type Log = Vec<Vec<u8>>;

    fn log_applier() -> impl ChangeApplier<Log> {
        |shadow: &mut Log, record: &[u8]| {
            shadow.push(record.to_vec());
            Ok(())
        }
    }

    fn channel_with_source(
        capacity: usize,
        source_log: Arc<Mutex<Log>>,
    ) -> (ChangeCapture, ShadowReconciler<Log, impl ChangeApplier<Log>, impl SnapshotSource<Log>>)
    {
        shadow_channel(capacity, Log::new(), log_applier(), move || {
            Ok(source_log.lock().clone())
        })
        .unwrap()
    }

    #[test]
    fn zero_capacity_fails_construction() {
        let result = shadow_channel(0, Log::new(), log_applier(), || Ok(Log::new()));
        assert!(matches!(result, Err(CoreError::InvalidCapacity)));
    }

    #[test]
    fn drain_applies_in_fifo_order() {
        let source = Arc::new(Mutex::new(Log::new()));
        let (mut capture, mut reconciler) = channel_with_source(8, source);

        capture.capture(b"a");
        capture.capture(b"b");
        capture.capture(b"c");

        assert!(reconciler.drain().unwrap());
        assert_eq!(
            reconciler.shadow(),
            &vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(reconciler.stats().records_applied, 3);
    }

    #[test]
    fn drain_is_idempotent_when_quiet() {
        let source = Arc::new(Mutex::new(Log::new()));
        let (mut capture, mut reconciler) = channel_with_source(8, source);

        capture.capture(b"a");
        assert!(reconciler.drain().unwrap());

        let before = reconciler.snapshot();
        assert!(!reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &before);
    }

    #[test]
    fn overflow_triggers_resync_and_discards_stale_records() {
        let source = Arc::new(Mutex::new(Log::new()));
        let (mut capture, mut reconciler) = channel_with_source(2, Arc::clone(&source));

        // Fill the ring, then overflow.
        capture.capture(b"one");
        capture.capture(b"two");
        capture.capture(b"lost");
        assert!(capture.overflowed());

        // The authoritative source knows the true final state.
        *source.lock() = vec![b"authoritative".to_vec()];

        assert!(reconciler.drain().unwrap());
        assert!(!reconciler.overflow_pending());
        // Stale buffered records were discarded, not replayed on top.
        assert_eq!(reconciler.shadow(), &vec![b"authoritative".to_vec()]);
        assert_eq!(reconciler.stats().resyncs, 1);
        assert_eq!(reconciler.stats().records_discarded, 2);
    }

    #[test]
    fn records_after_recovery_flow_normally() {
        let source = Arc::new(Mutex::new(Log::new()));
        let (mut capture, mut reconciler) = channel_with_source(1, Arc::clone(&source));

        capture.capture(b"kept");
        capture.capture(b"dropped");
        reconciler.drain().unwrap();

        capture.capture(b"next");
        assert!(reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow().last().unwrap(), b"next");
        assert!(!capture.overflowed());
    }

    #[test]
    fn failed_snapshot_leaves_overflow_pending() {
        let attempts = Arc::new(Mutex::new(0u32));
        let source_attempts = Arc::clone(&attempts);

        let (mut capture, mut reconciler) =
            shadow_channel(1, Log::new(), log_applier(), move || {
                let mut n = source_attempts.lock();
                *n += 1;
                if *n == 1 {
                    Err(CoreError::snapshot("source unavailable"))
                } else {
                    Ok(vec![b"recovered".to_vec()])
                }
            })
            .unwrap();

        capture.capture(b"a");
        capture.capture(b"b");
        assert!(capture.overflowed());

        // First drain fails in the snapshot and keeps the flag set.
        assert!(reconciler.drain().is_err());
        assert!(reconciler.overflow_pending());

        // Second drain retries the resync and succeeds.
        assert!(reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &vec![b"recovered".to_vec()]);
        assert_eq!(*attempts.lock(), 2);
    }

    #[test]
    fn apply_error_keeps_remaining_records() {
        let source = Arc::new(Mutex::new(Log::new()));
        let poison = b"poison".to_vec();

        let applier = {
            let poison = poison.clone();
            move |shadow: &mut Log, record: &[u8]| {
                if record == poison.as_slice() {
                    return Err(CoreError::apply("bad record"));
                }
                shadow.push(record.to_vec());
                Ok(())
            }
        };

        let source_clone = Arc::clone(&source);
        let (mut capture, mut reconciler) =
            shadow_channel(8, Log::new(), applier, move || Ok(source_clone.lock().clone()))
                .unwrap();

        capture.capture(b"ok");
        capture.capture(&poison);
        capture.capture(b"after");

        assert!(reconciler.drain().is_err());
        // The prefix before the failure was applied, the poison record
        // was consumed, the suffix is still buffered.
        assert_eq!(reconciler.shadow(), &vec![b"ok".to_vec()]);
        assert_eq!(reconciler.pending(), 1);

        assert!(reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &vec![b"ok".to_vec(), b"after".to_vec()]);
    }

    /// Source whose snapshot is raced by one last producer edit: the
    /// edit commits to the shared state and captures its record just
    /// before the source lock is taken.
    struct RacingSource {
        state: Arc<Mutex<Log>>,
        capture: Arc<Mutex<Option<ChangeCapture>>>,
    }

    impl RacingSource {
        fn racing_edit(&self) {
            let mut state = self.state.lock();
            state.push(b"late".to_vec());
            if let Some(capture) = self.capture.lock().as_mut() {
                capture.capture(b"late");
            }
        }
    }

    impl SnapshotSource<Log> for RacingSource {
        fn snapshot(&self) -> CoreResult<Log> {
            self.racing_edit();
            Ok(self.state.lock().clone())
        }

        fn snapshot_with(&self, sync: &mut dyn FnMut()) -> CoreResult<Log> {
            self.racing_edit();
            let guard = self.state.lock();
            sync();
            Ok(guard.clone())
        }
    }

    #[test]
    fn edit_racing_the_resync_is_not_applied_twice() {
        let state = Arc::new(Mutex::new(Log::new()));
        let capture_cell = Arc::new(Mutex::new(None));

        let source = RacingSource {
            state: Arc::clone(&state),
            capture: Arc::clone(&capture_cell),
        };
        let (mut capture, mut reconciler) =
            shadow_channel(1, Log::new(), log_applier(), source).unwrap();

        state.lock().push(b"a".to_vec());
        capture.capture(b"a");
        state.lock().push(b"b".to_vec());
        capture.capture(b"b");
        assert!(capture.overflowed());
        *capture_cell.lock() = Some(capture);

        // The recovery must see the racing edit exactly once: in the
        // snapshot, never again from the ring.
        assert!(reconciler.drain().unwrap());

        let expected = state.lock().clone();
        assert_eq!(reconciler.shadow(), &expected);
        assert_eq!(reconciler.pending(), 0);
        assert!(!reconciler.drain().unwrap());
        assert_eq!(reconciler.shadow(), &expected);
    }

    #[test]
    fn explicit_resync_rebuilds_from_source() {
        let source = Arc::new(Mutex::new(vec![b"state".to_vec()]));
        let (_capture, mut reconciler) = channel_with_source(4, Arc::clone(&source));

        assert!(reconciler.shadow().is_empty());
        reconciler.resync().unwrap();
        assert_eq!(reconciler.shadow(), &vec![b"state".to_vec()]);
    }
}
