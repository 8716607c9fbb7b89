//! Producer-side change capture.

use crate::stats::CaptureStats;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use treemirror_ring::RingProducer;

/// The producer half of a shadow channel.
///
/// `capture` is the mutation-observation hook: call it with the encoded
/// form of every source-tree mutation, on the one thread that performs
/// those mutations. It is wait-free and never blocks, so it is safe to
/// call from latency-sensitive code.
///
/// When the ring has no free slot the record is dropped and the shared
/// overflow flag is set; the reconciler recovers by rebuilding the
/// shadow from a full snapshot. Dropped records are never retried
/// individually, because replaying an incomplete record stream out of
/// order is unsafe.
pub struct ChangeCapture {
    producer: RingProducer,
    overflow: Arc<AtomicBool>,
    stats: CaptureStats,
}

impl ChangeCapture {
    pub(crate) fn new(producer: RingProducer, overflow: Arc<AtomicBool>) -> Self {
        Self {
            producer,
            overflow,
            stats: CaptureStats::default(),
        }
    }

    /// Captures one encoded change record.
    ///
    /// Exactly one slot write happens, or none: if the ring is full the
    /// record is dropped, the overflow flag is set, and the call returns
    /// immediately. The bytes are copied into the ring, so the caller's
    /// buffer may be reused as soon as this returns.
    pub fn capture(&mut self, record: &[u8]) {
        // Check before copying: the overflow path must not allocate.
        if self.producer.is_full() {
            self.overflow.store(true, Ordering::Release);
            self.stats.dropped += 1;
            return;
        }

        // Only this side pushes, so the slot observed free above is
        // still free here.
        match self.producer.try_push(Bytes::copy_from_slice(record)) {
            Ok(()) => self.stats.captured += 1,
            Err(_) => {
                self.overflow.store(true, Ordering::Release);
                self.stats.dropped += 1;
            }
        }
    }

    /// Consumes the capture into a boxed hook for subscribing to a
    /// mutation event source.
    pub fn into_hook(mut self) -> Box<dyn FnMut(&[u8]) + Send> {
        Box::new(move |record| self.capture(record))
    }

    /// Returns true if an overflow has been signalled and not yet
    /// recovered.
    pub fn overflowed(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    /// Returns the capture counters.
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Returns the fixed capacity of the underlying ring.
    pub fn capacity(&self) -> usize {
        self.producer.capacity()
    }
}

impl std::fmt::Debug for ChangeCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeCapture")
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}
