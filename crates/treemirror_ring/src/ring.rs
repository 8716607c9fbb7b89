//! The wait-free SPSC blob ring.

use crate::error::{RingError, RingResult};
use bytes::Bytes;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared state between the producer and consumer halves.
///
/// The cursors are free-running counters; a slot index is the cursor
/// taken modulo capacity. The ring is empty when `head == tail` and full
/// when `tail - head == capacity`, so no slot is sacrificed to
/// disambiguate the two.
struct Shared {
    slots: Box<[UnsafeCell<Option<Bytes>>]>,
    /// Read cursor. Written only by the consumer.
    head: AtomicUsize,
    /// Write cursor. Written only by the producer.
    tail: AtomicUsize,
}

// Safety: a slot is accessed mutably by exactly one side at a time. The
// producer only touches slots in `[tail, head + capacity)` and publishes
// them with a release store of `tail`; the consumer only touches slots in
// `[head, tail)` after an acquire load of `tail`, and releases them back
// with a release store of `head`. `Bytes` itself is `Send + Sync`.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

/// Creates a ring with the given capacity, returning the producer and
/// consumer halves.
///
/// Each half is `Send` but not clonable: the ring supports exactly one
/// producer and one consumer, and the type system enforces it.
///
/// # Errors
///
/// Returns [`RingError::InvalidCapacity`] if `capacity` is zero.
pub fn blob_ring(capacity: usize) -> RingResult<(RingProducer, RingConsumer)> {
    if capacity == 0 {
        return Err(RingError::InvalidCapacity);
    }

    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(None))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        slots,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    Ok((
        RingProducer {
            shared: Arc::clone(&shared),
        },
        RingConsumer { shared },
    ))
}

/// The write half of a blob ring.
pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    /// Attempts to enqueue one record.
    ///
    /// Wait-free: performs one acquire load, one slot write and one
    /// release store. Never overwrites an unread slot.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::Full`] (and drops the record) if no slot is
    /// free.
    pub fn try_push(&mut self, record: Bytes) -> RingResult<()> {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) == self.shared.slots.len() {
            return Err(RingError::Full);
        }

        let slot = &self.shared.slots[tail % self.shared.slots.len()];
        // Safety: `tail - head < capacity`, so this slot has been
        // released by the consumer and is not visible to it until the
        // release store below.
        unsafe {
            *slot.get() = Some(record);
        }

        self.shared
            .tail
            .store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Returns true if the next push would be rejected.
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Returns the number of slots currently free.
    ///
    /// From the producer's side this is a lower bound: the consumer can
    /// only free more slots concurrently, never take them away.
    pub fn free_slots(&self) -> usize {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);
        self.shared.slots.len() - tail.wrapping_sub(head)
    }

    /// Returns the fixed capacity of the ring.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}

impl std::fmt::Debug for RingProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingProducer")
            .field("capacity", &self.capacity())
            .field("free_slots", &self.free_slots())
            .finish()
    }
}

/// The read half of a blob ring.
pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    /// Dequeues the oldest record, or `None` if the ring is empty.
    ///
    /// Strictly one record per call; records come out in the exact order
    /// they were pushed.
    pub fn pop(&mut self) -> Option<Bytes> {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let slot = &self.shared.slots[head % self.shared.slots.len()];
        // Safety: `head < tail`, so the producer published this slot
        // with the release store observed by the acquire load above, and
        // will not touch it again until `head` moves past it.
        let record = unsafe { (*slot.get()).take() };

        self.shared
            .head
            .store(head.wrapping_add(1), Ordering::Release);

        debug_assert!(record.is_some(), "published slot must hold a record");
        record
    }

    /// Discards every record currently in the ring.
    ///
    /// Returns the number of records dropped. Records pushed
    /// concurrently after the internal emptiness check survive for the
    /// next pop.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Returns the number of records ready to pop.
    ///
    /// From the consumer's side this is a lower bound: the producer can
    /// only add records concurrently, never retract them.
    pub fn len(&self) -> usize {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    /// Returns true if no record is ready.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity of the ring.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}

impl std::fmt::Debug for RingConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingConsumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
