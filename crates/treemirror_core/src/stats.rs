//! Counters for capture and reconciliation activity.

/// Statistics for the producer side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Records successfully enqueued.
    pub captured: u64,
    /// Records dropped because the ring was full.
    pub dropped: u64,
}

impl CaptureStats {
    /// Total capture attempts, enqueued or dropped.
    pub fn attempts(&self) -> u64 {
        self.captured + self.dropped
    }
}

/// Statistics for the consumer side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Completed `drain` calls.
    pub drains: u64,
    /// Records replayed onto the shadow.
    pub records_applied: u64,
    /// Full resynchronizations performed.
    pub resyncs: u64,
    /// Buffered records discarded during overflow recovery.
    pub records_discarded: u64,
}
