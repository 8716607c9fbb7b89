//! # Treemirror Ring
//!
//! A wait-free single-producer/single-consumer ring buffer for opaque
//! byte records.
//!
//! This crate provides the transport channel between a thread that
//! mutates a source tree and the thread that maintains its shadow
//! replica:
//! - Fixed capacity chosen at construction
//! - Push never blocks and never overwrites unread slots; a push against
//!   a full ring is rejected
//! - Pop consumes exactly one record in FIFO order
//! - Both sides are wait-free: the only shared state is a pair of atomic
//!   cursors
//!
//! ## Usage
//!
//! ```
//! use treemirror_ring::blob_ring;
//! use bytes::Bytes;
//!
//! let (mut producer, mut consumer) = blob_ring(8).unwrap();
//!
//! producer.try_push(Bytes::from_static(b"change")).unwrap();
//! assert_eq!(consumer.pop().as_deref(), Some(&b"change"[..]));
//! assert_eq!(consumer.pop(), None);
//! ```

mod error;
mod ring;

pub use error::{RingError, RingResult};
pub use ring::{blob_ring, RingConsumer, RingProducer};
