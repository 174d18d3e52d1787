//! In-memory storage for sampled records.
//!
//! Records are flattened into a stream of [`Word`]s and kept in a
//! [`RingBuffer`] until read or overwritten. Nothing is persisted.

pub mod ring;

pub use ring::{RingBuffer, SENTINEL, Word};
