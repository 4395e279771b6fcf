//! # Frame Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Producer threads:  WRITE button / touch / pose samples at any time
//! Frame thread:      READ "this frame" and "last frame" for the same device
//!
//! One shared value:  producers overwrite what the frame is comparing against
//! One global lock:   every query waits on every producer
//! ```
//!
//! ## The Solution: Triple Buffering
//!
//! ```text
//! Frame N:
//!   Producers write to slot A        (front)
//!   Queries read slot B and slot C   (current, previous)
//!
//! Frame N+1:
//!   ROTATE (one atomic index store)
//!   Producers write to slot C, seeded from A
//!   Queries read slot A and slot B
//! ```

mod triple_buffer;

pub use triple_buffer::{SlotReadHandle, SlotWriteHandle, TripleBuffer};
