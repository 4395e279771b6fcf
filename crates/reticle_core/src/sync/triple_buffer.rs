//! # Triple Buffer
//!
//! Three value slots rotated by an atomic index.
//!
//! ```text
//!            ┌──────────────────────────────────────┐
//!            │             TripleBuffer             │
//!            │                                      │
//!            │  ┌────────┐ ┌─────────┐ ┌──────────┐ │
//!            │  │ front  │ │ current │ │ previous │ │
//!            │  └───┬────┘ └────┬────┘ └────┬─────┘ │
//!            │      └─── Atomic front index ┘       │
//!            └──────────────────────────────────────┘
//!                  │             │            │
//!                  ▼             ▼            ▼
//!           SlotWriteHandle  SlotReadHandle  SlotReadHandle
//!           (producers)      (queries)       (queries)
//! ```
//!
//! ## Thread Safety
//!
//! - Writers only ever lock the front slot, readers only the other two, so a
//!   reader never waits on a producer.
//! - `advance` must not run concurrently with reads or writes. This is a
//!   documented precondition: holding a lock across the whole frame would
//!   serialize input polling against every query.
//! - The front index is published with a single atomic store, so a read that
//!   starts after `advance` returns sees the complete rotation.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const SLOT_COUNT: usize = 3;

/// Three slots of `T`: one writable front and two read-only frames.
///
/// ## Usage
///
/// ```rust,ignore
/// let buffer = TripleBuffer::new(State::default());
///
/// // Producer threads
/// buffer.write().value = 5;
///
/// // Frame thread, once per frame, with no queries in flight
/// buffer.advance();
///
/// assert_eq!(buffer.current().value, 5);
/// ```
pub struct TripleBuffer<T> {
    slots: [RwLock<T>; SLOT_COUNT],
    /// Index of the writable slot. Current is `front + 1`, previous is `front + 2`.
    front: AtomicUsize,
    frame_count: AtomicU64,
}

impl<T: Clone> TripleBuffer<T> {
    /// Creates a buffer with every slot set to `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slots: [
                RwLock::new(initial.clone()),
                RwLock::new(initial.clone()),
                RwLock::new(initial),
            ],
            front: AtomicUsize::new(0),
            frame_count: AtomicU64::new(0),
        }
    }

    /// Number of completed `advance` calls.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    #[inline]
    fn front_index(&self) -> usize {
        self.front.load(Ordering::Acquire)
    }

    /// Write access to the front slot.
    #[must_use]
    pub fn write(&self) -> SlotWriteHandle<'_, T> {
        let index = self.front_index();
        SlotWriteHandle {
            guard: self.slots[index].write(),
            slot_index: index,
        }
    }

    /// Read access to the most recently published slot.
    #[must_use]
    pub fn current(&self) -> SlotReadHandle<'_, T> {
        let index = (self.front_index() + 1) % SLOT_COUNT;
        SlotReadHandle {
            guard: self.slots[index].read(),
            slot_index: index,
        }
    }

    /// Read access to the slot published one frame before `current`.
    #[must_use]
    pub fn previous(&self) -> SlotReadHandle<'_, T> {
        let index = (self.front_index() + 2) % SLOT_COUNT;
        SlotReadHandle {
            guard: self.slots[index].read(),
            slot_index: index,
        }
    }

    /// Publishes the front slot with no extra bookkeeping.
    pub fn advance(&self) {
        self.advance_with(|_, _| {}, |_| {});
    }

    /// Rotates the slots.
    ///
    /// 1. `publish(front, current)` runs on the slot about to become current,
    ///    with the outgoing current for reference.
    /// 2. The outgoing previous slot is overwritten with a copy of the
    ///    published slot and handed to `seed`; it becomes the new front.
    /// 3. The front index is stored: front → current, current → previous.
    ///
    /// Must not be called concurrently with `write`, `current` or `previous`.
    pub fn advance_with<P, S>(&self, publish: P, seed: S)
    where
        P: FnOnce(&mut T, &T),
        S: FnOnce(&mut T),
    {
        let front = self.front_index();
        let current = (front + 1) % SLOT_COUNT;
        let previous = (front + 2) % SLOT_COUNT;

        {
            let mut publishing = self.slots[front].write();
            let outgoing_current = self.slots[current].read();
            publish(&mut publishing, &outgoing_current);

            let mut next_front = self.slots[previous].write();
            next_front.clone_from(&publishing);
            seed(&mut next_front);
        }

        self.front.store(previous, Ordering::Release);
        self.frame_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Overwrites every slot with `value` and resets the frame counter.
    pub fn reset(&self, value: &T) {
        for slot in &self.slots {
            slot.write().clone_from(value);
        }
        self.frame_count.store(0, Ordering::Relaxed);
    }
}

impl<T: Clone + Default> Default for TripleBuffer<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Exclusive access to the front slot.
pub struct SlotWriteHandle<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    slot_index: usize,
}

impl<T> SlotWriteHandle<'_, T> {
    /// Returns the slot index this handle writes to (for debugging).
    #[inline]
    #[must_use]
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }
}

impl<T> Deref for SlotWriteHandle<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SlotWriteHandle<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Shared access to a published slot.
pub struct SlotReadHandle<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    slot_index: usize,
}

impl<T> SlotReadHandle<'_, T> {
    /// Returns the slot index this handle reads from (for debugging).
    #[inline]
    #[must_use]
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }
}

impl<T> Deref for SlotReadHandle<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}
