//! Parameter Bridge
//!
//! Single-producer, single-consumer, latest-value-wins cell used to hand
//! parameter snapshots from the control thread to the render thread.
//!
//! # Algorithm
//!
//! A triple buffer. The producer and consumer each own one slot outright;
//! the third ("back") slot is named by an atomic byte that also carries a
//! FRESH flag:
//!
//! - `publish` writes into its own slot, then swaps it with the back slot
//!   and sets FRESH.
//! - `try_take` does nothing unless FRESH is set; otherwise it swaps its own
//!   slot with the back slot (clearing FRESH) and reads the slot it got.
//!
//! Both sides are a single atomic swap: wait-free, no allocation, and a value
//! is never read while it is being written. Values published faster than
//! they are taken are coalesced; only the newest survives.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const INDEX_MASK: u8 = 0b011;
const FRESH: u8 = 0b100;

struct Slots<T> {
    buffers: [UnsafeCell<T>; 3],
    /// Back slot index | FRESH
    back: AtomicU8,
}

// Each buffer is only ever accessed by whichever side currently owns its
// index, and ownership moves exclusively through the atomic swap.
unsafe impl<T: Send> Sync for Slots<T> {}

/// Unsplit bridge; call [`ParameterBridge::split`] to get both ends
pub struct ParameterBridge<T> {
    slots: Arc<Slots<T>>,
}

impl<T: Copy + Send> ParameterBridge<T> {
    /// Create a bridge whose slots all start as `initial`
    ///
    /// `initial` is never delivered by `try_take`.
    pub fn new(initial: T) -> Self {
        Self {
            slots: Arc::new(Slots {
                buffers: [
                    UnsafeCell::new(initial),
                    UnsafeCell::new(initial),
                    UnsafeCell::new(initial),
                ],
                back: AtomicU8::new(1),
            }),
        }
    }

    pub fn split(self) -> (BridgePublisher<T>, BridgeReceiver<T>) {
        (
            BridgePublisher {
                slots: Arc::clone(&self.slots),
                write_index: 0,
            },
            BridgeReceiver {
                slots: self.slots,
                read_index: 2,
            },
        )
    }
}

/// Control-thread end of a [`ParameterBridge`]
pub struct BridgePublisher<T> {
    slots: Arc<Slots<T>>,
    write_index: u8,
}

impl<T: Copy + Send> BridgePublisher<T> {
    /// Make `value` the newest value, replacing any not yet taken
    ///
    /// # Real-time Safety
    /// Wait-free: one store and one atomic swap.
    pub fn publish(&mut self, value: T) {
        // SAFETY: `write_index` is owned by this publisher until swapped out
        unsafe {
            *self.slots.buffers[self.write_index as usize].get() = value;
        }
        let previous = self
            .slots
            .back
            .swap(self.write_index | FRESH, Ordering::AcqRel);
        self.write_index = previous & INDEX_MASK;
    }
}

/// Render-thread end of a [`ParameterBridge`]
pub struct BridgeReceiver<T> {
    slots: Arc<Slots<T>>,
    read_index: u8,
}

impl<T: Copy + Send> BridgeReceiver<T> {
    /// Newest value published since the last successful take, if any
    ///
    /// # Real-time Safety
    /// Wait-free: one load and at most one atomic swap.
    pub fn try_take(&mut self) -> Option<T> {
        if self.slots.back.load(Ordering::Relaxed) & FRESH == 0 {
            return None;
        }
        let previous = self.slots.back.swap(self.read_index, Ordering::AcqRel);
        self.read_index = previous & INDEX_MASK;
        // SAFETY: the swap handed `read_index` to this receiver exclusively
        Some(unsafe { *self.slots.buffers[self.read_index as usize].get() })
    }

    /// Whether a value is waiting to be taken
    pub fn has_pending(&self) -> bool {
        self.slots.back.load(Ordering::Acquire) & FRESH != 0
    }
}
