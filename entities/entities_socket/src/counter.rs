//! Live Socket Counter
//!
//! A shared count of socket objects that currently hold an open handle.
//! The count can only move through a [`LiveSlot`]: acquiring one increments
//! it and dropping the slot decrements it, so the count always equals the
//! number of slots outstanding. It is never reset and is used for accounting
//! and diagnostics only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared live-socket counter
///
/// Cloning a `SocketCounter` yields another handle to the same count. Only
/// [`acquire`](Self::acquire) changes the count, and the returned slot is what
/// a socket keeps until its handle is closed.
#[derive(Debug, Clone, Default)]
pub struct SocketCounter {
    live: Arc<AtomicUsize>,
}

impl SocketCounter {
    /// Create a new counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide counter, created on first use
    pub fn global() -> &'static SocketCounter {
        static GLOBAL: OnceLock<SocketCounter> = OnceLock::new();
        GLOBAL.get_or_init(SocketCounter::new)
    }

    /// Number of sockets currently holding an open handle
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Reserve a slot for a newly opened handle
    ///
    /// The count stays incremented for as long as the returned [`LiveSlot`]
    /// lives; dropping or releasing the slot is the only way to decrement it.
    pub fn acquire(&self) -> LiveSlot {
        self.live.fetch_add(1, Ordering::AcqRel);
        LiveSlot {
            live: Some(Arc::clone(&self.live)),
        }
    }

    /// Returns `true` if both values refer to the same underlying count
    pub fn same_as(&self, other: &SocketCounter) -> bool {
        Arc::ptr_eq(&self.live, &other.live)
    }
}

/// One counted handle
///
/// Not `Clone`: each slot accounts for exactly one acquire and gives it back
/// exactly once, either through [`LiveSlot::release`] or on drop.
#[derive(Debug)]
#[must_use = "dropping a LiveSlot immediately gives the slot back"]
pub struct LiveSlot {
    live: Option<Arc<AtomicUsize>>,
}

impl LiveSlot {
    /// Live count of the counter this slot belongs to
    pub fn live(&self) -> usize {
        self.live.as_ref().map_or(0, |live| live.load(Ordering::Acquire))
    }

    /// Give the slot back, returning the live count after the decrement
    pub fn release(mut self) -> usize {
        self.live.take().map_or(0, |live| decrement(&live))
    }
}

impl Drop for LiveSlot {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            decrement(&live);
        }
    }
}

fn decrement(live: &AtomicUsize) -> usize {
    let previous = live.fetch_sub(1, Ordering::AcqRel);
    debug_assert!(previous > 0, "live socket count released below zero");
    previous.wrapping_sub(1)
}
