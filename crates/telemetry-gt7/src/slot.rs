//! Single-slot latest-frame hand-off.
//!
//! The receive loop overwrites the slot; the single consumer takes and
//! clears it. Frames published between two takes are dropped on purpose:
//! only the newest state matters for a live feed.

use crate::frame::TelemetryFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Last-write-wins slot holding at most one frame.
#[derive(Debug, Default)]
pub struct LatestFrameSlot {
    frame: Mutex<Option<Arc<TelemetryFrame>>>,
    published: AtomicU64,
    overwritten: AtomicU64,
}

impl LatestFrameSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, replacing any frame not yet taken.
    pub fn publish(&self, frame: TelemetryFrame) {
        let previous = self.frame.lock().replace(Arc::new(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take the pending frame, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<Arc<TelemetryFrame>> {
        self.frame.lock().take()
    }

    /// Whether a frame is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.frame.lock().is_some()
    }

    /// Total frames published.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames replaced before anyone took them.
    #[must_use]
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}
