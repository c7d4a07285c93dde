//! Single-slot mailbox carrying finished frames out of the tick interrupt

use portable_atomic::{AtomicU32, Ordering};
use crate::types::{RawSample, FRAME_MASK};

/// Ready flag, kept above the 25 frame bits
const READY: u32 = 1 << 31;

/// Flag-gated, single-slot handoff between one producer and one consumer.
///
/// Flag and value share one atomic word, so publishing sets both at once and
/// taking clears both at once. A frame published while the consumer drains is
/// either the one it takes or stays pending for the next take. There is no
/// queue: publishing over an undrained value replaces it.
pub struct Mailbox {
    slot: AtomicU32,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU32::new(0),
        }
    }

    /// Deposit a finished frame (producer side, interrupt context)
    pub fn publish(&self, sample: RawSample) {
        self.slot.store(sample.raw() | READY, Ordering::Release);
    }

    /// Take the pending frame, if any (consumer side, foreground context)
    pub fn try_take(&self) -> Option<RawSample> {
        if !self.is_ready() {
            return None;
        }
        let word = self.slot.swap(0, Ordering::AcqRel);
        (word & READY != 0).then(|| RawSample::new(word & FRAME_MASK))
    }

    /// True while a published frame has not been taken
    pub fn is_ready(&self) -> bool {
        self.slot.load(Ordering::Acquire) & READY != 0
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
