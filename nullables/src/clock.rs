//! Nullable clock — deterministic block heights for testing.

use agora_governance::BlockClock;
use agora_types::BlockHeight;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic block clock.
///
/// The height only moves when you tell it to. Atomic so one clock can be
/// shared between a test and a running service task.
#[derive(Debug, Default)]
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_block: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_block),
        }
    }

    /// Get the current block height.
    pub fn now(&self) -> BlockHeight {
        BlockHeight::new(self.current.load(Ordering::SeqCst))
    }

    /// Advance by a number of blocks.
    pub fn advance(&self, blocks: u64) {
        self.current.fetch_add(blocks, Ordering::SeqCst);
    }

    /// Jump to a specific height. Heights never move backwards; lower
    /// values are ignored.
    pub fn set(&self, block: u64) {
        self.current.fetch_max(block, Ordering::SeqCst);
    }
}

impl BlockClock for NullClock {
    fn current_block(&self) -> BlockHeight {
        self.now()
    }
}
