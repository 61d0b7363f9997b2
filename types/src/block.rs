//! Logical block height supplied by the host clock.
//!
//! All governance timing (voting windows, timelocks, delegation expiry) is
//! expressed in blocks, never in wall-clock time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonic block number.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// The genesis block.
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Height `blocks` after this one, saturating at `u64::MAX`.
    pub fn saturating_add(self, blocks: u64) -> Self {
        Self(self.0.saturating_add(blocks))
    }

    pub fn checked_add(self, blocks: u64) -> Option<Self> {
        self.0.checked_add(blocks).map(Self)
    }

    /// Blocks elapsed since this height (relative to `now`), saturating to 0.
    pub fn blocks_until(&self, later: BlockHeight) -> u64 {
        later.0.saturating_sub(self.0)
    }

    /// Whether `now` has reached or passed this height.
    pub fn is_reached(&self, now: BlockHeight) -> bool {
        now.0 >= self.0
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for BlockHeight {
    fn from(height: u64) -> Self {
        Self(height)
    }
}
