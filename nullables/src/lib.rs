//! Nullable infrastructure for deterministic testing.
//!
//! The governance engine reaches the outside world through a handful of
//! traits: the block clock, the token ledger behind the treasury, the
//! post-execution reward hook and the metadata store. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests and scenarios.

pub mod clock;
pub mod reward;
pub mod store;
pub mod treasury;

pub use clock::NullClock;
pub use reward::NullRewardHook;
pub use store::NullStore;
pub use treasury::NullTreasury;
