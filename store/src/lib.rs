//! Abstract storage traits for the Agora governance engine.
//!
//! The engine treats storage as an abstract keyed store. Every backend
//! (LMDB in `agora-store-lmdb`, in-memory for testing) implements these traits;
//! the engine depends only on the traits.

pub mod error;
pub mod meta;

pub use error::StoreError;
pub use meta::MetaStore;
