//! LMDB storage backend for the Agora governance engine.
//!
//! Implements the `agora-store` traits with the `heed` LMDB bindings. One
//! environment per data directory, one named database per logical store.

pub mod environment;
pub mod error;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use meta::LmdbMetaStore;
