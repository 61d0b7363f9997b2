//! Agora governance node.
//!
//! Wraps the governance engine for long-running use:
//! - TOML configuration with genesis voters and parameters
//! - Structured logging (human or JSON)
//! - A single-inbox service task that serialises every operation
//! - Snapshot persistence to an LMDB metadata store
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod service;
pub mod shutdown;

pub use config::{GenesisVoter, NodeConfig, ParamsConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::AgoraNode;
pub use service::{GovernanceHandle, GovernanceService};
pub use shutdown::{ShutdownController, ShutdownReason};
