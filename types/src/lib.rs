//! Fundamental types for the Agora governance engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! participant identities, block heights, treasury token amounts, the tunable
//! governance parameters, and the top-level error type.

pub mod amount;
pub mod block;
pub mod error;
pub mod identity;
pub mod params;

pub use amount::TokenAmount;
pub use block::BlockHeight;
pub use error::AgoraError;
pub use identity::Identity;
pub use params::GovernanceParams;
