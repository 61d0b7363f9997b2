//! Governance parameters — the owner-tunable defaults applied to new proposals.
//!
//! Every field can be changed by the owner through the admin surface, or by a
//! proposal carrying a parameter-change action once it executes.

use crate::error::AgoraError;
use serde::{Deserialize, Serialize};

/// Tunable governance parameters stored alongside the engine state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Quorum (total yes + no + abstain effective power) applied when a
    /// proposal does not specify its own.
    #[serde(default = "default_quorum")]
    pub default_quorum: u128,

    /// Yes-percentage (1..=100) applied when a proposal does not specify its own.
    #[serde(default = "default_threshold")]
    pub default_threshold: u8,

    /// Minimum voting power a creator must hold to submit a proposal.
    #[serde(default = "default_proposal_threshold")]
    pub proposal_threshold: u128,

    /// Blocks between the end of voting and the earliest execution block.
    #[serde(default = "default_execution_delay")]
    pub execution_delay: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_quorum() -> u128 {
    1_000
}

fn default_threshold() -> u8 {
    51
}

fn default_proposal_threshold() -> u128 {
    100
}

fn default_execution_delay() -> u64 {
    144
}

impl GovernanceParams {
    /// Check the cross-field invariants.
    pub fn validate(&self) -> Result<(), AgoraError> {
        if !(1..=100).contains(&self.default_threshold) {
            return Err(AgoraError::InvalidParams(format!(
                "default_threshold must be within 1..=100, got {}",
                self.default_threshold
            )));
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            default_quorum: default_quorum(),
            default_threshold: default_threshold(),
            proposal_threshold: default_proposal_threshold(),
            execution_delay: default_execution_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GovernanceParams::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let params = GovernanceParams {
            default_threshold: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = GovernanceParams {
            default_threshold: 101,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
