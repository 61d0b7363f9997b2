//! Governable parameters.
//!
//! The admin surface addresses parameters by name; names are parsed into
//! this closed enum once and everything downstream matches on the enum.

use crate::error::GovernanceError;
use agora_types::GovernanceParams;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Every parameter that the owner or an executed proposal can change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernableParam {
    DefaultQuorum,
    DefaultThreshold,
    ProposalThreshold,
    ExecutionDelay,
}

impl GovernableParam {
    pub const ALL: [GovernableParam; 4] = [
        Self::DefaultQuorum,
        Self::DefaultThreshold,
        Self::ProposalThreshold,
        Self::ExecutionDelay,
    ];

    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DefaultQuorum => "default_quorum",
            Self::DefaultThreshold => "default_threshold",
            Self::ProposalThreshold => "proposal_threshold",
            Self::ExecutionDelay => "execution_delay",
        }
    }

    /// Check that `value` is acceptable for this parameter.
    pub fn validate(&self, value: u128) -> Result<(), GovernanceError> {
        match self {
            Self::DefaultThreshold if !(1..=100).contains(&value) => Err(
                GovernanceError::InvalidThreshold(format!("{value} is outside 1..=100")),
            ),
            Self::ExecutionDelay if value > u128::from(u64::MAX) => Err(
                GovernanceError::InvalidAmount(format!("execution delay {value} out of range")),
            ),
            _ => Ok(()),
        }
    }

    /// Current value of this parameter.
    pub fn read(&self, params: &GovernanceParams) -> u128 {
        match self {
            Self::DefaultQuorum => params.default_quorum,
            Self::DefaultThreshold => u128::from(params.default_threshold),
            Self::ProposalThreshold => params.proposal_threshold,
            Self::ExecutionDelay => u128::from(params.execution_delay),
        }
    }

    /// Validate and write `value`.
    pub fn apply(&self, params: &mut GovernanceParams, value: u128) -> Result<(), GovernanceError> {
        self.validate(value)?;
        match self {
            Self::DefaultQuorum => params.default_quorum = value,
            Self::DefaultThreshold => params.default_threshold = value as u8,
            Self::ProposalThreshold => params.proposal_threshold = value,
            Self::ExecutionDelay => params.execution_delay = value as u64,
        }
        Ok(())
    }
}

impl FromStr for GovernableParam {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| GovernanceError::UnknownParameter(s.to_string()))
    }
}
