//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use agora_types::{GovernanceParams, Identity};

use crate::logging::LogFormat;
use crate::NodeError;

/// Governance parameters as written in TOML.
///
/// TOML integers are 64-bit, so the power-valued fields are `u64` here and
/// widened when the engine is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsConfig {
    #[serde(default = "default_quorum")]
    pub default_quorum: u64,
    #[serde(default = "default_threshold")]
    pub default_threshold: u8,
    #[serde(default = "default_proposal_threshold")]
    pub proposal_threshold: u64,
    #[serde(default = "default_execution_delay")]
    pub execution_delay: u64,
}

impl ParamsConfig {
    pub fn to_params(&self) -> GovernanceParams {
        GovernanceParams {
            default_quorum: u128::from(self.default_quorum),
            default_threshold: self.default_threshold,
            proposal_threshold: u128::from(self.proposal_threshold),
            execution_delay: self.execution_delay,
        }
    }
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            default_quorum: default_quorum(),
            default_threshold: default_threshold(),
            proposal_threshold: default_proposal_threshold(),
            execution_delay: default_execution_delay(),
        }
    }
}

/// A voter granted power and reputation when a fresh engine is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisVoter {
    pub identity: Identity,
    pub power: u64,
    #[serde(default)]
    pub reputation: u64,
}

/// Configuration for an Agora node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity holding the owner capability.
    #[serde(default = "default_owner")]
    pub owner: Identity,

    /// Custody account the treasury ledger holds deposits in.
    #[serde(default = "default_treasury_account")]
    pub treasury_account: Identity,

    /// Initial veto council (at most five members).
    #[serde(default)]
    pub veto_council: Vec<Identity>,

    /// Directory for the persisted engine snapshot. No persistence when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Capacity of the governance service's request queue.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Block height at which genesis voters are initialised.
    #[serde(default)]
    pub start_block: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Governance parameters for a fresh engine. Ignored when a persisted
    /// snapshot is restored.
    #[serde(default)]
    pub params: ParamsConfig,

    /// Voters initialised when a fresh engine is created.
    #[serde(default)]
    pub genesis: Vec<GenesisVoter>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_owner() -> Identity {
    Identity::new("owner")
}

fn default_treasury_account() -> Identity {
    Identity::new("treasury")
}

fn default_quorum() -> u64 {
    GovernanceParams::default().default_quorum as u64
}

fn default_threshold() -> u8 {
    GovernanceParams::default().default_threshold
}

fn default_proposal_threshold() -> u64 {
    GovernanceParams::default().proposal_threshold as u64
}

fn default_execution_delay() -> u64 {
    GovernanceParams::default().execution_delay
}

fn default_inbox_capacity() -> usize {
    256
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// Check settings that the engine would otherwise reject at startup.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.params
            .to_params()
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        self.log_format()?;
        if self.inbox_capacity == 0 {
            return Err(NodeError::Config("inbox_capacity must be at least 1".into()));
        }
        for id in std::iter::once(&self.owner)
            .chain(std::iter::once(&self.treasury_account))
            .chain(&self.veto_council)
            .chain(self.genesis.iter().map(|v| &v.identity))
        {
            if !id.is_valid() {
                return Err(NodeError::Config(format!("invalid identity {id:?}")));
            }
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            treasury_account: default_treasury_account(),
            veto_council: Vec::new(),
            params: ParamsConfig::default(),
            genesis: Vec::new(),
            data_dir: None,
            inbox_capacity: default_inbox_capacity(),
            start_block: 0,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
