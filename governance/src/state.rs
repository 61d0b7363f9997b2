//! The governance state aggregate and its serialized snapshot form.

use crate::delegation::DelegationGraph;
use crate::error::GovernanceError;
use crate::gate::{MultiSigGate, VetoCouncil};
use crate::ledger::PowerLedger;
use crate::proposal::ProposalStore;
use crate::reputation::ReputationTracker;
use crate::treasury::TreasuryBook;
use agora_types::{GovernanceParams, Identity};
use serde::{Deserialize, Serialize};

/// Bumped whenever the serialized layout of [`GovernanceState`] changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the engine owns. Operations borrow it as a whole, so every
/// operation observes and mutates a consistent view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceState {
    pub owner: Identity,
    pub params: GovernanceParams,
    pub ledger: PowerLedger,
    pub reputation: ReputationTracker,
    pub delegations: DelegationGraph,
    pub proposals: ProposalStore,
    pub multisig: MultiSigGate,
    pub veto: VetoCouncil,
    pub treasury: TreasuryBook,
}

impl GovernanceState {
    pub fn new(owner: Identity, custody_account: Identity, params: GovernanceParams) -> Self {
        Self {
            owner,
            params,
            ledger: PowerLedger::new(),
            reputation: ReputationTracker::new(),
            delegations: DelegationGraph::new(),
            proposals: ProposalStore::new(),
            multisig: MultiSigGate::new(),
            veto: VetoCouncil::default(),
            treasury: TreasuryBook::new(custody_account),
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a GovernanceState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    state: GovernanceState,
}

/// Encode the state with bincode.
pub fn encode(state: &GovernanceState) -> Result<Vec<u8>, GovernanceError> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        state,
    };
    bincode::serialize(&snapshot).map_err(|e| GovernanceError::Serialization(e.to_string()))
}

/// Decode a snapshot produced by [`encode`] and rebuild derived indexes.
pub fn decode(data: &[u8]) -> Result<GovernanceState, GovernanceError> {
    let snapshot: Snapshot =
        bincode::deserialize(data).map_err(|e| GovernanceError::Serialization(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(GovernanceError::Serialization(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }
    let mut state = snapshot.state;
    state.delegations.rebuild_index();
    Ok(state)
}
