//! Reputation-weighted governance for the Agora protocol.
//!
//! Voters hold power in a conserved ledger and may hand all of it to another
//! voter for a bounded number of blocks. Proposals move through a fixed
//! block-height lifecycle: onboarding delay, voting window, execution timelock.
//! A vote counts the voter's power plus a tenth of their reputation.
//!
//! Optional gates sit on top of the vote: a per-proposal multi-sig approver
//! set, and a veto council that can cancel any active proposal.
//!
//! Every operation takes an explicit [`CallContext`] (caller and block) and
//! either succeeds completely or leaves the state untouched.

pub mod delegation;
pub mod engine;
pub mod error;
pub mod gate;
pub mod host;
pub mod ledger;
pub mod params;
pub mod proposal;
pub mod query;
pub mod reputation;
pub mod state;
pub mod treasury;

pub use delegation::{DelegationEdge, DelegationGraph, DelegationRequest};
pub use engine::{GovernanceEngine, MAX_BATCH, STATE_META_KEY};
pub use error::{ErrorKind, GovernanceError};
pub use gate::{Capability, MultiSigGate, VetoCouncil};
pub use host::{BlockClock, CallContext, ExecutionReceipt, RewardHook, TreasuryError, TreasuryLedger};
pub use ledger::{PowerEntry, PowerLedger};
pub use params::GovernableParam;
pub use proposal::{
    Proposal, ProposalAction, ProposalDraft, ProposalKind, ProposalStatus, VoteChoice, VoteRecord,
};
pub use query::{GovernanceStats, ProposalDetails, VoterInfo};
pub use reputation::{ReputationEntry, ReputationTracker};
pub use state::GovernanceState;
pub use treasury::{PendingPayout, TreasuryBook};
