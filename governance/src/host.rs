//! Seams to the host environment: caller identity, block clock, treasury
//! ledger and reward distribution.
//!
//! The engine never authenticates callers, never reads wall-clock time and
//! never moves funds itself. The host supplies all three.

use crate::error::GovernanceError;
use crate::proposal::ProposalKind;
use crate::treasury::PendingPayout;
use agora_types::{BlockHeight, Identity, TokenAmount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authenticated caller and the current block for one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Identity,
    pub block: BlockHeight,
}

impl CallContext {
    pub fn new(caller: impl Into<Identity>, block: impl Into<BlockHeight>) -> Self {
        Self {
            caller: caller.into(),
            block: block.into(),
        }
    }
}

/// Monotonic, non-decreasing logical block counter.
pub trait BlockClock: Send + Sync {
    fn current_block(&self) -> BlockHeight;
}

/// Failure reported by the host treasury ledger.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TreasuryError(pub String);

impl From<TreasuryError> for GovernanceError {
    fn from(e: TreasuryError) -> Self {
        GovernanceError::Treasury(e.0)
    }
}

/// The host's fungible-token ledger used for treasury custody and payouts.
pub trait TreasuryLedger {
    /// Spendable balance of `account`.
    fn balance_of(&self, account: &Identity) -> TokenAmount;

    /// Move `amount` from `from` to `to`. Must be all-or-nothing.
    fn transfer(
        &mut self,
        from: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> Result<(), TreasuryError>;
}

/// What an execution produced, handed to the reward hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub proposal_id: u64,
    pub kind: ProposalKind,
    pub executed_at: BlockHeight,
    /// Payout recorded by this execution, if the proposal requested funds.
    pub payout: Option<PendingPayout>,
    /// Every identity that voted on the proposal, in vote order.
    pub participants: Vec<Identity>,
}

/// External reward distribution, triggered after a proposal executes.
pub trait RewardHook {
    fn on_executed(&mut self, receipt: &ExecutionReceipt) -> Result<(), GovernanceError>;
}
