//! Treasury custody bookkeeping and pending payouts.
//!
//! The engine only records balances it has been handed and payouts it owes;
//! actual token movement is delegated to the host [`TreasuryLedger`].
//!
//! [`TreasuryLedger`]: crate::host::TreasuryLedger

use crate::error::GovernanceError;
use agora_types::{Identity, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A payout recorded when a funded proposal executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayout {
    pub proposal_id: u64,
    pub recipient: Identity,
    pub amount: TokenAmount,
    pub claimed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreasuryBook {
    /// Account that holds the engine's funds in the host ledger.
    custody_account: Identity,
    /// Funds deposited and not yet paid out.
    balance: TokenAmount,
    payouts: BTreeMap<u64, PendingPayout>,
}

impl TreasuryBook {
    pub fn new(custody_account: Identity) -> Self {
        Self {
            custody_account,
            balance: TokenAmount::ZERO,
            payouts: BTreeMap::new(),
        }
    }

    pub fn custody_account(&self) -> &Identity {
        &self.custody_account
    }

    pub fn balance(&self) -> TokenAmount {
        self.balance
    }

    pub fn payout(&self, proposal_id: u64) -> Option<&PendingPayout> {
        self.payouts.get(&proposal_id)
    }

    /// Sum of recorded payouts not yet claimed.
    pub fn outstanding(&self) -> TokenAmount {
        self.payouts
            .values()
            .filter(|p| !p.claimed)
            .fold(TokenAmount::ZERO, |acc, p| {
                acc.checked_add(p.amount).unwrap_or(TokenAmount::new(u128::MAX))
            })
    }

    pub(crate) fn credit(&mut self, amount: TokenAmount) -> Result<(), GovernanceError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("treasury balance"))?;
        Ok(())
    }

    pub(crate) fn record_payout(&mut self, payout: PendingPayout) {
        self.payouts.insert(payout.proposal_id, payout);
    }

    /// Mark a payout claimed and debit the custody balance.
    pub(crate) fn settle(&mut self, proposal_id: u64) -> Result<(), GovernanceError> {
        let payout = self
            .payouts
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;
        self.balance = self
            .balance
            .checked_sub(payout.amount)
            .ok_or(GovernanceError::InsufficientFunds {
                have: self.balance.raw(),
                need: payout.amount.raw(),
            })?;
        payout.claimed = true;
        Ok(())
    }
}
