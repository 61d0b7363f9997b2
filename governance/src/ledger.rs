//! Power ledger — identity → voting power, with the pre-delegation
//! original power and a capped history of snapshots.
//!
//! Delegation moves power between entries through [`PowerLedger::transfer`];
//! only `initialize` and `stake` ever change the total supply.

use crate::error::GovernanceError;
use agora_types::{BlockHeight, Identity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of history points kept per identity.
pub const MAX_HISTORY: usize = 100;

/// Power held by an identity at a given block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub block: BlockHeight,
    pub power: u128,
}

/// Ledger entry for a single identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerEntry {
    pub current_power: u128,
    /// Power granted at initialization; not touched by stake or delegation.
    pub original_power: u128,
    /// Append-only, at most [`MAX_HISTORY`] points.
    pub history: Vec<HistoryPoint>,
    /// Set by `initialize`. Entries created by stake or an incoming
    /// delegation exist without it.
    pub initialized: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PowerLedger {
    entries: HashMap<Identity, PowerEntry>,
    total_voting_power: u128,
}

impl PowerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current power of `identity`; 0 for unknown identities.
    pub fn power(&self, identity: &Identity) -> u128 {
        self.entries
            .get(identity)
            .map(|e| e.current_power)
            .unwrap_or(0)
    }

    pub fn entry(&self, identity: &Identity) -> Option<&PowerEntry> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn total_voting_power(&self) -> u128 {
        self.total_voting_power
    }

    /// Iterate over every (identity, entry) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &PowerEntry)> {
        self.entries.iter()
    }

    /// Number of identities with a ledger entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Grant initial power to an identity that has not been initialized.
    ///
    /// An entry that only exists through stake or an incoming delegation
    /// keeps its current power; `power` is added on top of it.
    pub fn initialize(
        &mut self,
        voter: &Identity,
        power: u128,
        block: BlockHeight,
    ) -> Result<(), GovernanceError> {
        if power == 0 {
            return Err(GovernanceError::InvalidAmount(
                "initial power must be non-zero".into(),
            ));
        }
        let existing = self.entries.get(voter);
        if existing.is_some_and(|e| e.initialized) {
            return Err(GovernanceError::AlreadyInitialized(voter.to_string()));
        }
        let (current, history_len) =
            existing.map_or((0, 0), |e| (e.current_power, e.history.len()));
        if history_len >= MAX_HISTORY {
            return Err(GovernanceError::HistoryFull(voter.to_string()));
        }
        let new_power = current
            .checked_add(power)
            .ok_or(GovernanceError::ArithmeticOverflow("initial power"))?;
        let total = self
            .total_voting_power
            .checked_add(power)
            .ok_or(GovernanceError::ArithmeticOverflow("total voting power"))?;

        let entry = self.entries.entry(voter.clone()).or_default();
        entry.current_power = new_power;
        entry.original_power = power;
        entry.initialized = true;
        entry.history.push(HistoryPoint {
            block,
            power: new_power,
        });
        self.total_voting_power = total;
        Ok(())
    }

    /// Add `amount` to the staker's current power. Returns the new power.
    pub fn stake(
        &mut self,
        staker: &Identity,
        amount: u128,
        block: BlockHeight,
    ) -> Result<u128, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount(
                "stake amount must be non-zero".into(),
            ));
        }
        let (current, history_len) = self
            .entries
            .get(staker)
            .map(|e| (e.current_power, e.history.len()))
            .unwrap_or((0, 0));
        if history_len >= MAX_HISTORY {
            return Err(GovernanceError::HistoryFull(staker.to_string()));
        }
        let new_power = current
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("staked power"))?;
        let total = self
            .total_voting_power
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("total voting power"))?;

        let entry = self.entries.entry(staker.clone()).or_default();
        entry.current_power = new_power;
        entry.history.push(HistoryPoint {
            block,
            power: new_power,
        });
        self.total_voting_power = total;
        Ok(new_power)
    }

    /// Most recent recorded power of `identity` at or before `block`.
    pub fn power_at(&self, identity: &Identity, block: BlockHeight) -> u128 {
        self.entries
            .get(identity)
            .and_then(|e| e.history.iter().rev().find(|p| p.block <= block))
            .map(|p| p.power)
            .unwrap_or(0)
    }

    /// Move `amount` of current power from `from` to `to`.
    ///
    /// Both sides are checked before either is written.
    pub(crate) fn transfer(
        &mut self,
        from: &Identity,
        to: &Identity,
        amount: u128,
    ) -> Result<(), GovernanceError> {
        let have = self.power(from);
        let from_after = have
            .checked_sub(amount)
            .ok_or(GovernanceError::InsufficientPower { have, need: amount })?;
        let to_after = self
            .power(to)
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("delegated power"))?;

        self.entries.entry(from.clone()).or_default().current_power = from_after;
        self.entries.entry(to.clone()).or_default().current_power = to_after;
        Ok(())
    }

    /// Sum of every entry's current power. Equals the total supply while the
    /// ledger is consistent.
    pub fn sum_of_current_power(&self) -> u128 {
        self.entries.values().map(|e| e.current_power).sum()
    }
}
