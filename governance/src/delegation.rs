//! Delegation graph — temporary transfer of voting power to a representative.
//!
//! Each delegator has at most one outgoing edge. Creating an edge moves the
//! delegator's entire current power to the delegate in the [`PowerLedger`];
//! revoking it after expiry moves exactly that amount back. Only one hop is
//! ever materialized: an identity holding delegated power cannot delegate it
//! onward, and an identity with a live outgoing edge cannot receive one, so
//! the graph never contains chains or cycles of live edges.
//!
//! Every delegator also keeps a permanent, capped audit log of the delegates
//! it has chosen over time. Revocation never trims it.

use crate::error::GovernanceError;
use crate::ledger::PowerLedger;
use agora_types::{BlockHeight, Identity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum concurrent incoming edges per delegate.
pub const MAX_DELEGATIONS: usize = 50;

/// Maximum entries in a delegator's chain history.
pub const MAX_CHAIN: usize = 10;

/// A live delegation edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationEdge {
    pub delegator: Identity,
    pub delegate: Identity,
    /// The edge may be revoked once the current block reaches this height.
    pub expiry_block: BlockHeight,
    /// Power moved to the delegate when the edge was created.
    pub amount: u128,
    pub created_at: BlockHeight,
}

/// Parameters of a single delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub delegator: Identity,
    pub delegate: Identity,
    pub expiry_block: BlockHeight,
    /// Cap recorded on the delegate when non-zero.
    pub max_power: u128,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DelegationGraph {
    /// Live edges: delegator → edge.
    edges: HashMap<Identity, DelegationEdge>,
    /// Reverse index: delegate → delegators with a live edge. Rebuilt on load.
    #[serde(skip)]
    reverse: HashMap<Identity, HashSet<Identity>>,
    /// Delegate-side caps, last writer wins.
    limits: HashMap<Identity, u128>,
    /// Delegator → every delegate it has chosen, oldest first.
    chains: HashMap<Identity, Vec<Identity>>,
}

impl DelegationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an edge and move the delegator's power to the delegate.
    /// Returns the amount transferred.
    pub(crate) fn delegate(
        &mut self,
        ledger: &mut PowerLedger,
        request: &DelegationRequest,
        now: BlockHeight,
    ) -> Result<u128, GovernanceError> {
        let DelegationRequest {
            delegator,
            delegate,
            expiry_block,
            max_power,
        } = request;

        if delegator == delegate {
            return Err(GovernanceError::SelfDelegation);
        }
        let amount = ledger.power(delegator);
        if amount == 0 {
            return Err(GovernanceError::InsufficientPower { have: 0, need: 1 });
        }
        if self.active_delegation_count(delegate) >= MAX_DELEGATIONS {
            return Err(GovernanceError::DelegationLimitExceeded(format!(
                "{delegate} already has {MAX_DELEGATIONS} incoming delegations"
            )));
        }
        if *expiry_block <= now {
            return Err(GovernanceError::InvalidTimelock(format!(
                "expiry {expiry_block} must be after current block {now}"
            )));
        }
        if self.edges.contains_key(delegator) {
            return Err(GovernanceError::DelegationExists(delegator.to_string()));
        }
        if self.active_delegation_count(delegator) > 0 {
            return Err(GovernanceError::DelegationLimitExceeded(format!(
                "{delegator} holds delegated power and cannot delegate onward"
            )));
        }
        if self.edges.contains_key(delegate) {
            return Err(GovernanceError::DelegationLimitExceeded(format!(
                "{delegate} has delegated its own power and cannot receive more"
            )));
        }
        if self.chain(delegator).len() >= MAX_CHAIN {
            return Err(GovernanceError::DelegationLimitExceeded(format!(
                "{delegator} has reached the {MAX_CHAIN}-entry delegation history"
            )));
        }

        ledger.transfer(delegator, delegate, amount)?;

        if *max_power > 0 {
            self.limits.insert(delegate.clone(), *max_power);
        }
        self.edges.insert(
            delegator.clone(),
            DelegationEdge {
                delegator: delegator.clone(),
                delegate: delegate.clone(),
                expiry_block: *expiry_block,
                amount,
                created_at: now,
            },
        );
        self.reverse
            .entry(delegate.clone())
            .or_default()
            .insert(delegator.clone());
        self.chains
            .entry(delegator.clone())
            .or_default()
            .push(delegate.clone());
        Ok(amount)
    }

    /// Revoke the delegator's edge if it has expired at `now`.
    ///
    /// Returns the removed edge, or `None` when there is no edge or it has
    /// not expired yet.
    pub(crate) fn revoke_if_expired(
        &mut self,
        ledger: &mut PowerLedger,
        delegator: &Identity,
        now: BlockHeight,
    ) -> Result<Option<DelegationEdge>, GovernanceError> {
        let edge = match self.edges.get(delegator) {
            Some(edge) if edge.expiry_block.is_reached(now) => edge.clone(),
            _ => return Ok(None),
        };

        ledger.transfer(&edge.delegate, delegator, edge.amount)?;

        self.edges.remove(delegator);
        if let Some(set) = self.reverse.get_mut(&edge.delegate) {
            set.remove(delegator);
            if set.is_empty() {
                self.reverse.remove(&edge.delegate);
            }
        }
        Ok(Some(edge))
    }

    /// The live outgoing edge of `delegator`.
    pub fn edge(&self, delegator: &Identity) -> Option<&DelegationEdge> {
        self.edges.get(delegator)
    }

    /// Number of live incoming edges of `delegate`.
    pub fn active_delegation_count(&self, delegate: &Identity) -> usize {
        self.reverse.get(delegate).map(HashSet::len).unwrap_or(0)
    }

    /// Delegators with a live edge to `delegate`, sorted.
    pub fn delegators_of(&self, delegate: &Identity) -> Vec<Identity> {
        let mut delegators: Vec<Identity> = self
            .reverse
            .get(delegate)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        delegators.sort();
        delegators
    }

    pub fn delegation_limit(&self, delegate: &Identity) -> Option<u128> {
        self.limits.get(delegate).copied()
    }

    /// Audit log of the delegates `delegator` has chosen, oldest first.
    pub fn chain(&self, delegator: &Identity) -> &[Identity] {
        self.chains
            .get(delegator)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Delegators whose edge has expired at `now`, sorted.
    pub fn expired_delegators(&self, now: BlockHeight) -> Vec<Identity> {
        let mut expired: Vec<Identity> = self
            .edges
            .values()
            .filter(|e| e.expiry_block.is_reached(now))
            .map(|e| e.delegator.clone())
            .collect();
        expired.sort();
        expired
    }

    /// Rebuild the reverse index from the edge map (after deserialization).
    pub(crate) fn rebuild_index(&mut self) {
        let mut reverse = HashMap::<Identity, HashSet<Identity>>::new();
        for (delegator, edge) in &self.edges {
            reverse
                .entry(edge.delegate.clone())
                .or_default()
                .insert(delegator.clone());
        }
        self.reverse = reverse;
    }
}
