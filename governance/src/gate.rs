//! Multi-signature approvals and the veto council.
//!
//! Multi-sig here means "enough identities from a pre-registered list each
//! approved individually"; there is no signature verification.

use crate::error::GovernanceError;
use agora_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const MAX_VETO_COUNCIL: usize = 5;

/// What a caller must be to perform a gated operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Owner,
    VetoCouncil,
    Approver(u64),
}

/// Registered approvers and recorded approvals, per proposal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MultiSigGate {
    required: HashMap<u64, Vec<Identity>>,
    approvals: HashMap<u64, HashSet<Identity>>,
}

impl MultiSigGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, proposal_id: u64, approvers: Vec<Identity>) {
        if !approvers.is_empty() {
            self.required.insert(proposal_id, approvers);
        }
    }

    pub fn approvers(&self, proposal_id: u64) -> &[Identity] {
        self.required
            .get(&proposal_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_approver(&self, proposal_id: u64, identity: &Identity) -> bool {
        self.approvers(proposal_id).contains(identity)
    }

    pub fn has_approved(&self, proposal_id: u64, identity: &Identity) -> bool {
        self.approvals
            .get(&proposal_id)
            .is_some_and(|set| set.contains(identity))
    }

    pub fn approval_count(&self, proposal_id: u64) -> usize {
        self.approvals.get(&proposal_id).map(HashSet::len).unwrap_or(0)
    }

    /// Approvals needed before execution: half the registered list, rounded down.
    pub fn approvals_required(&self, proposal_id: u64) -> usize {
        self.approvers(proposal_id).len() / 2
    }

    pub fn is_satisfied(&self, proposal_id: u64) -> bool {
        self.approval_count(proposal_id) >= self.approvals_required(proposal_id)
    }

    pub(crate) fn approve(
        &mut self,
        proposal_id: u64,
        approver: &Identity,
    ) -> Result<usize, GovernanceError> {
        if !self.is_approver(proposal_id, approver) {
            return Err(GovernanceError::NotAuthorized);
        }
        if self.has_approved(proposal_id, approver) {
            return Err(GovernanceError::AlreadyVoted(approver.to_string()));
        }
        let set = self.approvals.entry(proposal_id).or_default();
        set.insert(approver.clone());
        Ok(set.len())
    }
}

/// Identities empowered to cancel any active proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoCouncil {
    members: Vec<Identity>,
}

impl VetoCouncil {
    pub fn new(members: Vec<Identity>) -> Result<Self, GovernanceError> {
        let mut council = Self::default();
        council.set_members(members)?;
        Ok(council)
    }

    pub fn members(&self) -> &[Identity] {
        &self.members
    }

    pub fn is_member(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    pub(crate) fn set_members(&mut self, members: Vec<Identity>) -> Result<(), GovernanceError> {
        if members.len() > MAX_VETO_COUNCIL {
            return Err(GovernanceError::TooManyEntries {
                what: "veto council members",
                max: MAX_VETO_COUNCIL,
            });
        }
        if has_duplicates(&members) {
            return Err(GovernanceError::InvalidAmount(
                "duplicate veto council member".into(),
            ));
        }
        self.members = members;
        Ok(())
    }
}

pub(crate) fn has_duplicates(identities: &[Identity]) -> bool {
    let mut seen = HashSet::new();
    identities.iter().any(|id| !seen.insert(id))
}
