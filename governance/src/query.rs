//! Read-only views over the engine state.

use crate::engine::GovernanceEngine;
use crate::proposal::{Proposal, ProposalStatus, VoteRecord};
use crate::treasury::PendingPayout;
use agora_types::{BlockHeight, Identity, TokenAmount};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoterInfo {
    pub identity: Identity,
    pub power: u128,
    pub original_power: u128,
    pub reputation: u64,
    pub participation_count: u64,
    pub streak: u64,
    /// Number of delegators currently pointing at this identity.
    pub active_delegations: usize,
    pub delegated_to: Option<Identity>,
    pub delegation_expiry: Option<BlockHeight>,
    pub delegation_limit: Option<u128>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProposalDetails {
    pub proposal: Proposal,
    pub status: ProposalStatus,
    pub total_votes: u128,
    pub yes_percentage: u128,
    pub no_percentage: u128,
    pub abstain_percentage: u128,
    pub quorum_reached: bool,
    pub threshold_reached: bool,
    pub approvals: usize,
    pub approvals_required: usize,
    /// Whether `execute` would pass every check at the queried block.
    pub executable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GovernanceStats {
    pub total_voting_power: u128,
    pub proposal_count: u64,
    pub active_delegations: usize,
    pub default_quorum: u128,
    pub default_threshold: u8,
    pub proposal_threshold: u128,
    pub execution_delay: u64,
    pub treasury_balance: TokenAmount,
}

impl GovernanceEngine {
    pub fn voter_info(&self, identity: &Identity) -> VoterInfo {
        let state = self.state();
        let entry = state.ledger.entry(identity);
        let reputation = state.reputation.get(identity);
        let edge = state.delegations.edge(identity);
        VoterInfo {
            identity: identity.clone(),
            power: entry.map_or(0, |e| e.current_power),
            original_power: entry.map_or(0, |e| e.original_power),
            reputation: reputation.score,
            participation_count: reputation.participation_count,
            streak: reputation.streak,
            active_delegations: state.delegations.active_delegation_count(identity),
            delegated_to: edge.map(|e| e.delegate.clone()),
            delegation_expiry: edge.map(|e| e.expiry_block),
            delegation_limit: state.delegations.delegation_limit(identity),
        }
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.state().proposals.get(id)
    }

    pub fn proposal_details(&self, id: u64, now: BlockHeight) -> Option<ProposalDetails> {
        let state = self.state();
        let proposal = state.proposals.get(id)?;
        let quorum_reached = proposal.quorum_reached();
        let threshold_reached = proposal.threshold_reached();
        let gate_satisfied = state.multisig.is_satisfied(id);
        let executable = !proposal.executed
            && !proposal.cancelled
            && now >= proposal.execution_block
            && quorum_reached
            && threshold_reached
            && gate_satisfied;
        Some(ProposalDetails {
            status: proposal.status(now),
            total_votes: proposal.total_votes(),
            yes_percentage: proposal.yes_percentage(),
            no_percentage: proposal.percentage_of(proposal.no_votes),
            abstain_percentage: proposal.percentage_of(proposal.abstain_votes),
            quorum_reached,
            threshold_reached,
            approvals: state.multisig.approval_count(id),
            approvals_required: state.multisig.approvals_required(id),
            executable,
            proposal: proposal.clone(),
        })
    }

    pub fn is_veto_member(&self, identity: &Identity) -> bool {
        self.state().veto.is_member(identity)
    }

    pub fn veto_council(&self) -> &[Identity] {
        self.state().veto.members()
    }

    pub fn stats(&self) -> GovernanceStats {
        let state = self.state();
        GovernanceStats {
            total_voting_power: state.ledger.total_voting_power(),
            proposal_count: state.proposals.count(),
            active_delegations: state.delegations.edge_count(),
            default_quorum: state.params.default_quorum,
            default_threshold: state.params.default_threshold,
            proposal_threshold: state.params.proposal_threshold,
            execution_delay: state.params.execution_delay,
            treasury_balance: state.treasury.balance(),
        }
    }

    pub fn pending_payout(&self, id: u64) -> Option<&PendingPayout> {
        self.state().treasury.payout(id)
    }

    /// Power held by `identity` at `block`, from its stake history.
    pub fn power_at(&self, identity: &Identity, block: BlockHeight) -> u128 {
        self.state().ledger.power_at(identity, block)
    }

    pub fn get_vote(&self, id: u64, voter: &Identity) -> Option<&VoteRecord> {
        self.state().proposals.vote(id, voter)
    }
}
