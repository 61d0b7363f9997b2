//! Governance proposals, vote records and the proposal store.

use crate::error::GovernanceError;
use crate::params::GovernableParam;
use agora_types::{BlockHeight, Identity, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Blocks between creation and the opening of the voting window.
pub const ONBOARDING_DELAY: u64 = 144;
pub const MIN_VOTING_PERIOD: u64 = 144;
pub const MAX_VOTING_PERIOD: u64 = 20_160;
/// Reputation a creator needs before submitting a proposal.
pub const MIN_PROPOSER_REPUTATION: u64 = 50;
pub const MAX_APPROVERS: usize = 10;
pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_LEN: usize = 32;
pub const MAX_TITLE_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// The four kinds of proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    Standard,
    Constitutional,
    Emergency,
    Treasury,
}

impl ProposalKind {
    pub fn code(&self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::Constitutional => 1,
            Self::Emergency => 2,
            Self::Treasury => 3,
        }
    }
}

impl TryFrom<u8> for ProposalKind {
    type Error = GovernanceError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Constitutional),
            2 => Ok(Self::Emergency),
            3 => Ok(Self::Treasury),
            other => Err(GovernanceError::InvalidProposalType(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    No,
    Yes,
    Abstain,
}

impl TryFrom<u8> for VoteChoice {
    type Error = GovernanceError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::No),
            1 => Ok(Self::Yes),
            2 => Ok(Self::Abstain),
            other => Err(GovernanceError::InvalidAmount(format!(
                "unknown vote choice {other}"
            ))),
        }
    }
}

/// A state change applied when the proposal executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    UpdateParameter { param: GovernableParam, value: u128 },
}

/// Where a proposal is in its lifecycle at a given block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Created, voting window not yet open.
    Pending,
    /// Voting window open.
    Active,
    /// Voting closed, not yet executed.
    AwaitingExecution,
    Executed,
    Cancelled,
}

/// A governance proposal. Never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub creator: Identity,
    pub yes_votes: u128,
    pub no_votes: u128,
    pub abstain_votes: u128,
    pub created_at: BlockHeight,
    pub start_block: BlockHeight,
    pub end_block: BlockHeight,
    pub execution_block: BlockHeight,
    pub quorum_required: u128,
    /// Required yes-percentage of total votes, 1..=100.
    pub threshold_percentage: u8,
    pub active: bool,
    pub executed: bool,
    pub cancelled: bool,
    pub treasury_amount: TokenAmount,
    pub target: Option<Identity>,
    pub tags: Vec<String>,
    pub action: Option<ProposalAction>,
}

impl Proposal {
    pub fn total_votes(&self) -> u128 {
        self.yes_votes
            .saturating_add(self.no_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Integer percentage of `votes` among all votes; 0 when nobody voted.
    pub fn percentage_of(&self, votes: u128) -> u128 {
        let total = self.total_votes();
        if total == 0 {
            0
        } else {
            votes.saturating_mul(100) / total
        }
    }

    pub fn yes_percentage(&self) -> u128 {
        self.percentage_of(self.yes_votes)
    }

    pub fn quorum_reached(&self) -> bool {
        self.total_votes() >= self.quorum_required
    }

    pub fn threshold_reached(&self) -> bool {
        self.yes_percentage() >= u128::from(self.threshold_percentage)
    }

    /// Whether `now` falls inside `[start_block, end_block)` of an active proposal.
    pub fn is_voting_open(&self, now: BlockHeight) -> bool {
        self.active && now >= self.start_block && now < self.end_block
    }

    pub fn status(&self, now: BlockHeight) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else if self.cancelled {
            ProposalStatus::Cancelled
        } else if now < self.start_block {
            ProposalStatus::Pending
        } else if now < self.end_block {
            ProposalStatus::Active
        } else {
            ProposalStatus::AwaitingExecution
        }
    }
}

/// Immutable record of a single vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub choice: VoteChoice,
    pub effective_power: u128,
    pub block: BlockHeight,
    pub reputation_at_vote: u64,
}

/// Everything a creator supplies to open a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub kind: ProposalKind,
    pub voting_period: u64,
    /// `None` uses the engine's default quorum.
    pub quorum_required: Option<u128>,
    /// `None` uses the engine's default threshold.
    pub threshold_percentage: Option<u8>,
    pub treasury_amount: TokenAmount,
    pub target: Option<Identity>,
    /// Identities that must co-approve before execution. Empty for none.
    pub approvers: Vec<Identity>,
    pub tags: Vec<String>,
    pub action: Option<ProposalAction>,
}

impl ProposalDraft {
    pub fn new(title: impl Into<String>, kind: ProposalKind, voting_period: u64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind,
            voting_period,
            quorum_required: None,
            threshold_percentage: None,
            treasury_amount: TokenAmount::ZERO,
            target: None,
            approvers: Vec::new(),
            tags: Vec::new(),
            action: None,
        }
    }
}

/// Proposals keyed by sequential id, plus their vote records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProposalStore {
    proposals: BTreeMap<u64, Proposal>,
    votes: HashMap<(u64, Identity), VoteRecord>,
    /// Voters per proposal in vote order.
    voters: HashMap<u64, Vec<Identity>>,
    next_id: u64,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted proposal will receive. Ids start at 1.
    pub fn next_id(&self) -> u64 {
        self.next_id.max(1)
    }

    pub(crate) fn insert(&mut self, mut proposal: Proposal) -> u64 {
        let id = self.next_id();
        proposal.id = id;
        self.proposals.insert(id, proposal);
        self.next_id = id + 1;
        id
    }

    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    pub fn count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn vote(&self, id: u64, voter: &Identity) -> Option<&VoteRecord> {
        self.votes.get(&(id, voter.clone()))
    }

    pub fn has_voted(&self, id: u64, voter: &Identity) -> bool {
        self.votes.contains_key(&(id, voter.clone()))
    }

    pub fn voters(&self, id: u64) -> &[Identity] {
        self.voters.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn record_vote(&mut self, id: u64, voter: &Identity, record: VoteRecord) {
        self.votes.insert((id, voter.clone()), record);
        self.voters.entry(id).or_default().push(voter.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(yes: u128, no: u128, abstain: u128) -> Proposal {
        Proposal {
            id: 1,
            title: "t".into(),
            description: String::new(),
            kind: ProposalKind::Standard,
            creator: Identity::new("a"),
            yes_votes: yes,
            no_votes: no,
            abstain_votes: abstain,
            created_at: BlockHeight::new(0),
            start_block: BlockHeight::new(144),
            end_block: BlockHeight::new(288),
            execution_block: BlockHeight::new(432),
            quorum_required: 100,
            threshold_percentage: 50,
            active: true,
            executed: false,
            cancelled: false,
            treasury_amount: TokenAmount::ZERO,
            target: None,
            tags: Vec::new(),
            action: None,
        }
    }

    #[test]
    fn test_kind_codes_round_trip() {
        for code in 0..4u8 {
            assert_eq!(ProposalKind::try_from(code).unwrap().code(), code);
        }
        assert!(matches!(
            ProposalKind::try_from(4),
            Err(GovernanceError::InvalidProposalType(4))
        ));
    }

    #[test]
    fn test_unknown_vote_choice_is_invalid_amount() {
        assert_eq!(VoteChoice::try_from(1).unwrap(), VoteChoice::Yes);
        assert!(matches!(
            VoteChoice::try_from(3),
            Err(GovernanceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_percentages_with_no_votes_are_zero() {
        let p = sample(0, 0, 0);
        assert_eq!(p.yes_percentage(), 0);
        assert!(!p.threshold_reached());
        assert!(!p.quorum_reached());
    }

    #[test]
    fn test_abstain_counts_toward_quorum_not_yes() {
        let p = sample(40, 0, 60);
        assert!(p.quorum_reached());
        assert_eq!(p.yes_percentage(), 40);
        assert!(!p.threshold_reached());
    }

    #[test]
    fn test_status_follows_window() {
        let mut p = sample(0, 0, 0);
        assert_eq!(p.status(BlockHeight::new(10)), ProposalStatus::Pending);
        assert_eq!(p.status(BlockHeight::new(144)), ProposalStatus::Active);
        assert_eq!(p.status(BlockHeight::new(288)), ProposalStatus::AwaitingExecution);
        p.executed = true;
        assert_eq!(p.status(BlockHeight::new(288)), ProposalStatus::Executed);
    }

    #[test]
    fn test_store_allocates_sequential_ids() {
        let mut store = ProposalStore::new();
        assert_eq!(store.insert(sample(0, 0, 0)), 1);
        assert_eq!(store.insert(sample(0, 0, 0)), 2);
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(2).unwrap().id, 2);
    }
}
