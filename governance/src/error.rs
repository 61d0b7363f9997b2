use agora_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("caller is not authorized for this operation")]
    NotAuthorized,

    #[error("invalid amount or argument: {0}")]
    InvalidAmount(String),

    #[error("insufficient voting power: have {have}, need {need}")]
    InsufficientPower { have: u128, need: u128 },

    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("voting is closed for proposal {0}")]
    VotingClosed(u64),

    #[error("{0} has already voted or approved on this proposal")]
    AlreadyVoted(String),

    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("unknown proposal type code {0}")]
    InvalidProposalType(u8),

    #[error("quorum not met: {have} < {need}")]
    QuorumNotMet { have: u128, need: u128 },

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("delegation limit exceeded: {0}")]
    DelegationLimitExceeded(String),

    #[error("voting has not started: opens at block {starts_at}")]
    VotingNotStarted { starts_at: u64 },

    #[error("timelock not satisfied: {0}")]
    InvalidTimelock(String),

    #[error("proposal {0} has already been executed")]
    ProposalAlreadyExecuted(u64),

    #[error("insufficient reputation: have {have}, need {need}")]
    InsufficientReputation { have: u64, need: u64 },

    #[error("power history for {0} is full")]
    HistoryFull(String),

    #[error("{0} is already initialized")]
    AlreadyInitialized(String),

    #[error("{0} already has an active delegation")]
    DelegationExists(String),

    #[error("too many {what}: at most {max} allowed")]
    TooManyEntries { what: &'static str, max: usize },

    #[error("unknown governance parameter {0:?}")]
    UnknownParameter(String),

    #[error("insufficient treasury funds: have {have}, need {need}")]
    InsufficientFunds { have: u128, need: u128 },

    #[error("payout for proposal {0} has already been claimed")]
    PayoutAlreadyClaimed(u64),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("treasury ledger error: {0}")]
    Treasury(String),

    #[error("reward hook failed: {0}")]
    RewardHook(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Payload-free classification of a [`GovernanceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAuthorized,
    InvalidAmount,
    InsufficientPower,
    ProposalNotFound,
    VotingClosed,
    AlreadyVoted,
    SelfDelegation,
    InvalidProposalType,
    QuorumNotMet,
    InvalidThreshold,
    DelegationLimitExceeded,
    VotingNotStarted,
    InvalidTimelock,
    ProposalAlreadyExecuted,
    InsufficientReputation,
    HistoryFull,
    AlreadyInitialized,
    DelegationExists,
    TooManyEntries,
    UnknownParameter,
    InsufficientFunds,
    PayoutAlreadyClaimed,
    ArithmeticOverflow,
    Treasury,
    RewardHook,
    Serialization,
    Store,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthorized => ErrorKind::NotAuthorized,
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::InsufficientPower { .. } => ErrorKind::InsufficientPower,
            Self::ProposalNotFound(_) => ErrorKind::ProposalNotFound,
            Self::VotingClosed(_) => ErrorKind::VotingClosed,
            Self::AlreadyVoted(_) => ErrorKind::AlreadyVoted,
            Self::SelfDelegation => ErrorKind::SelfDelegation,
            Self::InvalidProposalType(_) => ErrorKind::InvalidProposalType,
            Self::QuorumNotMet { .. } => ErrorKind::QuorumNotMet,
            Self::InvalidThreshold(_) => ErrorKind::InvalidThreshold,
            Self::DelegationLimitExceeded(_) => ErrorKind::DelegationLimitExceeded,
            Self::VotingNotStarted { .. } => ErrorKind::VotingNotStarted,
            Self::InvalidTimelock(_) => ErrorKind::InvalidTimelock,
            Self::ProposalAlreadyExecuted(_) => ErrorKind::ProposalAlreadyExecuted,
            Self::InsufficientReputation { .. } => ErrorKind::InsufficientReputation,
            Self::HistoryFull(_) => ErrorKind::HistoryFull,
            Self::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            Self::DelegationExists(_) => ErrorKind::DelegationExists,
            Self::TooManyEntries { .. } => ErrorKind::TooManyEntries,
            Self::UnknownParameter(_) => ErrorKind::UnknownParameter,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::PayoutAlreadyClaimed(_) => ErrorKind::PayoutAlreadyClaimed,
            Self::ArithmeticOverflow(_) => ErrorKind::ArithmeticOverflow,
            Self::Treasury(_) => ErrorKind::Treasury,
            Self::RewardHook(_) => ErrorKind::RewardHook,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}
