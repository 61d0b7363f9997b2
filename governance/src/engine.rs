//! Core governance engine — every externally visible operation.
//!
//! Each operation runs to completion against the whole [`GovernanceState`]
//! and checks all of its preconditions before the first write, so a failed
//! call leaves no partial state behind.

use crate::delegation::DelegationRequest;
use crate::error::GovernanceError;
use crate::gate::{has_duplicates, Capability};
use crate::host::{CallContext, ExecutionReceipt, RewardHook, TreasuryLedger};
use crate::params::GovernableParam;
use crate::proposal::{
    Proposal, ProposalAction, ProposalDraft, ProposalKind, VoteChoice, VoteRecord, MAX_APPROVERS,
    MAX_DESCRIPTION_LEN, MAX_TAGS, MAX_TAG_LEN, MAX_TITLE_LEN, MAX_VOTING_PERIOD,
    MIN_PROPOSER_REPUTATION, MIN_VOTING_PERIOD, ONBOARDING_DELAY,
};
use crate::state::{self, GovernanceState};
use crate::treasury::PendingPayout;
use agora_store::MetaStore;
use agora_types::{BlockHeight, GovernanceParams, Identity, TokenAmount};
use tracing::{debug, info, warn};

/// Maximum items accepted by a batch operation.
pub const MAX_BATCH: usize = 10;

/// Meta-store key under which the engine snapshot is persisted.
pub const STATE_META_KEY: &str = "governance_state";

#[derive(Debug)]
pub struct GovernanceEngine {
    state: GovernanceState,
}

impl GovernanceEngine {
    pub fn new(
        owner: Identity,
        custody_account: Identity,
        params: GovernanceParams,
    ) -> Result<Self, GovernanceError> {
        params
            .validate()
            .map_err(|e| GovernanceError::InvalidAmount(e.to_string()))?;
        Ok(Self {
            state: GovernanceState::new(owner, custody_account, params),
        })
    }

    pub fn from_state(state: GovernanceState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn owner(&self) -> &Identity {
        &self.state.owner
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.state.params
    }

    fn require(&self, ctx: &CallContext, capability: Capability) -> Result<(), GovernanceError> {
        let allowed = match capability {
            Capability::Owner => ctx.caller == self.state.owner,
            Capability::VetoCouncil => self.state.veto.is_member(&ctx.caller),
            Capability::Approver(id) => self.state.multisig.is_approver(id, &ctx.caller),
        };
        if allowed {
            Ok(())
        } else {
            Err(GovernanceError::NotAuthorized)
        }
    }

    // ── Power ledger ─────────────────────────────────────────────────────

    /// Grant initial power and reputation to a new voter. Owner only.
    pub fn initialize(
        &mut self,
        ctx: &CallContext,
        voter: &Identity,
        power: u128,
        reputation: u64,
    ) -> Result<(), GovernanceError> {
        self.require(ctx, Capability::Owner)?;
        self.state.ledger.initialize(voter, power, ctx.block)?;
        self.state.reputation.initialize(voter, reputation);
        info!(%voter, power, reputation, "voter initialized");
        Ok(())
    }

    /// Add to the caller's current power. Returns the new power.
    pub fn stake(&mut self, ctx: &CallContext, amount: u128) -> Result<u128, GovernanceError> {
        let power = self.state.ledger.stake(&ctx.caller, amount, ctx.block)?;
        debug!(caller = %ctx.caller, amount, power, "stake accepted");
        Ok(power)
    }

    /// Current power of `identity`; 0 when unknown.
    pub fn get_power(&self, identity: &Identity) -> u128 {
        self.state.ledger.power(identity)
    }

    // ── Delegation ───────────────────────────────────────────────────────

    /// Delegate the caller's entire current power to `delegate` until
    /// `expiry_block`. Returns the amount moved.
    pub fn delegate(
        &mut self,
        ctx: &CallContext,
        delegate: &Identity,
        expiry_block: BlockHeight,
        max_power: u128,
    ) -> Result<u128, GovernanceError> {
        let request = DelegationRequest {
            delegator: ctx.caller.clone(),
            delegate: delegate.clone(),
            expiry_block,
            max_power,
        };
        self.apply_delegation(&request, ctx.block)
    }

    fn apply_delegation(
        &mut self,
        request: &DelegationRequest,
        now: BlockHeight,
    ) -> Result<u128, GovernanceError> {
        let amount = self
            .state
            .delegations
            .delegate(&mut self.state.ledger, request, now)?;
        debug!(
            delegator = %request.delegator,
            delegate = %request.delegate,
            amount,
            expiry = %request.expiry_block,
            "delegation created"
        );
        Ok(amount)
    }

    /// Create several delegations on behalf of their delegators. Owner only.
    ///
    /// Each request is validated and applied on its own; one failure does
    /// not affect the others.
    pub fn batch_delegate(
        &mut self,
        ctx: &CallContext,
        requests: &[DelegationRequest],
    ) -> Result<Vec<Result<u128, GovernanceError>>, GovernanceError> {
        self.require(ctx, Capability::Owner)?;
        if requests.len() > MAX_BATCH {
            return Err(GovernanceError::TooManyEntries {
                what: "delegation requests",
                max: MAX_BATCH,
            });
        }
        Ok(requests
            .iter()
            .map(|request| self.apply_delegation(request, ctx.block))
            .collect())
    }

    /// Revoke `delegator`'s edge if it has expired. Anyone may call this.
    pub fn revoke_if_expired(
        &mut self,
        ctx: &CallContext,
        delegator: &Identity,
    ) -> Result<bool, GovernanceError> {
        match self
            .state
            .delegations
            .revoke_if_expired(&mut self.state.ledger, delegator, ctx.block)?
        {
            Some(edge) => {
                info!(
                    %delegator,
                    delegate = %edge.delegate,
                    amount = edge.amount,
                    "expired delegation revoked"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Revoke every expired edge among `delegators`. Returns how many were revoked.
    pub fn revoke_expired_delegations(
        &mut self,
        ctx: &CallContext,
        delegators: &[Identity],
    ) -> Result<usize, GovernanceError> {
        if delegators.len() > MAX_BATCH {
            return Err(GovernanceError::TooManyEntries {
                what: "delegators",
                max: MAX_BATCH,
            });
        }
        let mut revoked = 0;
        for delegator in delegators {
            match self.revoke_if_expired(ctx, delegator) {
                Ok(true) => revoked += 1,
                Ok(false) => {}
                Err(e) => warn!(%delegator, error = %e, "revocation failed"),
            }
        }
        Ok(revoked)
    }

    // ── Proposals ────────────────────────────────────────────────────────

    fn check_proposer(&self, creator: &Identity) -> Result<(), GovernanceError> {
        let have = self.state.ledger.power(creator);
        let need = self.state.params.proposal_threshold;
        if have < need {
            return Err(GovernanceError::InsufficientPower { have, need });
        }
        let reputation = self.state.reputation.score(creator);
        if reputation < MIN_PROPOSER_REPUTATION {
            return Err(GovernanceError::InsufficientReputation {
                have: reputation,
                need: MIN_PROPOSER_REPUTATION,
            });
        }
        Ok(())
    }

    /// Open a new proposal. Returns its id.
    pub fn create_proposal(
        &mut self,
        ctx: &CallContext,
        draft: ProposalDraft,
    ) -> Result<u64, GovernanceError> {
        self.check_proposer(&ctx.caller)?;

        if !(MIN_VOTING_PERIOD..=MAX_VOTING_PERIOD).contains(&draft.voting_period) {
            return Err(GovernanceError::InvalidAmount(format!(
                "voting period {} outside {MIN_VOTING_PERIOD}..={MAX_VOTING_PERIOD}",
                draft.voting_period
            )));
        }
        let threshold = draft
            .threshold_percentage
            .unwrap_or(self.state.params.default_threshold);
        if !(1..=100).contains(&threshold) {
            return Err(GovernanceError::InvalidThreshold(format!(
                "{threshold} is outside 1..=100"
            )));
        }
        validate_draft(&draft)?;

        let start_block = ctx
            .block
            .checked_add(ONBOARDING_DELAY)
            .ok_or(GovernanceError::ArithmeticOverflow("start block"))?;
        let end_block = start_block
            .checked_add(draft.voting_period)
            .ok_or(GovernanceError::ArithmeticOverflow("end block"))?;
        let execution_block = end_block
            .checked_add(self.state.params.execution_delay)
            .ok_or(GovernanceError::ArithmeticOverflow("execution block"))?;

        let proposal = Proposal {
            id: 0,
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            creator: ctx.caller.clone(),
            yes_votes: 0,
            no_votes: 0,
            abstain_votes: 0,
            created_at: ctx.block,
            start_block,
            end_block,
            execution_block,
            quorum_required: draft
                .quorum_required
                .unwrap_or(self.state.params.default_quorum),
            threshold_percentage: threshold,
            active: true,
            executed: false,
            cancelled: false,
            treasury_amount: draft.treasury_amount,
            target: draft.target,
            tags: draft.tags,
            action: draft.action,
        };
        let id = self.state.proposals.insert(proposal);
        self.state.multisig.register(id, draft.approvers);

        info!(
            id,
            creator = %ctx.caller,
            kind = ?draft.kind,
            start = %start_block,
            end = %end_block,
            execution = %execution_block,
            "proposal created"
        );
        Ok(id)
    }

    /// Like [`create_proposal`](Self::create_proposal), with the kind given
    /// as its wire code. The code is checked after the creator checks.
    pub fn create_proposal_raw(
        &mut self,
        ctx: &CallContext,
        kind: u8,
        mut draft: ProposalDraft,
    ) -> Result<u64, GovernanceError> {
        self.check_proposer(&ctx.caller)?;
        draft.kind = ProposalKind::try_from(kind)?;
        self.create_proposal(ctx, draft)
    }

    // ── Voting ───────────────────────────────────────────────────────────

    /// Checks every vote precondition except the choice. Returns the voter's power.
    fn check_vote(&self, ctx: &CallContext, id: u64) -> Result<u128, GovernanceError> {
        let proposal = self
            .state
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if !proposal.active {
            return Err(GovernanceError::VotingClosed(id));
        }
        if ctx.block < proposal.start_block {
            return Err(GovernanceError::VotingNotStarted {
                starts_at: proposal.start_block.as_u64(),
            });
        }
        if ctx.block >= proposal.end_block {
            return Err(GovernanceError::VotingClosed(id));
        }
        if self.state.proposals.has_voted(id, &ctx.caller) {
            return Err(GovernanceError::AlreadyVoted(ctx.caller.to_string()));
        }
        let power = self.state.ledger.power(&ctx.caller);
        if power == 0 {
            return Err(GovernanceError::InsufficientPower { have: 0, need: 1 });
        }
        Ok(power)
    }

    /// Cast the caller's vote. Returns the effective power counted.
    pub fn vote(
        &mut self,
        ctx: &CallContext,
        id: u64,
        choice: VoteChoice,
    ) -> Result<u128, GovernanceError> {
        let power = self.check_vote(ctx, id)?;
        self.apply_vote(ctx, id, power, choice)
    }

    /// Cast a vote given as its wire code (0 no, 1 yes, 2 abstain).
    pub fn vote_raw(
        &mut self,
        ctx: &CallContext,
        id: u64,
        choice: u8,
    ) -> Result<u128, GovernanceError> {
        let power = self.check_vote(ctx, id)?;
        let choice = VoteChoice::try_from(choice)?;
        self.apply_vote(ctx, id, power, choice)
    }

    fn apply_vote(
        &mut self,
        ctx: &CallContext,
        id: u64,
        power: u128,
        choice: VoteChoice,
    ) -> Result<u128, GovernanceError> {
        let reputation = self.state.reputation.get(&ctx.caller);
        let effective = power
            .checked_add(reputation.vote_bonus())
            .ok_or(GovernanceError::ArithmeticOverflow("effective power"))?;

        let proposal = self
            .state
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        let tally = match choice {
            VoteChoice::Yes => &mut proposal.yes_votes,
            VoteChoice::No => &mut proposal.no_votes,
            VoteChoice::Abstain => &mut proposal.abstain_votes,
        };
        *tally = tally
            .checked_add(effective)
            .ok_or(GovernanceError::ArithmeticOverflow("vote tally"))?;

        self.state.proposals.record_vote(
            id,
            &ctx.caller,
            VoteRecord {
                choice,
                effective_power: effective,
                block: ctx.block,
                reputation_at_vote: reputation.score,
            },
        );
        self.state.reputation.record_vote(&ctx.caller);

        debug!(id, voter = %ctx.caller, ?choice, effective, "vote cast");
        Ok(effective)
    }

    // ── Execution & cancellation ─────────────────────────────────────────

    /// Execute a proposal whose timelock has passed and whose quorum,
    /// threshold and multi-sig conditions hold. Irreversible.
    pub fn execute(
        &mut self,
        ctx: &CallContext,
        id: u64,
    ) -> Result<ExecutionReceipt, GovernanceError> {
        let proposal = self
            .state
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if proposal.executed {
            return Err(GovernanceError::ProposalAlreadyExecuted(id));
        }
        if proposal.cancelled {
            return Err(GovernanceError::VotingClosed(id));
        }
        if ctx.block < proposal.execution_block {
            return Err(GovernanceError::InvalidTimelock(format!(
                "proposal {id} executable from {}, now {}",
                proposal.execution_block, ctx.block
            )));
        }
        if !proposal.quorum_reached() {
            return Err(GovernanceError::QuorumNotMet {
                have: proposal.total_votes(),
                need: proposal.quorum_required,
            });
        }
        if !proposal.threshold_reached() {
            return Err(GovernanceError::InvalidThreshold(format!(
                "{}% yes is below the required {}%",
                proposal.yes_percentage(),
                proposal.threshold_percentage
            )));
        }
        if !self.state.multisig.is_satisfied(id) {
            return Err(GovernanceError::NotAuthorized);
        }

        let mut params = self.state.params.clone();
        if let Some(ProposalAction::UpdateParameter { param, value }) = &proposal.action {
            param.apply(&mut params, *value)?;
        }
        let payout = (!proposal.treasury_amount.is_zero()).then(|| PendingPayout {
            proposal_id: id,
            recipient: proposal.creator.clone(),
            amount: proposal.treasury_amount,
            claimed: false,
        });
        let kind = proposal.kind;

        if let Some(proposal) = self.state.proposals.get_mut(id) {
            proposal.executed = true;
            proposal.active = false;
        }
        if params != self.state.params {
            info!(id, ?params, "parameters updated by proposal");
            self.state.params = params;
        }
        if let Some(payout) = &payout {
            self.state.treasury.record_payout(payout.clone());
        }

        info!(id, ?kind, at = %ctx.block, "proposal executed");
        Ok(ExecutionReceipt {
            proposal_id: id,
            kind,
            executed_at: ctx.block,
            payout,
            participants: self.state.proposals.voters(id).to_vec(),
        })
    }

    /// Execute, then hand the receipt to `hook`.
    ///
    /// The execution is committed before the hook runs; a hook failure is
    /// reported as [`GovernanceError::RewardHook`] but does not undo it.
    pub fn execute_with_hook(
        &mut self,
        ctx: &CallContext,
        id: u64,
        hook: &mut dyn RewardHook,
    ) -> Result<ExecutionReceipt, GovernanceError> {
        let receipt = self.execute(ctx, id)?;
        if let Err(e) = hook.on_executed(&receipt) {
            warn!(id, error = %e, "reward hook failed after execution");
            return Err(GovernanceError::RewardHook(e.to_string()));
        }
        Ok(receipt)
    }

    /// Cancel an active proposal. Veto council only. Irreversible.
    pub fn emergency_cancel(&mut self, ctx: &CallContext, id: u64) -> Result<(), GovernanceError> {
        self.require(ctx, Capability::VetoCouncil)?;
        let proposal = self
            .state
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if !proposal.active {
            return Err(GovernanceError::VotingClosed(id));
        }
        proposal.cancelled = true;
        proposal.active = false;
        info!(id, by = %ctx.caller, "proposal cancelled by veto council");
        Ok(())
    }

    /// Record the caller's approval on a gated proposal. Returns the
    /// approval count.
    pub fn multi_sig_approve(
        &mut self,
        ctx: &CallContext,
        id: u64,
    ) -> Result<usize, GovernanceError> {
        let proposal = self
            .state
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        self.require(ctx, Capability::Approver(id))?;
        if proposal.executed || proposal.cancelled {
            return Err(GovernanceError::VotingClosed(id));
        }
        let count = self.state.multisig.approve(id, &ctx.caller)?;
        debug!(id, approver = %ctx.caller, count, "multi-sig approval recorded");
        Ok(count)
    }

    // ── Treasury ─────────────────────────────────────────────────────────

    /// Move `amount` from the caller into the engine's custody account.
    /// Returns the new custody balance.
    pub fn deposit_to_treasury(
        &mut self,
        ctx: &CallContext,
        amount: TokenAmount,
        ledger: &mut dyn TreasuryLedger,
    ) -> Result<TokenAmount, GovernanceError> {
        if amount.is_zero() {
            return Err(GovernanceError::InvalidAmount(
                "deposit must be non-zero".into(),
            ));
        }
        let available = ledger.balance_of(&ctx.caller);
        if available < amount {
            return Err(GovernanceError::InsufficientFunds {
                have: available.raw(),
                need: amount.raw(),
            });
        }
        self.state
            .treasury
            .balance()
            .checked_add(amount)
            .ok_or(GovernanceError::ArithmeticOverflow("treasury balance"))?;

        let custody = self.state.treasury.custody_account().clone();
        ledger.transfer(&ctx.caller, &custody, amount)?;
        self.state.treasury.credit(amount)?;

        info!(from = %ctx.caller, %amount, "treasury deposit");
        Ok(self.state.treasury.balance())
    }

    /// Pay out the recorded amount of an executed funded proposal to its
    /// recipient. Only the recipient may claim, once.
    pub fn claim_payout(
        &mut self,
        ctx: &CallContext,
        id: u64,
        ledger: &mut dyn TreasuryLedger,
    ) -> Result<TokenAmount, GovernanceError> {
        let payout = self
            .state
            .treasury
            .payout(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if payout.recipient != ctx.caller {
            return Err(GovernanceError::NotAuthorized);
        }
        if payout.claimed {
            return Err(GovernanceError::PayoutAlreadyClaimed(id));
        }
        let balance = self.state.treasury.balance();
        if balance < payout.amount {
            return Err(GovernanceError::InsufficientFunds {
                have: balance.raw(),
                need: payout.amount.raw(),
            });
        }
        let amount = payout.amount;
        let recipient = payout.recipient.clone();
        let custody = self.state.treasury.custody_account().clone();

        ledger.transfer(&custody, &recipient, amount)?;
        self.state.treasury.settle(id)?;

        info!(id, %recipient, %amount, "treasury payout claimed");
        Ok(amount)
    }

    // ── Admin ────────────────────────────────────────────────────────────

    /// Replace the veto council. Owner only.
    pub fn set_veto_council(
        &mut self,
        ctx: &CallContext,
        members: Vec<Identity>,
    ) -> Result<(), GovernanceError> {
        self.require(ctx, Capability::Owner)?;
        self.state.veto.set_members(members)?;
        info!(members = ?self.state.veto.members(), "veto council updated");
        Ok(())
    }

    /// Update a named governance parameter. Owner only.
    pub fn update_parameter(
        &mut self,
        ctx: &CallContext,
        key: &str,
        value: u128,
    ) -> Result<(), GovernanceError> {
        self.require(ctx, Capability::Owner)?;
        let param: GovernableParam = key.parse()?;
        param.apply(&mut self.state.params, value)?;
        info!(param = param.name(), value, "governance parameter updated");
        Ok(())
    }

    /// Hand the owner role to another identity. Owner only.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Identity,
    ) -> Result<(), GovernanceError> {
        self.require(ctx, Capability::Owner)?;
        info!(from = %self.state.owner, to = %new_owner, "ownership transferred");
        self.state.owner = new_owner;
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Serialize the full state to bytes.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        state::encode(&self.state)
    }

    /// Restore an engine from bytes produced by [`save_state`](Self::save_state).
    pub fn load_state(data: &[u8]) -> Result<Self, GovernanceError> {
        Ok(Self::from_state(state::decode(data)?))
    }

    /// Write the snapshot to `store` under [`STATE_META_KEY`].
    pub fn persist(&self, store: &dyn MetaStore) -> Result<(), GovernanceError> {
        let bytes = self.save_state()?;
        store.put_meta(STATE_META_KEY, &bytes)?;
        store.set_schema_version(state::SNAPSHOT_VERSION)?;
        debug!(bytes = bytes.len(), "governance state persisted");
        Ok(())
    }

    /// Load the snapshot from `store`, if one was persisted.
    pub fn restore(store: &dyn MetaStore) -> Result<Option<Self>, GovernanceError> {
        match store.try_get_meta(STATE_META_KEY)? {
            Some(bytes) => Ok(Some(Self::load_state(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Shape checks on a draft that do not depend on engine state.
fn validate_draft(draft: &ProposalDraft) -> Result<(), GovernanceError> {
    if draft.title.trim().is_empty() || draft.title.len() > MAX_TITLE_LEN {
        return Err(GovernanceError::InvalidAmount(format!(
            "title must be 1..={MAX_TITLE_LEN} bytes"
        )));
    }
    if draft.description.len() > MAX_DESCRIPTION_LEN {
        return Err(GovernanceError::InvalidAmount(format!(
            "description exceeds {MAX_DESCRIPTION_LEN} bytes"
        )));
    }
    if draft.approvers.len() > MAX_APPROVERS {
        return Err(GovernanceError::TooManyEntries {
            what: "approvers",
            max: MAX_APPROVERS,
        });
    }
    if has_duplicates(&draft.approvers) {
        return Err(GovernanceError::InvalidAmount("duplicate approver".into()));
    }
    if draft.tags.len() > MAX_TAGS {
        return Err(GovernanceError::TooManyEntries {
            what: "tags",
            max: MAX_TAGS,
        });
    }
    if draft
        .tags
        .iter()
        .any(|t| t.is_empty() || t.len() > MAX_TAG_LEN)
    {
        return Err(GovernanceError::InvalidAmount(format!(
            "tags must be 1..={MAX_TAG_LEN} bytes"
        )));
    }
    match (draft.kind, draft.treasury_amount.is_zero()) {
        (ProposalKind::Treasury, true) => {
            return Err(GovernanceError::InvalidAmount(
                "treasury proposal must request funds".into(),
            ))
        }
        (ProposalKind::Treasury, false) | (_, true) => {}
        (_, false) => {
            return Err(GovernanceError::InvalidAmount(
                "only treasury proposals may request funds".into(),
            ))
        }
    }
    if let Some(ProposalAction::UpdateParameter { param, value }) = &draft.action {
        param.validate(*value)?;
    }
    Ok(())
}
