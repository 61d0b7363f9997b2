//! Single-inbox governance service.
//!
//! One tokio task owns the [`GovernanceEngine`] and its collaborators.
//! Requests arrive on a bounded `mpsc` queue, each carrying a `oneshot`
//! reply, and run one at a time: every request reads the clock once and sees
//! the state left by the previous one.

use std::sync::Arc;

use agora_governance::{
    BlockClock, CallContext, DelegationRequest, ExecutionReceipt, GovernanceEngine,
    GovernanceStats, PendingPayout, ProposalDetails, ProposalDraft, RewardHook, TreasuryLedger,
    VoteChoice, VoteRecord, VoterInfo,
};
use agora_store::MetaStore;
use agora_types::{BlockHeight, Identity, TokenAmount};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info};

use crate::shutdown::ShutdownReason;
use crate::NodeError;

/// Everything a request may touch.
pub struct ServiceCore {
    engine: GovernanceEngine,
    clock: Arc<dyn BlockClock>,
    treasury: Box<dyn TreasuryLedger + Send>,
    hook: Option<Box<dyn RewardHook + Send>>,
    store: Option<Arc<dyn MetaStore + Send + Sync>>,
}

impl ServiceCore {
    fn context(&self, caller: Identity) -> CallContext {
        CallContext {
            caller,
            block: self.clock.current_block(),
        }
    }

    fn persist(&self) -> Result<bool, NodeError> {
        match &self.store {
            Some(store) => {
                self.engine.persist(store.as_ref())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

type Job = Box<dyn FnOnce(&mut ServiceCore) + Send>;

struct Request {
    op: &'static str,
    job: Job,
}

pub struct GovernanceService {
    core: ServiceCore,
    inbox: mpsc::Receiver<Request>,
}

impl GovernanceService {
    pub fn new(
        engine: GovernanceEngine,
        clock: Arc<dyn BlockClock>,
        treasury: Box<dyn TreasuryLedger + Send>,
        capacity: usize,
    ) -> (Self, GovernanceHandle) {
        let (tx, inbox) = mpsc::channel(capacity.max(1));
        let service = Self {
            core: ServiceCore {
                engine,
                clock,
                treasury,
                hook: None,
                store: None,
            },
            inbox,
        };
        (service, GovernanceHandle { tx })
    }

    /// Hand every execution receipt to `hook`.
    pub fn with_reward_hook(mut self, hook: Box<dyn RewardHook + Send>) -> Self {
        self.core.hook = Some(hook);
        self
    }

    /// Persist the engine snapshot to `store` on shutdown and on request.
    pub fn with_store(mut self, store: Arc<dyn MetaStore + Send + Sync>) -> Self {
        self.core.store = Some(store);
        self
    }

    /// Serve requests until shutdown is signalled or every handle is dropped.
    /// Returns the engine in its final state.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<ShutdownReason>,
    ) -> Result<GovernanceEngine, NodeError> {
        info!(block = %self.core.clock.current_block(), "governance service started");
        let mut handled: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                request = self.inbox.recv() => match request {
                    Some(request) => {
                        debug!(op = request.op, "handling request");
                        (request.job)(&mut self.core);
                        handled += 1;
                    }
                    None => break,
                },
            }
        }

        if let Err(e) = self.core.persist() {
            error!(error = %e, "failed to persist governance state on shutdown");
            return Err(e);
        }
        info!(handled, "governance service stopped");
        Ok(self.core.engine)
    }
}

/// Cloneable async front door to a running [`GovernanceService`].
#[derive(Clone)]
pub struct GovernanceHandle {
    tx: mpsc::Sender<Request>,
}

impl GovernanceHandle {
    async fn call<R, F>(&self, op: &'static str, f: F) -> Result<R, NodeError>
    where
        R: Send + 'static,
        F: FnOnce(&mut ServiceCore) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move |core| {
            let _ = reply.send(f(core));
        });
        self.tx
            .send(Request { op, job })
            .await
            .map_err(|_| NodeError::ServiceStopped)?;
        rx.await.map_err(|_| NodeError::ServiceStopped)
    }

    pub async fn current_block(&self) -> Result<BlockHeight, NodeError> {
        self.call("current_block", |core| core.clock.current_block())
            .await
    }

    // ── Power & delegation ───────────────────────────────────────────────

    pub async fn initialize(
        &self,
        caller: Identity,
        voter: Identity,
        power: u128,
        reputation: u64,
    ) -> Result<(), NodeError> {
        Ok(self
            .call("initialize", move |core| {
                let ctx = core.context(caller);
                core.engine.initialize(&ctx, &voter, power, reputation)
            })
            .await??)
    }

    pub async fn stake(&self, caller: Identity, amount: u128) -> Result<u128, NodeError> {
        Ok(self
            .call("stake", move |core| {
                let ctx = core.context(caller);
                core.engine.stake(&ctx, amount)
            })
            .await??)
    }

    pub async fn delegate(
        &self,
        caller: Identity,
        delegate: Identity,
        expiry_block: BlockHeight,
        max_power: u128,
    ) -> Result<u128, NodeError> {
        Ok(self
            .call("delegate", move |core| {
                let ctx = core.context(caller);
                core.engine.delegate(&ctx, &delegate, expiry_block, max_power)
            })
            .await??)
    }

    /// Per-request results; the outer error covers the batch as a whole.
    pub async fn batch_delegate(
        &self,
        caller: Identity,
        requests: Vec<DelegationRequest>,
    ) -> Result<Vec<Result<u128, NodeError>>, NodeError> {
        let results = self
            .call("batch_delegate", move |core| {
                let ctx = core.context(caller);
                core.engine.batch_delegate(&ctx, &requests)
            })
            .await??;
        Ok(results
            .into_iter()
            .map(|r| r.map_err(NodeError::from))
            .collect())
    }

    pub async fn revoke_if_expired(
        &self,
        caller: Identity,
        delegator: Identity,
    ) -> Result<bool, NodeError> {
        Ok(self
            .call("revoke_if_expired", move |core| {
                let ctx = core.context(caller);
                core.engine.revoke_if_expired(&ctx, &delegator)
            })
            .await??)
    }

    pub async fn revoke_expired_delegations(
        &self,
        caller: Identity,
        delegators: Vec<Identity>,
    ) -> Result<usize, NodeError> {
        Ok(self
            .call("revoke_expired_delegations", move |core| {
                let ctx = core.context(caller);
                core.engine.revoke_expired_delegations(&ctx, &delegators)
            })
            .await??)
    }

    // ── Proposals ────────────────────────────────────────────────────────

    pub async fn create_proposal(
        &self,
        caller: Identity,
        draft: ProposalDraft,
    ) -> Result<u64, NodeError> {
        Ok(self
            .call("create_proposal", move |core| {
                let ctx = core.context(caller);
                core.engine.create_proposal(&ctx, draft)
            })
            .await??)
    }

    pub async fn create_proposal_raw(
        &self,
        caller: Identity,
        kind: u8,
        draft: ProposalDraft,
    ) -> Result<u64, NodeError> {
        Ok(self
            .call("create_proposal_raw", move |core| {
                let ctx = core.context(caller);
                core.engine.create_proposal_raw(&ctx, kind, draft)
            })
            .await??)
    }

    pub async fn vote(
        &self,
        caller: Identity,
        proposal_id: u64,
        choice: VoteChoice,
    ) -> Result<u128, NodeError> {
        Ok(self
            .call("vote", move |core| {
                let ctx = core.context(caller);
                core.engine.vote(&ctx, proposal_id, choice)
            })
            .await??)
    }

    pub async fn vote_raw(
        &self,
        caller: Identity,
        proposal_id: u64,
        choice: u8,
    ) -> Result<u128, NodeError> {
        Ok(self
            .call("vote_raw", move |core| {
                let ctx = core.context(caller);
                core.engine.vote_raw(&ctx, proposal_id, choice)
            })
            .await??)
    }

    /// Execute a proposal, passing the receipt to the reward hook when one
    /// is configured.
    pub async fn execute(
        &self,
        caller: Identity,
        proposal_id: u64,
    ) -> Result<ExecutionReceipt, NodeError> {
        Ok(self
            .call("execute", move |core| {
                let ctx = core.context(caller);
                match core.hook.as_mut() {
                    Some(hook) => core.engine.execute_with_hook(&ctx, proposal_id, hook.as_mut()),
                    None => core.engine.execute(&ctx, proposal_id),
                }
            })
            .await??)
    }

    pub async fn emergency_cancel(
        &self,
        caller: Identity,
        proposal_id: u64,
    ) -> Result<(), NodeError> {
        Ok(self
            .call("emergency_cancel", move |core| {
                let ctx = core.context(caller);
                core.engine.emergency_cancel(&ctx, proposal_id)
            })
            .await??)
    }

    pub async fn multi_sig_approve(
        &self,
        caller: Identity,
        proposal_id: u64,
    ) -> Result<usize, NodeError> {
        Ok(self
            .call("multi_sig_approve", move |core| {
                let ctx = core.context(caller);
                core.engine.multi_sig_approve(&ctx, proposal_id)
            })
            .await??)
    }

    // ── Treasury ─────────────────────────────────────────────────────────

    pub async fn deposit_to_treasury(
        &self,
        caller: Identity,
        amount: TokenAmount,
    ) -> Result<TokenAmount, NodeError> {
        Ok(self
            .call("deposit_to_treasury", move |core| {
                let ctx = core.context(caller);
                core.engine
                    .deposit_to_treasury(&ctx, amount, core.treasury.as_mut())
            })
            .await??)
    }

    pub async fn claim_payout(
        &self,
        caller: Identity,
        proposal_id: u64,
    ) -> Result<TokenAmount, NodeError> {
        Ok(self
            .call("claim_payout", move |core| {
                let ctx = core.context(caller);
                core.engine
                    .claim_payout(&ctx, proposal_id, core.treasury.as_mut())
            })
            .await??)
    }

    pub async fn treasury_balance_of(&self, account: Identity) -> Result<TokenAmount, NodeError> {
        self.call("treasury_balance_of", move |core| {
            core.treasury.balance_of(&account)
        })
        .await
    }

    // ── Admin ────────────────────────────────────────────────────────────

    pub async fn set_veto_council(
        &self,
        caller: Identity,
        members: Vec<Identity>,
    ) -> Result<(), NodeError> {
        Ok(self
            .call("set_veto_council", move |core| {
                let ctx = core.context(caller);
                core.engine.set_veto_council(&ctx, members)
            })
            .await??)
    }

    pub async fn update_parameter(
        &self,
        caller: Identity,
        key: String,
        value: u128,
    ) -> Result<(), NodeError> {
        Ok(self
            .call("update_parameter", move |core| {
                let ctx = core.context(caller);
                core.engine.update_parameter(&ctx, &key, value)
            })
            .await??)
    }

    pub async fn transfer_ownership(
        &self,
        caller: Identity,
        new_owner: Identity,
    ) -> Result<(), NodeError> {
        Ok(self
            .call("transfer_ownership", move |core| {
                let ctx = core.context(caller);
                core.engine.transfer_ownership(&ctx, new_owner)
            })
            .await??)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub async fn voter_info(&self, identity: Identity) -> Result<VoterInfo, NodeError> {
        self.call("voter_info", move |core| core.engine.voter_info(&identity))
            .await
    }

    /// Details as of the current block.
    pub async fn proposal_details(
        &self,
        proposal_id: u64,
    ) -> Result<Option<ProposalDetails>, NodeError> {
        self.call("proposal_details", move |core| {
            let now = core.clock.current_block();
            core.engine.proposal_details(proposal_id, now)
        })
        .await
    }

    pub async fn stats(&self) -> Result<GovernanceStats, NodeError> {
        self.call("stats", |core| core.engine.stats()).await
    }

    pub async fn veto_council(&self) -> Result<Vec<Identity>, NodeError> {
        self.call("veto_council", |core| core.engine.veto_council().to_vec())
            .await
    }

    pub async fn pending_payout(&self, proposal_id: u64) -> Result<Option<PendingPayout>, NodeError> {
        self.call("pending_payout", move |core| {
            core.engine.pending_payout(proposal_id).cloned()
        })
        .await
    }

    pub async fn get_vote(
        &self,
        proposal_id: u64,
        voter: Identity,
    ) -> Result<Option<VoteRecord>, NodeError> {
        self.call("get_vote", move |core| {
            core.engine.get_vote(proposal_id, &voter).cloned()
        })
        .await
    }

    pub async fn power_at(&self, identity: Identity, block: BlockHeight) -> Result<u128, NodeError> {
        self.call("power_at", move |core| core.engine.power_at(&identity, block))
            .await
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Encoded snapshot of the current state.
    pub async fn snapshot(&self) -> Result<Vec<u8>, NodeError> {
        Ok(self.call("snapshot", |core| core.engine.save_state()).await??)
    }

    /// Persist now. Returns `false` when no store is configured.
    pub async fn persist(&self) -> Result<bool, NodeError> {
        self.call("persist", |core| core.persist()).await?
    }
}
