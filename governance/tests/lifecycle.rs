//! End-to-end scenarios driving the engine through full proposal lifecycles
//! with the nullable clock, treasury, reward hook and store.

use agora_governance::{
    CallContext, DelegationRequest, ErrorKind, GovernableParam, GovernanceEngine,
    GovernanceError, ProposalAction, ProposalDraft, ProposalKind, ProposalStatus, TreasuryLedger,
    VoteChoice,
};
use agora_nullables::{NullClock, NullRewardHook, NullStore, NullTreasury};
use agora_types::{BlockHeight, GovernanceParams, Identity, TokenAmount};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn id(name: &str) -> Identity {
    Identity::new(name)
}

fn at(caller: &str, clock: &NullClock) -> CallContext {
    CallContext::new(caller, clock.now())
}

/// Engine with alice (1000 power, rep 60), bob (400, rep 10) and carol
/// (200, rep 0). Owner "gov", custody account "vault".
fn setup() -> (GovernanceEngine, NullClock) {
    let clock = NullClock::new(0);
    let mut engine =
        GovernanceEngine::new(id("gov"), id("vault"), GovernanceParams::default()).unwrap();
    let owner = at("gov", &clock);
    engine.initialize(&owner, &id("alice"), 1_000, 60).unwrap();
    engine.initialize(&owner, &id("bob"), 400, 10).unwrap();
    engine.initialize(&owner, &id("carol"), 200, 0).unwrap();
    (engine, clock)
}

fn draft(title: &str, quorum: u128, threshold: u8, period: u64) -> ProposalDraft {
    let mut draft = ProposalDraft::new(title, ProposalKind::Standard, period);
    draft.quorum_required = Some(quorum);
    draft.threshold_percentage = Some(threshold);
    draft
}

// ---------------------------------------------------------------------------
// 1. Proposal lifecycle
// ---------------------------------------------------------------------------

#[test]
fn single_voter_passes_proposal_after_timelock() {
    let (mut engine, clock) = setup();
    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Fund docs", 500, 50, 1_440))
        .unwrap();
    assert_eq!(pid, 1);

    let proposal = engine.proposal(pid).unwrap().clone();
    assert_eq!(proposal.start_block, BlockHeight::new(144));
    assert_eq!(proposal.end_block, BlockHeight::new(1_584));
    assert_eq!(proposal.execution_block, BlockHeight::new(1_728));

    clock.set(144);
    let effective = engine
        .vote(&at("alice", &clock), pid, VoteChoice::Yes)
        .unwrap();
    assert_eq!(effective, 1_006);
    assert_eq!(engine.proposal(pid).unwrap().yes_votes, 1_006);

    let vote = engine.get_vote(pid, &id("alice")).unwrap();
    assert_eq!(vote.reputation_at_vote, 60);
    assert_eq!(engine.voter_info(&id("alice")).reputation, 65);

    clock.set(1_727);
    let err = engine.execute(&at("bob", &clock), pid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTimelock);

    clock.set(1_728);
    let receipt = engine.execute(&at("bob", &clock), pid).unwrap();
    assert_eq!(receipt.proposal_id, pid);
    assert_eq!(receipt.participants, vec![id("alice")]);
    assert!(receipt.payout.is_none());

    let proposal = engine.proposal(pid).unwrap();
    assert!(proposal.executed);
    assert!(!proposal.active);
    assert_eq!(proposal.status(clock.now()), ProposalStatus::Executed);

    let err = engine.execute(&at("bob", &clock), pid).unwrap_err();
    assert!(matches!(err, GovernanceError::ProposalAlreadyExecuted(1)));
}

#[test]
fn voting_window_is_half_open() {
    let (mut engine, clock) = setup();
    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Window", 100, 50, 144))
        .unwrap();

    clock.set(143);
    let err = engine.vote(&at("bob", &clock), pid, VoteChoice::Yes).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingNotStarted { starts_at: 144 }));

    clock.set(287);
    engine.vote(&at("bob", &clock), pid, VoteChoice::No).unwrap();

    clock.set(288);
    let err = engine.vote(&at("carol", &clock), pid, VoteChoice::Yes).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
}

#[test]
fn second_vote_rejected_and_tally_unchanged() {
    let (mut engine, clock) = setup();
    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Once", 100, 50, 144))
        .unwrap();
    clock.set(150);
    engine.vote(&at("bob", &clock), pid, VoteChoice::Abstain).unwrap();
    let err = engine.vote(&at("bob", &clock), pid, VoteChoice::Yes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyVoted);

    let proposal = engine.proposal(pid).unwrap();
    assert_eq!(proposal.abstain_votes, 401);
    assert_eq!(proposal.yes_votes, 0);
}

#[test]
fn raw_codes_are_validated_after_state_checks() {
    let (mut engine, clock) = setup();
    let err = engine
        .create_proposal_raw(&at("alice", &clock), 9, draft("Bad", 1, 50, 144))
        .unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidProposalType(9)));

    // Creator checks come first.
    let err = engine
        .create_proposal_raw(&at("carol", &clock), 9, draft("Bad", 1, 50, 144))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientReputation);

    let pid = engine
        .create_proposal_raw(&at("alice", &clock), 2, draft("Urgent", 1, 50, 144))
        .unwrap();
    assert_eq!(engine.proposal(pid).unwrap().kind, ProposalKind::Emergency);

    clock.set(144);
    let err = engine.vote_raw(&at("bob", &clock), pid, 7).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    assert!(engine.get_vote(pid, &id("bob")).is_none());
    engine.vote_raw(&at("bob", &clock), pid, 0).unwrap();
    assert_eq!(engine.proposal(pid).unwrap().no_votes, 401);
}

#[test]
fn creation_preconditions() {
    let (mut engine, clock) = setup();

    // bob has power but only 10 reputation.
    let err = engine
        .create_proposal(&at("bob", &clock), draft("x", 1, 50, 144))
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::InsufficientReputation { have: 10, need: 50 }
    ));

    let err = engine
        .create_proposal(&at("nobody", &clock), draft("x", 1, 50, 144))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientPower);

    let err = engine
        .create_proposal(&at("alice", &clock), draft("x", 1, 50, 143))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);

    let err = engine
        .create_proposal(&at("alice", &clock), draft("x", 1, 101, 144))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidThreshold);

    let mut funded = draft("x", 1, 50, 144);
    funded.treasury_amount = TokenAmount::new(10);
    let err = engine
        .create_proposal(&at("alice", &clock), funded)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);

    let mut tagged = draft("x", 1, 50, 144);
    tagged.tags = (0..6).map(|i| format!("t{i}")).collect();
    let err = engine
        .create_proposal(&at("alice", &clock), tagged)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyEntries);

    assert_eq!(engine.stats().proposal_count, 0);
}

#[test]
fn quorum_and_threshold_gate_execution() {
    let (mut engine, clock) = setup();
    let low_turnout = engine
        .create_proposal(&at("alice", &clock), draft("Quorum", 5_000, 50, 144))
        .unwrap();
    let contested = engine
        .create_proposal(&at("alice", &clock), draft("Threshold", 100, 80, 144))
        .unwrap();

    clock.set(144);
    engine
        .vote(&at("alice", &clock), low_turnout, VoteChoice::Yes)
        .unwrap();
    engine
        .vote(&at("alice", &clock), contested, VoteChoice::Yes)
        .unwrap();
    engine
        .vote(&at("bob", &clock), contested, VoteChoice::No)
        .unwrap();

    clock.set(432);
    let err = engine.execute(&at("bob", &clock), low_turnout).unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::QuorumNotMet { have: 1_006, need: 5_000 }
    ));
    // 1006 / 1407 = 71% < 80%
    let err = engine.execute(&at("bob", &clock), contested).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidThreshold);
    assert!(!engine.proposal(contested).unwrap().executed);
}

#[test]
fn parameter_action_applies_on_execution() {
    let (mut engine, clock) = setup();
    let mut change = draft("Lower threshold", 100, 50, 144);
    change.action = Some(ProposalAction::UpdateParameter {
        param: GovernableParam::ProposalThreshold,
        value: 10,
    });
    let pid = engine.create_proposal(&at("alice", &clock), change).unwrap();

    clock.set(144);
    engine.vote(&at("alice", &clock), pid, VoteChoice::Yes).unwrap();
    clock.set(432);
    engine.execute(&at("carol", &clock), pid).unwrap();
    assert_eq!(engine.params().proposal_threshold, 10);
    assert_eq!(engine.stats().proposal_threshold, 10);
}

// ---------------------------------------------------------------------------
// 2. Gates
// ---------------------------------------------------------------------------

#[test]
fn veto_council_cancels_active_proposal() {
    let (mut engine, clock) = setup();
    engine
        .set_veto_council(&at("gov", &clock), vec![id("guardian")])
        .unwrap();
    assert!(engine.is_veto_member(&id("guardian")));

    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Risky", 1, 50, 144))
        .unwrap();

    let err = engine
        .emergency_cancel(&at("alice", &clock), pid)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    engine.emergency_cancel(&at("guardian", &clock), pid).unwrap();
    let proposal = engine.proposal(pid).unwrap();
    assert!(proposal.cancelled && !proposal.active);

    clock.set(150);
    let err = engine.vote(&at("bob", &clock), pid, VoteChoice::Yes).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
    let err = engine
        .emergency_cancel(&at("guardian", &clock), pid)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
    clock.set(1_000);
    let err = engine.execute(&at("bob", &clock), pid).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
}

#[test]
fn multi_sig_requires_half_of_approvers() {
    let (mut engine, clock) = setup();
    let mut gated = draft("Gated", 100, 50, 144);
    gated.approvers = vec![id("s1"), id("s2"), id("s3"), id("s4")];
    let pid = engine.create_proposal(&at("alice", &clock), gated).unwrap();

    clock.set(144);
    engine.vote(&at("alice", &clock), pid, VoteChoice::Yes).unwrap();
    assert_eq!(engine.multi_sig_approve(&at("s1", &clock), pid).unwrap(), 1);
    let err = engine.multi_sig_approve(&at("s1", &clock), pid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
    let err = engine
        .multi_sig_approve(&at("mallory", &clock), pid)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    clock.set(432);
    let err = engine.execute(&at("bob", &clock), pid).unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    assert_eq!(engine.multi_sig_approve(&at("s3", &clock), pid).unwrap(), 2);
    let details = engine.proposal_details(pid, clock.now()).unwrap();
    assert_eq!(details.approvals_required, 2);
    assert!(details.executable);
    engine.execute(&at("bob", &clock), pid).unwrap();

    let err = engine.multi_sig_approve(&at("s4", &clock), pid).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
}

// ---------------------------------------------------------------------------
// 3. Delegation
// ---------------------------------------------------------------------------

#[test]
fn delegation_round_trip_restores_power() {
    let (mut engine, clock) = setup();
    let total = engine.stats().total_voting_power;

    let moved = engine
        .delegate(&at("bob", &clock), &id("alice"), BlockHeight::new(100), 0)
        .unwrap();
    assert_eq!(moved, 400);
    assert_eq!(engine.get_power(&id("alice")), 1_400);
    assert_eq!(engine.get_power(&id("bob")), 0);
    assert_eq!(engine.stats().total_voting_power, total);

    clock.set(99);
    assert!(!engine.revoke_if_expired(&at("carol", &clock), &id("bob")).unwrap());
    clock.set(100);
    assert!(engine.revoke_if_expired(&at("carol", &clock), &id("bob")).unwrap());
    assert_eq!(engine.get_power(&id("alice")), 1_000);
    assert_eq!(engine.get_power(&id("bob")), 400);
    assert_eq!(engine.stats().active_delegations, 0);
}

#[test]
fn former_delegate_can_be_initialized_after_revocation() {
    let (mut engine, clock) = setup();
    engine
        .delegate(&at("alice", &clock), &id("newbie"), BlockHeight::new(10), 0)
        .unwrap();
    clock.set(10);
    assert!(engine
        .revoke_if_expired(&at("carol", &clock), &id("alice"))
        .unwrap());
    assert_eq!(engine.voter_info(&id("newbie")).power, 0);

    engine
        .initialize(&at("gov", &clock), &id("newbie"), 500, 60)
        .unwrap();
    let info = engine.voter_info(&id("newbie"));
    assert_eq!(info.power, 500);
    assert_eq!(info.original_power, 500);
    assert_eq!(info.reputation, 60);
    assert_eq!(engine.stats().total_voting_power, 2_100);

    let err = engine
        .initialize(&at("gov", &clock), &id("newbie"), 1, 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyInitialized);
}

#[test]
fn delegated_power_votes_with_delegate() {
    let (mut engine, clock) = setup();
    engine
        .delegate(&at("carol", &clock), &id("bob"), BlockHeight::new(10_000), 0)
        .unwrap();
    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Delegated", 100, 50, 144))
        .unwrap();
    clock.set(144);
    assert_eq!(
        engine.vote(&at("bob", &clock), pid, VoteChoice::No).unwrap(),
        601
    );
    let err = engine.vote(&at("carol", &clock), pid, VoteChoice::Yes).unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::InsufficientPower { have: 0, need: 1 }
    ));
}

#[test]
fn batch_delegate_reports_each_request() {
    let (mut engine, clock) = setup();
    let requests = vec![
        DelegationRequest {
            delegator: id("bob"),
            delegate: id("alice"),
            expiry_block: BlockHeight::new(50),
            max_power: 0,
        },
        DelegationRequest {
            delegator: id("carol"),
            delegate: id("carol"),
            expiry_block: BlockHeight::new(50),
            max_power: 0,
        },
    ];

    let err = engine
        .batch_delegate(&at("alice", &clock), &requests)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    let results = engine.batch_delegate(&at("gov", &clock), &requests).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].as_ref().unwrap(), 400);
    assert!(matches!(results[1], Err(GovernanceError::SelfDelegation)));

    let too_many = vec![requests[0].clone(); 11];
    let err = engine
        .batch_delegate(&at("gov", &clock), &too_many)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyEntries);

    clock.set(50);
    let revoked = engine
        .revoke_expired_delegations(&at("carol", &clock), &[id("bob"), id("carol")])
        .unwrap();
    assert_eq!(revoked, 1);
    assert_eq!(engine.get_power(&id("bob")), 400);
}

// ---------------------------------------------------------------------------
// 4. Treasury
// ---------------------------------------------------------------------------

#[test]
fn funded_proposal_pays_creator_once() {
    let (mut engine, clock) = setup();
    let mut ledger = NullTreasury::new();
    ledger.mint(&id("donor"), TokenAmount::new(1_000));

    let balance = engine
        .deposit_to_treasury(&at("donor", &clock), TokenAmount::new(500), &mut ledger)
        .unwrap();
    assert_eq!(balance, TokenAmount::new(500));
    assert_eq!(ledger.balance_of(&id("vault")), TokenAmount::new(500));

    let mut grant = ProposalDraft::new("Grant", ProposalKind::Treasury, 144);
    grant.quorum_required = Some(100);
    grant.treasury_amount = TokenAmount::new(300);
    let pid = engine.create_proposal(&at("alice", &clock), grant).unwrap();

    clock.set(144);
    engine.vote(&at("alice", &clock), pid, VoteChoice::Yes).unwrap();
    clock.set(432);
    let receipt = engine.execute(&at("bob", &clock), pid).unwrap();
    let payout = receipt.payout.unwrap();
    assert_eq!(payout.recipient, id("alice"));
    assert_eq!(payout.amount, TokenAmount::new(300));

    let err = engine
        .claim_payout(&at("bob", &clock), pid, &mut ledger)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    ledger.fail_transfers(true);
    let err = engine
        .claim_payout(&at("alice", &clock), pid, &mut ledger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Treasury);
    assert!(!engine.pending_payout(pid).unwrap().claimed);

    ledger.fail_transfers(false);
    let paid = engine
        .claim_payout(&at("alice", &clock), pid, &mut ledger)
        .unwrap();
    assert_eq!(paid, TokenAmount::new(300));
    assert_eq!(ledger.balance_of(&id("alice")), TokenAmount::new(300));
    assert_eq!(engine.stats().treasury_balance, TokenAmount::new(200));

    let err = engine
        .claim_payout(&at("alice", &clock), pid, &mut ledger)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::PayoutAlreadyClaimed(_)));
}

#[test]
fn deposit_beyond_balance_rejected() {
    let (mut engine, clock) = setup();
    let mut ledger = NullTreasury::new();
    ledger.mint(&id("donor"), TokenAmount::new(10));
    let err = engine
        .deposit_to_treasury(&at("donor", &clock), TokenAmount::new(11), &mut ledger)
        .unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::InsufficientFunds { have: 10, need: 11 }
    ));
    let err = engine
        .deposit_to_treasury(&at("donor", &clock), TokenAmount::ZERO, &mut ledger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    assert!(engine.stats().treasury_balance.is_zero());
}

// ---------------------------------------------------------------------------
// 5. Admin, hooks and persistence
// ---------------------------------------------------------------------------

#[test]
fn admin_operations_are_owner_only() {
    let (mut engine, clock) = setup();
    let err = engine
        .update_parameter(&at("alice", &clock), "default_quorum", 10)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));

    let err = engine
        .update_parameter(&at("gov", &clock), "no_such_param", 10)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownParameter);

    let err = engine
        .update_parameter(&at("gov", &clock), "default_threshold", 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidThreshold);

    engine
        .update_parameter(&at("gov", &clock), "default_quorum", 10)
        .unwrap();
    assert_eq!(engine.params().default_quorum, 10);

    engine
        .transfer_ownership(&at("gov", &clock), id("dao"))
        .unwrap();
    let err = engine
        .initialize(&at("gov", &clock), &id("dave"), 5, 0)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotAuthorized));
    engine
        .initialize(&at("dao", &clock), &id("dave"), 5, 0)
        .unwrap();

    let err = engine
        .set_veto_council(
            &at("dao", &clock),
            (0..6).map(|i| id(&format!("v{i}"))).collect(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooManyEntries);
}

#[test]
fn failing_hook_does_not_undo_execution() {
    let (mut engine, clock) = setup();
    let first = engine
        .create_proposal(&at("alice", &clock), draft("One", 100, 50, 144))
        .unwrap();
    let second = engine
        .create_proposal(&at("alice", &clock), draft("Two", 100, 50, 144))
        .unwrap();
    clock.set(144);
    engine.vote(&at("alice", &clock), first, VoteChoice::Yes).unwrap();
    engine.vote(&at("bob", &clock), first, VoteChoice::Yes).unwrap();
    engine.vote(&at("alice", &clock), second, VoteChoice::Yes).unwrap();
    clock.set(432);

    let mut hook = NullRewardHook::new();
    engine
        .execute_with_hook(&at("carol", &clock), first, &mut hook)
        .unwrap();
    assert_eq!(hook.receipts().len(), 1);
    assert_eq!(hook.receipts()[0].participants, vec![id("alice"), id("bob")]);

    let mut broken = NullRewardHook::failing("reward pool empty");
    let err = engine
        .execute_with_hook(&at("carol", &clock), second, &mut broken)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RewardHook);
    assert!(engine.proposal(second).unwrap().executed);
}

#[test]
fn persisted_state_restores_identically() {
    let (mut engine, clock) = setup();
    engine
        .delegate(&at("carol", &clock), &id("bob"), BlockHeight::new(500), 0)
        .unwrap();
    let pid = engine
        .create_proposal(&at("alice", &clock), draft("Persist", 100, 50, 144))
        .unwrap();
    clock.set(144);
    engine.vote(&at("bob", &clock), pid, VoteChoice::Yes).unwrap();

    let store = NullStore::new();
    assert!(GovernanceEngine::restore(&store).unwrap().is_none());
    engine.persist(&store).unwrap();

    let mut restored = GovernanceEngine::restore(&store).unwrap().unwrap();
    assert_eq!(restored.stats(), engine.stats());
    assert_eq!(restored.voter_info(&id("bob")), engine.voter_info(&id("bob")));
    assert_eq!(restored.proposal(pid), engine.proposal(pid));

    // Indexes are rebuilt: the restored engine still enforces single votes
    // and can revoke the delegation it loaded.
    let err = restored.vote(&at("bob", &clock), pid, VoteChoice::No).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
    clock.set(500);
    assert!(restored
        .revoke_if_expired(&at("carol", &clock), &id("carol"))
        .unwrap());
    assert_eq!(restored.get_power(&id("bob")), 400);
    assert_eq!(restored.voter_info(&id("bob")).active_delegations, 0);
}

#[test]
fn corrupt_snapshot_is_a_serialization_error() {
    let err = GovernanceEngine::load_state(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
}
