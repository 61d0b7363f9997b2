//! Scenario files: a TOML list of governance operations replayed in order
//! against a node driven by a deterministic block clock.
//!
//! ```toml
//! [balances]
//! donor = 5000
//!
//! [[step]]
//! block = 0
//! caller = "owner"
//! action = { op = "initialize", voter = "alice", power = 1000, reputation = 60 }
//!
//! [[step]]
//! block = 200
//! caller = "bob"
//! action = { op = "vote", proposal = 1, choice = 1 }
//! expect = "VotingClosed"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use agora_governance::{
    DelegationRequest, ErrorKind, GovernableParam, GovernanceError, ProposalAction, ProposalDraft,
    ProposalKind,
};
use agora_node::{GovernanceHandle, NodeError};
use agora_nullables::NullClock;
use agora_types::{BlockHeight, Identity, TokenAmount};
use agora_utils::{format_blocks, StatsCounter};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Counter names reported at the end of a run.
pub const OUTCOMES: [&str; 3] = ["ok", "rejected", "unexpected"];

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Treasury-ledger balances minted before the first step.
    #[serde(default)]
    pub balances: BTreeMap<String, u64>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub block: u64,
    pub caller: Identity,
    pub action: Action,
    /// Error kind this step must fail with, e.g. `"QuorumNotMet"`.
    #[serde(default)]
    pub expect: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Initialize {
        voter: Identity,
        power: u64,
        #[serde(default)]
        reputation: u64,
    },
    Stake {
        amount: u64,
    },
    Delegate {
        delegate: Identity,
        expiry_block: u64,
        #[serde(default)]
        max_power: u64,
    },
    BatchDelegate {
        delegators: Vec<Identity>,
        delegate: Identity,
        expiry_block: u64,
    },
    Revoke {
        delegators: Vec<Identity>,
    },
    CreateProposal {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        kind: u8,
        voting_period: u64,
        quorum: Option<u64>,
        threshold: Option<u8>,
        #[serde(default)]
        treasury_amount: u64,
        target: Option<Identity>,
        #[serde(default)]
        approvers: Vec<Identity>,
        #[serde(default)]
        tags: Vec<String>,
        /// Parameter changed when the proposal executes.
        param: Option<String>,
        #[serde(default)]
        param_value: u64,
    },
    Vote {
        proposal: u64,
        choice: u8,
    },
    Execute {
        proposal: u64,
    },
    Cancel {
        proposal: u64,
    },
    Approve {
        proposal: u64,
    },
    Deposit {
        amount: u64,
    },
    Claim {
        proposal: u64,
    },
    SetVetoCouncil {
        members: Vec<Identity>,
    },
    UpdateParameter {
        key: String,
        value: u64,
    },
    TransferOwnership {
        new_owner: Identity,
    },
    ShowProposal {
        proposal: u64,
    },
    ShowVoter {
        voter: Identity,
    },
    ShowStats,
}

impl Scenario {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

/// Classify an error for comparison with a step's `expect`.
fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(node) = err.downcast_ref::<NodeError>() {
        return node.governance().map(GovernanceError::kind);
    }
    err.downcast_ref::<GovernanceError>().map(GovernanceError::kind)
}

/// Replay every step, counting outcomes into `stats`. Query steps print
/// their result as JSON on stdout.
pub async fn run(
    scenario: &Scenario,
    handle: &GovernanceHandle,
    clock: &NullClock,
    stats: &StatsCounter,
    block_time_secs: u64,
) -> anyhow::Result<()> {
    for (index, step) in scenario.steps.iter().enumerate() {
        if BlockHeight::new(step.block) < clock.now() {
            warn!(step = index, block = step.block, now = %clock.now(), "step block is in the past; clock unchanged");
        }
        clock.set(step.block);

        let outcome = apply(handle, step, block_time_secs).await;
        match (outcome, step.expect.as_deref()) {
            (Ok(output), None) => {
                stats.increment("ok");
                if let Some(value) = output {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
            }
            (Ok(_), Some(expected)) => {
                warn!(step = index, expected, "step succeeded but was expected to fail");
                stats.increment("unexpected");
            }
            (Err(e), Some(expected))
                if error_kind(&e).is_some_and(|k| format!("{k:?}") == expected) =>
            {
                info!(step = index, error = %e, "step rejected as expected");
                stats.increment("rejected");
            }
            (Err(e), _) => {
                warn!(step = index, caller = %step.caller, error = %e, "step failed");
                stats.increment("unexpected");
            }
        }
    }
    Ok(())
}

async fn apply(
    handle: &GovernanceHandle,
    step: &Step,
    block_time_secs: u64,
) -> anyhow::Result<Option<Value>> {
    let caller = step.caller.clone();
    match &step.action {
        Action::Initialize {
            voter,
            power,
            reputation,
        } => {
            handle
                .initialize(caller, voter.clone(), u128::from(*power), *reputation)
                .await?;
        }
        Action::Stake { amount } => {
            let power = handle.stake(caller.clone(), u128::from(*amount)).await?;
            info!(%caller, power, "staked");
        }
        Action::Delegate {
            delegate,
            expiry_block,
            max_power,
        } => {
            let moved = handle
                .delegate(
                    caller,
                    delegate.clone(),
                    BlockHeight::new(*expiry_block),
                    u128::from(*max_power),
                )
                .await?;
            info!(%delegate, moved, "delegated");
        }
        Action::BatchDelegate {
            delegators,
            delegate,
            expiry_block,
        } => {
            let requests = delegators
                .iter()
                .map(|delegator| DelegationRequest {
                    delegator: delegator.clone(),
                    delegate: delegate.clone(),
                    expiry_block: BlockHeight::new(*expiry_block),
                    max_power: 0,
                })
                .collect();
            let results = handle.batch_delegate(caller, requests).await?;
            for (delegator, result) in delegators.iter().zip(results) {
                match result {
                    Ok(moved) => info!(%delegator, moved, "batch delegation applied"),
                    Err(e) => warn!(%delegator, error = %e, "batch delegation rejected"),
                }
            }
        }
        Action::Revoke { delegators } => {
            let revoked = handle
                .revoke_expired_delegations(caller, delegators.clone())
                .await?;
            info!(revoked, "expired delegations revoked");
        }
        Action::CreateProposal {
            title,
            description,
            kind,
            voting_period,
            quorum,
            threshold,
            treasury_amount,
            target,
            approvers,
            tags,
            param,
            param_value,
        } => {
            let mut draft = ProposalDraft::new(title.clone(), ProposalKind::Standard, *voting_period);
            draft.description = description.clone();
            draft.quorum_required = quorum.map(u128::from);
            draft.threshold_percentage = *threshold;
            draft.treasury_amount = TokenAmount::new(u128::from(*treasury_amount));
            draft.target = target.clone();
            draft.approvers = approvers.clone();
            draft.tags = tags.clone();
            if let Some(name) = param {
                draft.action = Some(ProposalAction::UpdateParameter {
                    param: name.parse::<GovernableParam>()?,
                    value: u128::from(*param_value),
                });
            }
            let id = handle.create_proposal_raw(caller, *kind, draft).await?;
            info!(
                id,
                voting = %format_blocks(*voting_period, block_time_secs),
                "proposal created"
            );
        }
        Action::Vote { proposal, choice } => {
            let effective = handle.vote_raw(caller, *proposal, *choice).await?;
            info!(proposal, effective, "vote counted");
        }
        Action::Execute { proposal } => {
            let receipt = handle.execute(caller, *proposal).await?;
            return Ok(Some(serde_json::to_value(receipt)?));
        }
        Action::Cancel { proposal } => handle.emergency_cancel(caller, *proposal).await?,
        Action::Approve { proposal } => {
            let approvals = handle.multi_sig_approve(caller, *proposal).await?;
            info!(proposal, approvals, "approval recorded");
        }
        Action::Deposit { amount } => {
            let balance = handle
                .deposit_to_treasury(caller, TokenAmount::new(u128::from(*amount)))
                .await?;
            info!(%balance, "treasury deposit");
        }
        Action::Claim { proposal } => {
            let paid = handle.claim_payout(caller, *proposal).await?;
            info!(proposal, %paid, "payout claimed");
        }
        Action::SetVetoCouncil { members } => {
            handle.set_veto_council(caller, members.clone()).await?
        }
        Action::UpdateParameter { key, value } => {
            handle
                .update_parameter(caller, key.clone(), u128::from(*value))
                .await?
        }
        Action::TransferOwnership { new_owner } => {
            handle.transfer_ownership(caller, new_owner.clone()).await?
        }
        Action::ShowProposal { proposal } => {
            let details = handle
                .proposal_details(*proposal)
                .await?
                .ok_or(GovernanceError::ProposalNotFound(*proposal))?;
            return Ok(Some(serde_json::to_value(details)?));
        }
        Action::ShowVoter { voter } => {
            let info = handle.voter_info(voter.clone()).await?;
            return Ok(Some(serde_json::to_value(info)?));
        }
        Action::ShowStats => {
            let stats = handle.stats().await?;
            return Ok(Some(serde_json::to_value(stats)?));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [balances]
        donor = 5000

        [[step]]
        block = 0
        caller = "owner"
        action = { op = "initialize", voter = "alice", power = 1000, reputation = 60 }

        [[step]]
        block = 0
        caller = "alice"
        action = { op = "create_proposal", title = "Docs", voting_period = 1440, quorum = 500, threshold = 50 }

        [[step]]
        block = 10
        caller = "alice"
        action = { op = "vote", proposal = 1, choice = 1 }
        expect = "VotingNotStarted"

        [[step]]
        block = 10
        caller = "alice"
        action = { op = "show_stats" }
    "#;

    #[test]
    fn parses_sample_scenario() {
        let scenario = Scenario::from_toml_str(SAMPLE).unwrap();
        assert_eq!(scenario.balances["donor"], 5000);
        assert_eq!(scenario.steps.len(), 4);
        assert!(matches!(
            scenario.steps[0].action,
            Action::Initialize { power: 1000, reputation: 60, .. }
        ));
        match &scenario.steps[1].action {
            Action::CreateProposal {
                quorum, threshold, kind, param, ..
            } => {
                assert_eq!(*quorum, Some(500));
                assert_eq!(*threshold, Some(50));
                assert_eq!(*kind, 0);
                assert!(param.is_none());
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(scenario.steps[2].expect.as_deref(), Some("VotingNotStarted"));
        assert!(matches!(scenario.steps[3].action, Action::ShowStats));
    }

    #[test]
    fn bundled_scenario_parses() {
        let scenario =
            Scenario::from_toml_str(include_str!("../scenarios/lifecycle.toml")).unwrap();
        assert_eq!(scenario.balances["donor"], 5000);
        assert!(scenario.steps.iter().any(|s| s.expect.is_some()));
    }

    #[tokio::test]
    async fn bundled_scenario_replays_against_a_persistent_node() {
        use std::sync::Arc;

        use agora_governance::GovernanceEngine;
        use agora_node::{AgoraNode, NodeConfig};
        use agora_nullables::NullTreasury;
        use agora_store_lmdb::LmdbMetaStore;

        let scenario =
            Scenario::from_toml_str(include_str!("../scenarios/lifecycle.toml")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::default();
        config.data_dir = Some(dir.path().to_path_buf());

        let clock = Arc::new(NullClock::new(0));
        let mut treasury = NullTreasury::new();
        for (account, amount) in &scenario.balances {
            treasury.mint(&Identity::new(account.as_str()), TokenAmount::new(u128::from(*amount)));
        }
        let mut node = AgoraNode::new(config, clock.clone(), Box::new(treasury)).unwrap();
        node.start().unwrap();

        let stats = StatsCounter::new(&OUTCOMES);
        run(&scenario, &node.handle(), &clock, &stats, 600).await.unwrap();
        node.stop().await.unwrap();
        drop(node);

        assert_eq!(stats.get("unexpected"), 0);
        assert_eq!(stats.get("rejected"), 3);

        let store = LmdbMetaStore::open(dir.path()).unwrap();
        let engine = GovernanceEngine::restore(&store).unwrap().unwrap();
        assert_eq!(engine.stats().proposal_count, 3);
    }

    #[test]
    fn unknown_op_is_rejected() {
        let bad = r#"
            [[step]]
            block = 0
            caller = "x"
            action = { op = "mint", amount = 5 }
        "#;
        assert!(Scenario::from_toml_str(bad).is_err());
    }

    #[test]
    fn error_kind_sees_through_node_errors() {
        let err: anyhow::Error =
            NodeError::Governance(GovernanceError::QuorumNotMet { have: 1, need: 2 }).into();
        assert_eq!(error_kind(&err), Some(ErrorKind::QuorumNotMet));
        let err: anyhow::Error = GovernanceError::UnknownParameter("x".into()).into();
        assert_eq!(error_kind(&err), Some(ErrorKind::UnknownParameter));
        assert_eq!(error_kind(&anyhow::anyhow!("other")), None);
    }
}
