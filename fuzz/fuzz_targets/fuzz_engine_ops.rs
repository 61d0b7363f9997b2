#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use agora_governance::{CallContext, GovernanceEngine, ProposalDraft, ProposalKind};
use agora_types::{BlockHeight, GovernanceParams, Identity};

const VOTERS: [&str; 4] = ["v0", "v1", "v2", "v3"];

#[derive(Debug, Arbitrary)]
enum Op {
    Delegate { from: u8, to: u8, ttl: u16 },
    Revoke { who: u8 },
    Stake { who: u8, amount: u32 },
    Propose { who: u8, kind: u8, period: u16 },
    Vote { who: u8, proposal: u8, choice: u8 },
    Execute { who: u8, proposal: u8 },
    Advance { blocks: u16 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    powers: [u32; 4],
    ops: Vec<Op>,
}

fn voter(index: u8) -> Identity {
    Identity::new(VOTERS[usize::from(index) % VOTERS.len()])
}

// Arbitrary operation sequences never panic, and power is conserved
// across delegation, revocation and staking.
fuzz_target!(|input: Input| {
    let mut engine = GovernanceEngine::new(
        Identity::new("gov"),
        Identity::new("vault"),
        GovernanceParams::default(),
    )
    .expect("default params are valid");
    let owner = CallContext::new("gov", 0);
    for (name, power) in VOTERS.iter().zip(input.powers) {
        engine
            .initialize(&owner, &Identity::new(*name), u128::from(power), 60)
            .expect("fresh voter");
    }

    let mut block = 0u64;
    for op in input.ops.into_iter().take(200) {
        match op {
            Op::Delegate { from, to, ttl } => {
                let ctx = CallContext::new(voter(from), block);
                let expiry = BlockHeight::new(block + u64::from(ttl));
                let _ = engine.delegate(&ctx, &voter(to), expiry, 0);
            }
            Op::Revoke { who } => {
                let ctx = CallContext::new("keeper", block);
                let _ = engine.revoke_if_expired(&ctx, &voter(who));
            }
            Op::Stake { who, amount } => {
                let ctx = CallContext::new(voter(who), block);
                let _ = engine.stake(&ctx, u128::from(amount));
            }
            Op::Propose { who, kind, period } => {
                let ctx = CallContext::new(voter(who), block);
                let draft = ProposalDraft::new("fuzz", ProposalKind::Standard, u64::from(period));
                let _ = engine.create_proposal_raw(&ctx, kind, draft);
            }
            Op::Vote {
                who,
                proposal,
                choice,
            } => {
                let ctx = CallContext::new(voter(who), block);
                let _ = engine.vote_raw(&ctx, u64::from(proposal), choice);
            }
            Op::Execute { who, proposal } => {
                let ctx = CallContext::new(voter(who), block);
                let _ = engine.execute(&ctx, u64::from(proposal));
            }
            Op::Advance { blocks } => block += u64::from(blocks),
        }

        let sum: u128 = VOTERS
            .iter()
            .map(|name| engine.get_power(&Identity::new(*name)))
            .sum();
        assert_eq!(sum, engine.stats().total_voting_power);
    }
});
