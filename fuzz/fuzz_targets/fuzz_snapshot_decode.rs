#![no_main]

use libfuzzer_sys::fuzz_target;

use agora_governance::GovernanceEngine;
use agora_types::{BlockHeight, Identity};

// Decoding a snapshot from arbitrary bytes must fail cleanly, never panic.
// Anything that does decode must answer queries and re-encode.
fuzz_target!(|data: &[u8]| {
    let Ok(engine) = GovernanceEngine::load_state(data) else {
        return;
    };

    let stats = engine.stats();
    for id in 1..=stats.proposal_count.min(16) {
        let _ = engine.proposal_details(id, BlockHeight::new(0));
        let _ = engine.proposal_details(id, BlockHeight::new(u64::MAX));
    }
    let _ = engine.voter_info(&Identity::new("fuzz"));

    let bytes = engine.save_state().expect("decoded state re-encodes");
    assert!(GovernanceEngine::load_state(&bytes).is_ok());
});
