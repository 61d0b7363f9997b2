//! Reputation tracker — score, participation count and voting streak.
//!
//! Entries are created lazily with zeroed counters. Only successful votes
//! mutate them after initialization.

use agora_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reputation added for every vote cast.
pub const REPUTATION_PER_VOTE: u64 = 5;

/// Effective power bonus is `score / REPUTATION_BONUS_DIVISOR`.
pub const REPUTATION_BONUS_DIVISOR: u64 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub score: u64,
    pub participation_count: u64,
    pub streak: u64,
}

impl ReputationEntry {
    /// Bonus voting power granted by this reputation.
    pub fn vote_bonus(&self) -> u128 {
        u128::from(self.score / REPUTATION_BONUS_DIVISOR)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReputationTracker {
    entries: HashMap<Identity, ReputationEntry>,
}

impl ReputationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reputation of `identity`; zeroed if never seen.
    pub fn get(&self, identity: &Identity) -> ReputationEntry {
        self.entries.get(identity).copied().unwrap_or_default()
    }

    pub fn score(&self, identity: &Identity) -> u64 {
        self.get(identity).score
    }

    /// Set the starting score and zero the participation counters.
    pub fn initialize(&mut self, identity: &Identity, score: u64) {
        self.entries.insert(
            identity.clone(),
            ReputationEntry {
                score,
                participation_count: 0,
                streak: 0,
            },
        );
    }

    /// Credit a cast vote. Returns the updated entry.
    pub fn record_vote(&mut self, identity: &Identity) -> ReputationEntry {
        let entry = self.entries.entry(identity.clone()).or_default();
        entry.score = entry.score.saturating_add(REPUTATION_PER_VOTE);
        entry.participation_count = entry.participation_count.saturating_add(1);
        entry.streak = entry.streak.saturating_add(1);
        *entry
    }
}
