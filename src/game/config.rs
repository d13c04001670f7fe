use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 5;

/// Match setup chosen before the lobby opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Fixed seed for shuffling and leftover dealing. Entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_min_players() -> usize {
    MIN_PLAYERS
}

fn default_max_players() -> usize {
    MAX_PLAYERS
}

impl MatchConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_player_bounds(mut self, min_players: usize, max_players: usize) -> Self {
        self.min_players = min_players;
        self.max_players = max_players;
        self
    }

    /// Bounds must stay inside 3..=5; the deal arithmetic assumes it.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.min_players < MIN_PLAYERS
            || self.max_players > MAX_PLAYERS
            || self.min_players > self.max_players
        {
            return Err(RuleError::InvalidConfig {
                min_players: self.min_players,
                max_players: self.max_players,
            });
        }
        Ok(())
    }

    pub fn allows(&self, player_count: usize) -> bool {
        (self.min_players..=self.max_players).contains(&player_count)
    }

    pub fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            seed: None,
        }
    }
}
