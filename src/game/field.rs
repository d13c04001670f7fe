use serde::{Deserialize, Serialize};

use super::cards::{Card, Rank, Suit};

/// A run in progress: the next play must be `required_count` cards one rank
/// beyond `anchor_rank` in the current direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequenceLock {
    pub anchor_rank: Rank,
    pub required_count: usize,
    pub ascending: bool,
}

/// The table between plays.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldState {
    #[serde(default)]
    pub last_played_cards: Vec<Card>,
    /// Survives field resets; only a revolution play flips it.
    #[serde(default)]
    pub is_revolution: bool,
    /// Eleven-back. Dropped on every reset.
    #[serde(default)]
    pub is_enabled_reversal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit_lock: Option<Suit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_lock: Option<SequenceLock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_player_index: Option<usize>,
}

impl FieldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the trick. The revolution flag is kept.
    pub fn reset(&mut self) {
        self.last_played_cards.clear();
        self.is_enabled_reversal = false;
        self.suit_lock = None;
        self.sequence_lock = None;
        self.last_played_player_index = None;
    }

    pub fn is_empty(&self) -> bool {
        self.last_played_cards.is_empty()
    }

    pub fn last_played_count(&self) -> usize {
        self.last_played_cards.len()
    }

    /// The rank of the last group when every card in it shares one rank.
    pub fn last_played_rank(&self) -> Option<Rank> {
        let first = self.last_played_cards.first()?.rank;
        self.last_played_cards
            .iter()
            .all(|card| card.rank == first)
            .then_some(first)
    }

    /// Whether lower ranks currently beat higher ones.
    pub fn is_reversed(&self) -> bool {
        self.is_revolution ^ self.is_enabled_reversal
    }
}
