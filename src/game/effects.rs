use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cards::{Card, Rank};
use super::state::{ClearReason, GameEvent, GameState};

/// Cards played at once that make an ordinary rank a revolution.
pub const REVOLUTION_GROUP_SIZE: usize = 4;

/// What a played group does once it lands on the field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum CardEffect {
    None,
    /// Eight: clear the field, same player leads again.
    Clear,
    /// Five: skip the next `count` active players.
    Skip { count: usize },
    /// Seven: hand `count` cards to the next player.
    Transfer { count: usize },
    /// Ten: throw away `count` cards.
    Discard { count: usize },
    /// Jack: eleven-back until the field clears.
    Reversal,
    /// Four of a kind or more.
    RevolutionToggle,
}

impl CardEffect {
    /// Dedicated ranks take precedence, so four eights are still a clear.
    pub fn classify(rank: Rank, count: usize) -> Self {
        match rank {
            Rank::Eight => CardEffect::Clear,
            Rank::Five => CardEffect::Skip { count },
            Rank::Seven => CardEffect::Transfer { count },
            Rank::Ten => CardEffect::Discard { count },
            Rank::Jack => CardEffect::Reversal,
            _ if count >= REVOLUTION_GROUP_SIZE => CardEffect::RevolutionToggle,
            _ => CardEffect::None,
        }
    }

    pub fn for_cards(cards: &[Card]) -> Self {
        match cards.first() {
            Some(first) => Self::classify(first.rank, cards.len()),
            None => CardEffect::None,
        }
    }

    /// Resolves the effect for the seat that just played and moves the turn
    /// on where the effect calls for it.
    pub fn apply(&self, actor: usize, state: &mut GameState) -> EffectResolution {
        let mut resolution = EffectResolution::default();
        match *self {
            CardEffect::None => {
                state.advance_turn();
            }
            CardEffect::Clear => {
                state.reset_field();
                resolution.events.push(GameEvent::FieldCleared {
                    reason: ClearReason::Eight,
                    leader: state.players[actor].id,
                });
            }
            CardEffect::Skip { count } => {
                let mut skipped = Vec::with_capacity(count);
                for _ in 0..count {
                    state.advance_turn();
                    skipped.push(state.players[state.current_player_index].id);
                }
                state.advance_turn();
                debug!(?skipped, "players skipped");
                resolution.events.push(GameEvent::PlayersSkipped { skipped });
            }
            CardEffect::Transfer { count } => {
                let pending = PendingEffect::Transfer { count };
                state.pending_effect = Some(pending);
                resolution.events.push(GameEvent::PendingEffectRaised {
                    player_id: state.players[actor].id,
                    effect: pending,
                });
            }
            CardEffect::Discard { count } => {
                let pending = PendingEffect::Discard { count };
                state.pending_effect = Some(pending);
                resolution.events.push(GameEvent::PendingEffectRaised {
                    player_id: state.players[actor].id,
                    effect: pending,
                });
            }
            CardEffect::Reversal => {
                state.field.is_enabled_reversal = true;
                state.sort_all_hands();
                resolution.events.push(GameEvent::ReversalActivated);
                state.advance_turn();
            }
            CardEffect::RevolutionToggle => {
                state.field.is_revolution = !state.field.is_revolution;
                state.sort_all_hands();
                resolution.events.push(GameEvent::RevolutionToggled {
                    active: state.field.is_revolution,
                });
                state.advance_turn();
            }
        }
        resolution
    }
}

/// An obligation the current player must settle before the turn moves on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PendingEffect {
    Transfer { count: usize },
    Discard { count: usize },
}

impl PendingEffect {
    pub fn count(&self) -> usize {
        match *self {
            PendingEffect::Transfer { count } | PendingEffect::Discard { count } => count,
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct EffectResolution {
    pub events: Vec<GameEvent>,
}
