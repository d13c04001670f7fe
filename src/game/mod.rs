//! Rule engine: cards, table state, legality checks and the turn state machine.

pub mod cards;
pub mod config;
pub mod effects;
pub mod evaluator;
pub mod field;
pub mod rules;
pub mod state;

#[cfg(test)]
mod tests_props;

pub use cards::{Card, CardId, Deck, Rank, Suit, DECK_SIZE};
pub use config::{MatchConfig, MAX_PLAYERS, MIN_PLAYERS};
pub use effects::{CardEffect, EffectResolution, PendingEffect};
pub use evaluator::{
    can_beat, can_play, can_play_card, can_play_with_sequence_lock, check_play,
    detect_sequence_lock, detect_suit_lock, is_stronger, playable_card_ids, sort_hand,
    PlayViolation,
};
pub use field::{FieldState, SequenceLock};
pub use rules::{CardSelection, RuleEngine, RuleError, RuleResolution};
pub use state::{
    deal_hands, ClearReason, GameEvent, GamePhase, GameState, IntegrityError, MatchSnapshot,
    Player, PlayerId, PlayerView, Role,
};
