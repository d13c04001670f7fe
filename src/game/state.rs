use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, CardId, Deck, Suit, DECK_SIZE};
use super::config::MatchConfig;
use super::effects::PendingEffect;
use super::evaluator::{playable_card_ids, sort_hand};
use super::field::{FieldState, SequenceLock};

/// Seat-independent player identity, unique within a roster.
pub type PlayerId = u8;

/// Reserved for the werewolf phases; no rule reads it yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Citizen,
    Wolf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub role: Role,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hand: Vec::new(),
            finished: false,
            role: Role::default(),
        }
    }

    pub fn find_card_in_hand_index(&self, card_id: CardId) -> Option<usize> {
        self.hand.iter().position(|card| card.id == card_id)
    }

    /// Removes every listed card that is in hand, in selection order.
    pub fn remove_cards(&mut self, card_ids: &[CardId]) -> Vec<Card> {
        card_ids
            .iter()
            .filter_map(|id| {
                let idx = self.find_card_in_hand_index(*id)?;
                Some(self.hand.remove(idx))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Lobby,
    Dealing,
    Playing,
    /// Reserved; entered only through the explicit hook.
    WolfAction,
    /// Reserved; entered only through the explicit hook.
    Voting,
    Result,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClearReason {
    Eight,
    AllPassed,
}

/// Everything an action did, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    MatchStarted {
        player_count: usize,
    },
    CardsDealt {
        player_id: PlayerId,
        count: usize,
    },
    CardsPlayed {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    Passed {
        player_id: PlayerId,
        pass_count: usize,
    },
    FieldCleared {
        reason: ClearReason,
        leader: PlayerId,
    },
    PlayersSkipped {
        skipped: Vec<PlayerId>,
    },
    ReversalActivated,
    RevolutionToggled {
        active: bool,
    },
    LocksUpdated {
        #[serde(skip_serializing_if = "Option::is_none")]
        suit_lock: Option<Suit>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sequence_lock: Option<SequenceLock>,
    },
    PendingEffectRaised {
        player_id: PlayerId,
        effect: PendingEffect,
    },
    CardsTransferred {
        from: PlayerId,
        to: PlayerId,
        cards: Vec<Card>,
    },
    CardsDiscarded {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    PendingEffectSkipped {
        player_id: PlayerId,
        effect: PendingEffect,
    },
    PlayerFinished {
        player_id: PlayerId,
        place: usize,
    },
    MatchEnded {
        finish_order: Vec<PlayerId>,
    },
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
    ReturnedToLobby,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("current player index {index} is outside the roster")]
    InvalidPlayerIndex { index: usize },
    #[error("card {card_id} appears more than once")]
    DuplicateCardId { card_id: CardId },
    #[error("{count} cards in play exceed the deck size")]
    CardCountMismatch { count: usize },
    #[error("deck ran out while dealing")]
    DeckExhausted,
}

/// Shuffles a fresh deck and splits it across `player_count` seats: an equal
/// share in seat order, then each leftover card to a random seat.
pub fn deal_hands<R: Rng + ?Sized>(
    player_count: usize,
    rng: &mut R,
) -> Result<Vec<Vec<Card>>, IntegrityError> {
    let mut deck = Deck::new();
    deck.shuffle(rng);

    let mut hands = vec![Vec::new(); player_count];
    if player_count == 0 {
        return Ok(hands);
    }

    let base = deck.len() / player_count;
    let remainder = deck.len() % player_count;

    for hand in hands.iter_mut() {
        for _ in 0..base {
            hand.push(deck.draw().ok_or(IntegrityError::DeckExhausted)?);
        }
    }
    for _ in 0..remainder {
        let seat = rng.gen_range(0..player_count);
        hands[seat].push(deck.draw().ok_or(IntegrityError::DeckExhausted)?);
    }

    Ok(hands)
}

/// The whole match: roster, turn, table and history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameState {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub current_player_index: usize,
    #[serde(default)]
    pub phase: GamePhase,
    #[serde(default)]
    pub field: FieldState,
    #[serde(default)]
    pub pass_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_effect: Option<PendingEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_card_player_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finish_order: Vec<PlayerId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    /// Lowest id no seated player holds.
    pub fn free_player_id(&self) -> Option<PlayerId> {
        (0..=PlayerId::MAX).find(|&id| self.get_player(id).is_none())
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn can_start_game(&self, config: &MatchConfig) -> bool {
        self.phase == GamePhase::Lobby && config.allows(self.players.len())
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|player| !player.finished).count()
    }

    /// Moves to the next seat whose player has not finished.
    ///
    /// Callers guarantee at least one active player remains.
    pub fn advance_turn(&mut self) {
        let seats = self.players.len();
        if seats == 0 {
            return;
        }
        for _ in 0..seats {
            self.current_player_index = (self.current_player_index + 1) % seats;
            if !self.players[self.current_player_index].finished {
                return;
            }
        }
    }

    /// Ends the trick. Revolution survives; the pass counter restarts.
    pub fn reset_field(&mut self) {
        let was_reversed = self.field.is_enabled_reversal;
        self.field.reset();
        self.pass_count = 0;
        if was_reversed {
            self.sort_all_hands();
        }
    }

    pub fn sort_all_hands(&mut self) {
        let reversed = self.field.is_reversed();
        for player in &mut self.players {
            sort_hand(&mut player.hand, reversed);
        }
    }

    pub fn sort_hand_at(&mut self, seat: usize) {
        let reversed = self.field.is_reversed();
        if let Some(player) = self.players.get_mut(seat) {
            sort_hand(&mut player.hand, reversed);
        }
    }

    /// Clears everything but the roster.
    pub fn reset_match(&mut self) {
        self.current_player_index = 0;
        self.field = FieldState::new();
        self.pass_count = 0;
        self.pending_effect = None;
        self.last_card_player_index = None;
        self.finish_order.clear();
        self.event_log.clear();
        for player in &mut self.players {
            player.hand.clear();
            player.finished = false;
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if !self.players.is_empty() && self.current_player_index >= self.players.len() {
            return Err(IntegrityError::InvalidPlayerIndex {
                index: self.current_player_index,
            });
        }

        let mut seen = HashSet::new();
        for card in self
            .players
            .iter()
            .flat_map(|player| player.hand.iter())
            .chain(self.field.last_played_cards.iter())
        {
            if !seen.insert(card.id) {
                return Err(IntegrityError::DuplicateCardId { card_id: card.id });
            }
        }
        if seen.len() > DECK_SIZE {
            return Err(IntegrityError::CardCountMismatch { count: seen.len() });
        }

        Ok(())
    }

    /// Read-only view handed to the presentation layer after each action.
    pub fn snapshot(&self) -> MatchSnapshot {
        let playable = match (self.phase, self.pending_effect, self.current_player()) {
            (GamePhase::Playing, None, Some(player)) => {
                playable_card_ids(&player.hand, &self.field).into_iter().collect()
            }
            _ => Vec::new(),
        };

        MatchSnapshot {
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|player| PlayerView {
                    id: player.id,
                    name: player.name.clone(),
                    hand_size: player.hand.len(),
                    hand: player.hand.clone(),
                    finished: player.finished,
                })
                .collect(),
            current_player_index: self.current_player_index,
            field: self.field.clone(),
            pass_count: self.pass_count,
            pending_effect: self.pending_effect,
            finish_order: self.finish_order.clone(),
            playable_card_ids: playable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub hand_size: usize,
    pub hand: Vec<Card>,
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub phase: GamePhase,
    pub players: Vec<PlayerView>,
    pub current_player_index: usize,
    pub field: FieldState,
    pub pass_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_effect: Option<PendingEffect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finish_order: Vec<PlayerId>,
    /// Advisory only; the play itself is validated again.
    pub playable_card_ids: Vec<CardId>,
}
