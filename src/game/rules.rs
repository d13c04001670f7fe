use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{
    cards::{Card, CardId},
    config::MatchConfig,
    effects::{CardEffect, PendingEffect},
    evaluator::{check_play, detect_sequence_lock, detect_suit_lock, PlayViolation},
    state::{
        deal_hands, ClearReason, GameEvent, GamePhase, GameState, IntegrityError, MatchSnapshot,
        Player, PlayerId,
    },
};

/// A group of cards chosen by one player: a play, a transfer or a discard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardSelection {
    pub player_id: PlayerId,
    #[serde(default)]
    pub card_ids: Vec<CardId>,
}

impl CardSelection {
    pub fn new(player_id: PlayerId, card_ids: impl Into<Vec<CardId>>) -> Self {
        Self {
            player_id,
            card_ids: card_ids.into(),
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("player bounds {min_players}..={max_players} are outside 3..=5")]
    InvalidConfig {
        min_players: usize,
        max_players: usize,
    },
    #[error("{count} players registered, need {min_players}..={max_players}")]
    InvalidPlayerCount {
        count: usize,
        min_players: usize,
        max_players: usize,
    },
    #[error("roster is full ({max_players} players)")]
    RosterFull { max_players: usize },
    #[error("player {player_id} not found")]
    PlayerNotFound { player_id: PlayerId },
    #[error("expected phase {expected:?}, match is in {actual:?}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("not this player's turn")]
    NotPlayerTurn,
    #[error("pending {effect:?} must be resolved first")]
    PendingEffectUnresolved { effect: PendingEffect },
    #[error("no pending effect to resolve")]
    NoPendingEffect,
    #[error("pending effect is {pending:?}")]
    PendingEffectMismatch { pending: PendingEffect },
    #[error("no cards selected")]
    EmptySelection,
    #[error("card {card_id} selected twice")]
    DuplicateCard { card_id: CardId },
    #[error("card {card_id} not in hand")]
    CardNotFound { card_id: CardId },
    #[error("selection needs {required} cards, got {actual}")]
    SelectionSizeMismatch { required: usize, actual: usize },
    #[error("illegal play: {violation}")]
    IllegalPlay { violation: PlayViolation },
    #[error("the leader cannot pass on an empty field")]
    MustLead,
    #[error("integrity violation: {error}")]
    IntegrityViolation { error: IntegrityError },
}

/// What an action did, and the table afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub snapshot: MatchSnapshot,
    pub events: Vec<GameEvent>,
}

impl RuleResolution {
    pub fn new(state: &GameState, events: Vec<GameEvent>) -> Self {
        Self {
            snapshot: state.snapshot(),
            events,
        }
    }
}

/// Drives a match. Every action validates fully before it touches state, so a
/// rejected action leaves the match exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: MatchConfig,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatchConfig) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    fn ensure_phase(state: &GameState, expected: GamePhase) -> Result<(), RuleError> {
        if state.phase != expected {
            return Err(RuleError::InvalidPhase {
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &GameState, player_id: PlayerId) -> Result<(), RuleError> {
        let current = state.current_player().ok_or(RuleError::NotPlayerTurn)?;
        if current.id != player_id {
            if state.get_player(player_id).is_none() {
                return Err(RuleError::PlayerNotFound { player_id });
            }
            return Err(RuleError::NotPlayerTurn);
        }
        Ok(())
    }

    fn ensure_no_pending(state: &GameState) -> Result<(), RuleError> {
        match state.pending_effect {
            Some(effect) => Err(RuleError::PendingEffectUnresolved { effect }),
            None => Ok(()),
        }
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// Common gate for in-play actions by the current player.
    fn ensure_can_act(state: &GameState, player_id: PlayerId) -> Result<(), RuleError> {
        Self::ensure_phase(state, GamePhase::Playing)?;
        Self::ensure_integrity(state)?;
        Self::ensure_turn_owner(state, player_id)
    }

    /// Looks up the selected cards in the current player's hand without
    /// removing them.
    fn select_cards(state: &GameState, card_ids: &[CardId]) -> Result<Vec<Card>, RuleError> {
        if card_ids.is_empty() {
            return Err(RuleError::EmptySelection);
        }
        let player = state.current_player().ok_or(RuleError::NotPlayerTurn)?;
        let mut seen = HashSet::new();
        card_ids
            .iter()
            .map(|&card_id| {
                if !seen.insert(card_id) {
                    return Err(RuleError::DuplicateCard { card_id });
                }
                player
                    .find_card_in_hand_index(card_id)
                    .map(|idx| player.hand[idx])
                    .ok_or(RuleError::CardNotFound { card_id })
            })
            .collect()
    }

    fn record_all(state: &mut GameState, events: &[GameEvent]) {
        for event in events {
            state.record_event(event.clone());
        }
    }

    fn set_phase(state: &mut GameState, phase: GamePhase, events: &mut Vec<GameEvent>) {
        let from = state.phase;
        state.phase = phase;
        events.push(GameEvent::PhaseChanged { from, to: phase });
    }

    /// Marks the seat finished; moves the match to the result phase when at
    /// most one player is left holding cards.
    fn finish_player(state: &mut GameState, seat: usize, events: &mut Vec<GameEvent>) -> bool {
        let player_id = state.players[seat].id;
        state.players[seat].finished = true;
        state.finish_order.push(player_id);
        let place = state.finish_order.len();
        info!(player_id, place, "player finished");
        events.push(GameEvent::PlayerFinished { player_id, place });

        if state.active_player_count() <= 1 {
            Self::set_phase(state, GamePhase::Result, events);
            info!(finish_order = ?state.finish_order, "match ended");
            events.push(GameEvent::MatchEnded {
                finish_order: state.finish_order.clone(),
            });
            return true;
        }
        false
    }

    pub fn add_player(
        &self,
        state: &mut GameState,
        name: impl Into<String>,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Lobby)?;
        if state.players.len() >= self.config.max_players {
            return Err(RuleError::RosterFull {
                max_players: self.config.max_players,
            });
        }

        // Ids freed by players who left are handed out again.
        let player_id = state.free_player_id().ok_or(RuleError::RosterFull {
            max_players: self.config.max_players,
        })?;
        let player = Player::new(player_id, name);
        let event = GameEvent::PlayerJoined {
            player_id,
            name: player.name.clone(),
        };
        state.players.push(player);
        debug!(player_id, "player joined");

        let events = vec![event];
        Self::record_all(state, &events);
        Ok(events)
    }

    pub fn remove_player(
        &self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Lobby)?;
        let index = state
            .player_index(player_id)
            .ok_or(RuleError::PlayerNotFound { player_id })?;
        state.players.remove(index);
        debug!(player_id, "player left");

        let events = vec![GameEvent::PlayerLeft { player_id }];
        Self::record_all(state, &events);
        Ok(events)
    }

    /// Lobby → dealing → playing.
    pub fn start_game<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Lobby)?;
        let player_count = state.players.len();
        if !self.config.allows(player_count) {
            return Err(RuleError::InvalidPlayerCount {
                count: player_count,
                min_players: self.config.min_players,
                max_players: self.config.max_players,
            });
        }

        let hands = deal_hands(player_count, rng)
            .map_err(|error| RuleError::IntegrityViolation { error })?;

        state.reset_match();
        let mut events = vec![GameEvent::MatchStarted { player_count }];
        Self::set_phase(state, GamePhase::Dealing, &mut events);

        for (player, hand) in state.players.iter_mut().zip(hands) {
            events.push(GameEvent::CardsDealt {
                player_id: player.id,
                count: hand.len(),
            });
            player.hand = hand;
        }
        state.sort_all_hands();

        Self::set_phase(state, GamePhase::Playing, &mut events);
        info!(player_count, "match started");

        Self::record_all(state, &events);
        Ok(events)
    }

    pub fn play_cards(
        &self,
        state: &mut GameState,
        selection: CardSelection,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_can_act(state, selection.player_id)?;
        Self::ensure_no_pending(state)?;

        let cards = Self::select_cards(state, &selection.card_ids)?;
        check_play(&cards, &state.field).map_err(|violation| RuleError::IllegalPlay { violation })?;

        let actor = state.current_player_index;
        let effect = CardEffect::for_cards(&cards);
        let revolution = state.field.is_revolution;
        let reversal = state.field.is_enabled_reversal;
        // Locks compare against the group being covered, so read them first.
        let locks = (
            detect_suit_lock(&cards, &state.field),
            detect_sequence_lock(&cards, &state.field, revolution, reversal),
        );

        let played = state.players[actor].remove_cards(&selection.card_ids);
        state.field.last_played_cards = played.clone();
        state.field.last_played_player_index = Some(actor);
        state.last_card_player_index = Some(actor);
        state.pass_count = 0;

        debug!(player_id = selection.player_id, ?effect, count = played.len(), "cards played");
        let mut events = vec![GameEvent::CardsPlayed {
            player_id: selection.player_id,
            cards: played,
        }];

        if state.players[actor].hand.is_empty() {
            if !Self::finish_player(state, actor, &mut events) {
                state.advance_turn();
            }
            Self::record_all(state, &events);
            return Ok(events);
        }

        if effect != CardEffect::Clear {
            let (suit_lock, sequence_lock) = locks;
            if state.field.suit_lock != suit_lock || state.field.sequence_lock != sequence_lock {
                events.push(GameEvent::LocksUpdated {
                    suit_lock,
                    sequence_lock,
                });
            }
            state.field.suit_lock = suit_lock;
            state.field.sequence_lock = sequence_lock;
        }

        let resolution = effect.apply(actor, state);
        events.extend(resolution.events);

        Self::record_all(state, &events);
        Ok(events)
    }

    pub fn pass(
        &self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_can_act(state, player_id)?;
        Self::ensure_no_pending(state)?;
        if state.field.is_empty() {
            return Err(RuleError::MustLead);
        }

        state.pass_count += 1;
        let mut events = vec![GameEvent::Passed {
            player_id,
            pass_count: state.pass_count,
        }];

        let active = state.active_player_count();
        if state.pass_count + 1 >= active {
            state.reset_field();
            if let Some(last) = state.last_card_player_index {
                state.current_player_index = last;
                if state.players[last].finished {
                    state.advance_turn();
                }
            }
            let leader = state.players[state.current_player_index].id;
            debug!(leader, "field cleared after passes");
            events.push(GameEvent::FieldCleared {
                reason: ClearReason::AllPassed,
                leader,
            });
        } else {
            state.advance_turn();
        }

        Self::record_all(state, &events);
        Ok(events)
    }

    /// Checks a transfer/discard selection against the pending obligation.
    fn pending_selection(
        state: &GameState,
        selection: &CardSelection,
        expect_transfer: bool,
    ) -> Result<(), RuleError> {
        Self::ensure_can_act(state, selection.player_id)?;
        let pending = state.pending_effect.ok_or(RuleError::NoPendingEffect)?;
        let matches = matches!(
            (pending, expect_transfer),
            (PendingEffect::Transfer { .. }, true) | (PendingEffect::Discard { .. }, false)
        );
        if !matches {
            return Err(RuleError::PendingEffectMismatch { pending });
        }

        let cards = Self::select_cards(state, &selection.card_ids)?;
        if cards.len() != pending.count() {
            return Err(RuleError::SelectionSizeMismatch {
                required: pending.count(),
                actual: cards.len(),
            });
        }
        Ok(())
    }

    /// Seat receiving a seven-transfer: the next player still in the match.
    /// Finished seats are passed over even when they sit immediately next,
    /// so a player who went out never gets cards back.
    fn transfer_recipient(state: &GameState, from: usize) -> usize {
        let seats = state.players.len();
        (1..seats)
            .map(|offset| (from + offset) % seats)
            .find(|&seat| !state.players[seat].finished)
            .unwrap_or((from + 1) % seats)
    }

    /// Clears a settled obligation and moves on. An actor left without cards
    /// finishes like after a winning play.
    fn close_obligation(state: &mut GameState, actor: usize, events: &mut Vec<GameEvent>) {
        state.pending_effect = None;
        if state.players[actor].hand.is_empty() && Self::finish_player(state, actor, events) {
            return;
        }
        state.advance_turn();
    }

    pub fn resolve_transfer(
        &self,
        state: &mut GameState,
        selection: CardSelection,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::pending_selection(state, &selection, true)?;

        let actor = state.current_player_index;
        let recipient = Self::transfer_recipient(state, actor);
        let cards = state.players[actor].remove_cards(&selection.card_ids);
        state.players[recipient].hand.extend(cards.iter().copied());
        state.sort_hand_at(recipient);

        let to = state.players[recipient].id;
        debug!(from = selection.player_id, to, count = cards.len(), "cards transferred");
        let mut events = vec![GameEvent::CardsTransferred {
            from: selection.player_id,
            to,
            cards,
        }];
        Self::close_obligation(state, actor, &mut events);

        Self::record_all(state, &events);
        Ok(events)
    }

    pub fn resolve_discard(
        &self,
        state: &mut GameState,
        selection: CardSelection,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::pending_selection(state, &selection, false)?;

        let actor = state.current_player_index;
        let cards = state.players[actor].remove_cards(&selection.card_ids);
        debug!(player_id = selection.player_id, count = cards.len(), "cards discarded");
        let mut events = vec![GameEvent::CardsDiscarded {
            player_id: selection.player_id,
            cards,
        }];
        Self::close_obligation(state, actor, &mut events);

        Self::record_all(state, &events);
        Ok(events)
    }

    /// Drops the pending obligation without moving any card.
    pub fn skip_pending_effect(
        &self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_can_act(state, player_id)?;
        let effect = state.pending_effect.ok_or(RuleError::NoPendingEffect)?;

        state.pending_effect = None;
        state.advance_turn();

        let events = vec![GameEvent::PendingEffectSkipped { player_id, effect }];
        Self::record_all(state, &events);
        Ok(events)
    }

    /// Result → lobby. Keeps the roster, clears everything else.
    pub fn return_to_lobby(&self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, GamePhase::Result)?;
        state.reset_match();
        state.phase = GamePhase::Lobby;
        info!("returned to lobby");

        let events = vec![GameEvent::ReturnedToLobby];
        Self::record_all(state, &events);
        Ok(events)
    }

    fn move_phase(
        state: &mut GameState,
        from: GamePhase,
        to: GamePhase,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_phase(state, from)?;
        let mut events = Vec::new();
        Self::set_phase(state, to, &mut events);
        Self::record_all(state, &events);
        Ok(events)
    }

    /// Playing → wolf action. Reserved; no rules run in that phase.
    pub fn move_to_wolf_action(&self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::move_phase(state, GamePhase::Playing, GamePhase::WolfAction)
    }

    /// Wolf action → voting. Reserved.
    pub fn move_to_voting(&self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::move_phase(state, GamePhase::WolfAction, GamePhase::Voting)
    }

    /// Voting → result. Reserved.
    pub fn move_to_result(&self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        Self::move_phase(state, GamePhase::Voting, GamePhase::Result)
    }
}
