//! Pure rule evaluation: strength ordering, play legality and lock detection.
//!
//! Nothing here mutates match state. The direction of strength is always
//! derived from `revolution ^ reversal` at the call site.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, CardId, Rank, Suit};
use super::field::{FieldState, SequenceLock};

/// Why a candidate group cannot be played onto the field.
#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PlayViolation {
    #[error("no cards selected")]
    Empty,
    #[error("cards must share a single rank")]
    MixedRanks,
    #[error("field requires {required} cards, got {actual}")]
    CountMismatch { required: usize, actual: usize },
    #[error("suit lock on {suit:?} is active")]
    SuitLocked { suit: Suit },
    #[error("sequence lock requires {required_count} cards of the next rank after {anchor_rank:?}")]
    SequenceBroken {
        anchor_rank: Rank,
        required_count: usize,
    },
    #[error("cards do not beat the field")]
    TooWeak,
}

fn reversed(revolution: bool, reversal: bool) -> bool {
    revolution ^ reversal
}

/// Whether `card` beats `than` under the given flags.
pub fn is_stronger(card: &Card, than: &Card, revolution: bool, reversal: bool) -> bool {
    if card.is_joker() {
        return true;
    }
    if than.is_joker() {
        return false;
    }
    if reversed(revolution, reversal) {
        card.rank.value() < than.rank.value()
    } else {
        card.rank.value() > than.rank.value()
    }
}

/// Compares two rank-homogeneous groups by their first card.
pub fn can_beat(cards: &[Card], field_cards: &[Card], revolution: bool, reversal: bool) -> bool {
    let (Some(candidate), Some(field)) = (cards.first(), field_cards.first()) else {
        return false;
    };
    if cards.iter().any(Card::is_joker) {
        return true;
    }
    if field_cards.iter().any(Card::is_joker) {
        return false;
    }
    is_stronger(candidate, field, revolution, reversal)
}

/// Full legality check with the reason for a rejection.
pub fn check_play(cards: &[Card], field: &FieldState) -> Result<(), PlayViolation> {
    let first = cards.first().ok_or(PlayViolation::Empty)?;
    if cards.iter().any(|card| card.rank != first.rank) {
        return Err(PlayViolation::MixedRanks);
    }

    if field.is_empty() {
        return Ok(());
    }

    let required = field.last_played_count();
    if cards.len() != required {
        return Err(PlayViolation::CountMismatch {
            required,
            actual: cards.len(),
        });
    }

    if let Some(suit) = field.suit_lock {
        if cards.iter().any(|card| !card.is_joker() && card.suit != suit) {
            return Err(PlayViolation::SuitLocked { suit });
        }
    }

    if let Some(lock) = field.sequence_lock {
        if !can_play_with_sequence_lock(
            cards,
            &lock,
            field.is_revolution,
            field.is_enabled_reversal,
        ) {
            return Err(PlayViolation::SequenceBroken {
                anchor_rank: lock.anchor_rank,
                required_count: lock.required_count,
            });
        }
    }

    if !can_beat(
        cards,
        &field.last_played_cards,
        field.is_revolution,
        field.is_enabled_reversal,
    ) {
        return Err(PlayViolation::TooWeak);
    }

    Ok(())
}

pub fn can_play(cards: &[Card], field: &FieldState) -> bool {
    check_play(cards, field).is_ok()
}

pub fn can_play_with_sequence_lock(
    cards: &[Card],
    lock: &SequenceLock,
    revolution: bool,
    reversal: bool,
) -> bool {
    if cards.len() != lock.required_count {
        return false;
    }
    let Some(first) = cards.first() else {
        return false;
    };
    if cards.iter().any(Card::is_joker) {
        return true;
    }
    lock.anchor_rank.step(reversed(revolution, reversal)) == Some(first.rank)
}

/// The suit lock in force after `new_cards` lands on `field`.
///
/// The result replaces whatever lock the field held; `None` means no lock.
pub fn detect_suit_lock(new_cards: &[Card], field: &FieldState) -> Option<Suit> {
    if field.is_empty() {
        return None;
    }

    let non_joker_suits = |cards: &[Card]| -> HashSet<Suit> {
        cards
            .iter()
            .filter(|card| !card.is_joker())
            .map(|card| card.suit)
            .collect()
    };
    let new_suits = non_joker_suits(new_cards);
    let field_suits = non_joker_suits(&field.last_played_cards);

    if new_suits.len() != 1 || field_suits.len() != 1 || new_suits != field_suits {
        return None;
    }
    new_suits.into_iter().next()
}

/// The sequence lock in force after `new_cards` lands on `field`.
pub fn detect_sequence_lock(
    new_cards: &[Card],
    field: &FieldState,
    revolution: bool,
    reversal: bool,
) -> Option<SequenceLock> {
    if field.is_empty() {
        return None;
    }
    let new_rank = new_cards.first()?.rank;
    if new_cards.iter().any(Card::is_joker) {
        return None;
    }
    let descending = reversed(revolution, reversal);

    if let Some(existing) = field.sequence_lock {
        if existing.anchor_rank.step(descending) != Some(new_rank)
            || new_cards.len() != existing.required_count
        {
            return None;
        }
        return Some(SequenceLock {
            anchor_rank: new_rank,
            required_count: existing.required_count,
            ascending: !descending,
        });
    }

    let field_rank = field.last_played_rank()?;
    if field.last_played_cards.iter().any(Card::is_joker) {
        return None;
    }
    if new_cards.iter().any(|card| card.rank != new_rank) {
        return None;
    }
    if new_cards.len() != field.last_played_count() {
        return None;
    }
    if field_rank.step(descending) != Some(new_rank) {
        return None;
    }

    Some(SequenceLock {
        anchor_rank: new_rank,
        required_count: new_cards.len(),
        ascending: !descending,
    })
}

/// Orders strongest first under the given direction. Jokers lead.
pub fn compare_strength(left: &Card, right: &Card, reversed: bool) -> Ordering {
    match (left.is_joker(), right.is_joker()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) if reversed => left.rank.value().cmp(&right.rank.value()),
        (false, false) => right.rank.value().cmp(&left.rank.value()),
    }
}

pub fn sort_hand(hand: &mut [Card], reversed: bool) {
    hand.sort_by(|left, right| compare_strength(left, right, reversed));
}

/// Advisory set of cards worth highlighting for the player holding `hand`.
///
/// A rank is marked when the strongest `n` cards of it would be legal, `n`
/// being the size of the group on the field. The final selection still has
/// to pass [`check_play`].
pub fn playable_card_ids(hand: &[Card], field: &FieldState) -> BTreeSet<CardId> {
    if field.is_empty() {
        return hand.iter().map(|card| card.id).collect();
    }

    let mut by_rank: BTreeMap<Rank, Vec<Card>> = BTreeMap::new();
    for card in hand {
        by_rank.entry(card.rank).or_default().push(*card);
    }

    let required = field.last_played_count();
    let mut playable = BTreeSet::new();
    for (_, mut group) in by_rank {
        if group.len() < required {
            continue;
        }
        sort_hand(&mut group, field.is_reversed());
        if can_play(&group[..required], field) {
            playable.extend(group.iter().map(|card| card.id));
        }
    }
    playable
}

/// Single-card form of the advisory: true when some run of same-rank cards
/// from `hand`, starting with the first, could be played.
pub fn can_play_card(card: &Card, hand: &[Card], field: &FieldState) -> bool {
    if field.is_empty() {
        return true;
    }
    let same_rank: Vec<Card> = hand
        .iter()
        .filter(|other| other.rank == card.rank)
        .copied()
        .collect();
    (1..=same_rank.len()).any(|count| can_play(&same_rank[..count], field))
}
