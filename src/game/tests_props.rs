/// Property-based tests for dealing, card strength and locks.
use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::cards::{Rank, Suit, DECK_SIZE};
use super::evaluator::{check_play, is_stronger, playable_card_ids, PlayViolation};
use super::field::FieldState;
use super::rules::{CardSelection, RuleEngine};
use super::state::deal_hands;
use super::test_helpers::{c, joker, playing_state};

fn suit() -> impl Strategy<Value = Suit> {
    prop::sample::select(Suit::STANDARD.to_vec())
}

fn rank() -> impl Strategy<Value = Rank> {
    prop::sample::select(Rank::STANDARD.to_vec())
}

fn hand() -> impl Strategy<Value = Vec<(Suit, Rank)>> {
    prop::collection::btree_set((suit(), rank()), 1..12)
        .prop_map(|cards| cards.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every deal hands out the whole deck exactly once, in near-equal shares.
    #[test]
    fn prop_deal_covers_deck(player_count in 3usize..=5, seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let hands = deal_hands(player_count, &mut rng).expect("deal should succeed");

        prop_assert_eq!(hands.len(), player_count);
        let ids: HashSet<_> = hands.iter().flatten().map(|card| card.id).collect();
        prop_assert_eq!(ids.len(), DECK_SIZE);
        prop_assert_eq!(hands.iter().map(Vec::len).sum::<usize>(), DECK_SIZE);

        let base = DECK_SIZE / player_count;
        let remainder = DECK_SIZE % player_count;
        for hand in &hands {
            prop_assert!(hand.len() >= base && hand.len() <= base + remainder);
        }
    }

    /// Between two different ranks exactly one is stronger, under any flags.
    #[test]
    fn prop_strength_is_antisymmetric(
        a in rank(),
        b in rank(),
        revolution in any::<bool>(),
        reversal in any::<bool>(),
    ) {
        prop_assume!(a != b);
        let (left, right) = (c(Suit::Spade, a), c(Suit::Heart, b));
        prop_assert_ne!(
            is_stronger(&left, &right, revolution, reversal),
            is_stronger(&right, &left, revolution, reversal)
        );
    }

    /// The joker beats every plain card and no plain card beats it.
    #[test]
    fn prop_joker_dominates(
        s in suit(),
        r in rank(),
        revolution in any::<bool>(),
        reversal in any::<bool>(),
    ) {
        let plain = c(s, r);
        prop_assert!(is_stronger(&joker(), &plain, revolution, reversal));
        prop_assert!(!is_stronger(&plain, &joker(), revolution, reversal));
    }

    /// A suit-locked field rejects any plain card of another suit.
    #[test]
    fn prop_suit_lock_rejects_other_suits(
        locked in suit(),
        other in suit(),
        field_rank in rank(),
        play_rank in rank(),
        revolution in any::<bool>(),
    ) {
        prop_assume!(locked != other);
        let field = FieldState {
            last_played_cards: vec![c(locked, field_rank)],
            suit_lock: Some(locked),
            is_revolution: revolution,
            ..FieldState::default()
        };
        prop_assert_eq!(
            check_play(&[c(other, play_rank)], &field),
            Err(PlayViolation::SuitLocked { suit: locked })
        );
    }

    /// A single five from any seat of four skips exactly the next seat.
    #[test]
    fn prop_single_five_skips_one(actor in 0usize..4) {
        let hands = Suit::STANDARD
            .iter()
            .map(|&s| vec![c(s, Rank::Five), c(s, Rank::Queen)])
            .collect();
        let mut state = playing_state(hands);
        state.current_player_index = actor;
        let player_id = state.players[actor].id;

        RuleEngine::new()
            .play_cards(&mut state, CardSelection::new(player_id, vec![c(Suit::STANDARD[actor], Rank::Five).id]))
            .expect("lead with a five");

        prop_assert_eq!(state.current_player_index, (actor + 2) % 4);
        prop_assert_eq!(state.pass_count, 0);
    }

    /// The advisory never points outside the hand, and on an empty field it
    /// marks everything.
    #[test]
    fn prop_advisory_stays_inside_hand(
        cards in hand(),
        field_card in (suit(), rank()),
        reversal in any::<bool>(),
    ) {
        let hand: Vec<_> = cards.iter().map(|&(s, r)| c(s, r)).collect();
        let hand_ids: HashSet<_> = hand.iter().map(|card| card.id).collect();

        let empty = playable_card_ids(&hand, &FieldState::default());
        prop_assert_eq!(empty.len(), hand.len());

        let field = FieldState {
            last_played_cards: vec![c(field_card.0, field_card.1)],
            is_enabled_reversal: reversal,
            ..FieldState::default()
        };
        for id in playable_card_ids(&hand, &field) {
            prop_assert!(hand_ids.contains(&id));
        }
    }
}
