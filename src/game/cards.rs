use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cards in a full deck: four suits of thirteen ranks plus one joker.
pub const DECK_SIZE: usize = 53;

/// Identity of a physical card, unique within one deck.
pub type CardId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
    Joker,
}

impl Suit {
    pub const STANDARD: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];
}

/// Card rank. Three is the weakest and Two the strongest in normal order;
/// `Joker` is a sentinel that never takes part in rank comparisons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
    Two = 15,
    Joker = 99,
}

impl Rank {
    pub const STANDARD: [Rank; 13] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Looks up a standard rank by its ordering value (3..=15).
    pub fn from_value(value: u8) -> Option<Rank> {
        Self::STANDARD.iter().copied().find(|rank| rank.value() == value)
    }

    /// The rank one step away in the given direction, if it exists.
    pub fn step(self, descending: bool) -> Option<Rank> {
        if self == Rank::Joker {
            return None;
        }
        let next = if descending {
            self.value().checked_sub(1)?
        } else {
            self.value() + 1
        };
        Self::from_value(next)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(id: CardId, suit: Suit, rank: Rank) -> Self {
        Self { id, suit, rank }
    }

    pub fn joker(id: CardId) -> Self {
        Self {
            id,
            suit: Suit::Joker,
            rank: Rank::Joker,
        }
    }

    pub fn is_joker(&self) -> bool {
        self.suit == Suit::Joker && self.rank == Rank::Joker
    }
}

/// The 53-card deck owned by a match for the duration of one deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds an unshuffled deck. Identities run 0..=52, the joker last.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::STANDARD {
            for rank in Rank::STANDARD {
                cards.push(Card::new(cards.len() as CardId, suit, rank));
            }
        }
        cards.push(Card::joker(cards.len() as CardId));
        Self { cards }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Removes and returns the front card.
    pub fn draw(&mut self) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        Some(self.cards.remove(0))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
