use crate::error::GameError;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of cards in a Neapolitan deck.
pub const DECK_SIZE: usize = 40;

// --- Core data structures ---

/// Suit of an Italian deck.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Denari,
    Coppe,
    Spade,
    Bastoni,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Denari, Suit::Coppe, Suit::Spade, Suit::Bastoni];
}

/// A single card. `value` is always in `1..=10`.
///
/// On the wire a card is `{suit, value, label}`; the label is derived and
/// ignored when decoding.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "CardRepr", try_from = "CardRepr")]
pub struct Card {
    suit: Suit,
    value: u8,
}

#[derive(Serialize, Deserialize)]
struct CardRepr {
    suit: Suit,
    value: u8,
    #[serde(default, skip_deserializing)]
    label: String,
}

impl Card {
    /// # Panics
    /// If `value` is outside `1..=10`.
    pub const fn new(value: u8, suit: Suit) -> Card {
        assert!(value >= 1 && value <= 10, "card value must be in 1..=10");
        Card { suit, value }
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn label(&self) -> &'static str {
        match self.value {
            1 => "Asso",
            2 => "2",
            3 => "3",
            4 => "4",
            5 => "5",
            6 => "6",
            7 => "7",
            8 => "Fante",
            9 => "Cavallo",
            _ => "Re",
        }
    }

    pub fn is_ace(&self) -> bool {
        self.value == 1
    }

    /// The seven of Denari.
    pub fn is_settebello(&self) -> bool {
        self.suit == Suit::Denari && self.value == 7
    }

    /// The king of Denari.
    pub fn is_rebello(&self) -> bool {
        self.suit == Suit::Denari && self.value == 10
    }
}

impl From<Card> for CardRepr {
    fn from(card: Card) -> Self {
        CardRepr {
            suit: card.suit,
            value: card.value,
            label: card.label().to_string(),
        }
    }
}

impl TryFrom<CardRepr> for Card {
    type Error = GameError;

    fn try_from(repr: CardRepr) -> Result<Self, Self::Error> {
        if !(1..=10).contains(&repr.value) {
            return Err(GameError::InvalidCardValue(repr.value));
        }
        Ok(Card { suit: repr.suit, value: repr.value })
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Denari => "Denari",
            Suit::Coppe => "Coppe",
            Suit::Spade => "Spade",
            Suit::Bastoni => "Bastoni",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} di {}", self.label(), self.suit)
    }
}

// --- Deck ---

/// The 40-card deck. Cards are dealt from the front and never put back.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A freshly shuffled deck.
    pub fn new() -> Deck {
        Deck::shuffled_with(&mut rand::rng())
    }

    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut deck = Deck::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// Every (suit, value) pair, value-major, unshuffled.
    pub fn ordered() -> Deck {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for value in 1..=10 {
            for suit in Suit::ALL {
                cards.push(Card { suit, value });
            }
        }
        Deck { cards }
    }

    /// Builds a deck with a fixed order. Dealing takes cards from the front.
    pub fn from_cards(cards: Vec<Card>) -> Deck {
        Deck { cards }
    }

    /// Removes and returns the first `n` cards (fewer if the deck runs out).
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let n = n.min(self.cards.len());
        self.cards.drain(..n).collect()
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

// --- Unit tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_deck_is_full_cross_product() {
        let deck = Deck::new();
        assert_eq!(deck.len(), DECK_SIZE);

        let unique: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(unique.len(), DECK_SIZE);
        for suit in Suit::ALL {
            for value in 1..=10 {
                assert!(unique.contains(&Card::new(value, suit)), "missing {value} of {suit}");
            }
        }
    }

    #[test]
    fn test_four_deals_exhaust_the_deck() {
        let mut deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(7));
        let hands: Vec<Vec<Card>> = (0..4).map(|_| deck.deal(10)).collect();

        assert!(deck.is_empty());
        let mut seen = HashSet::new();
        for hand in &hands {
            assert_eq!(hand.len(), 10);
            for card in hand {
                assert!(seen.insert(*card), "{card} dealt twice");
            }
        }
        assert_eq!(seen.len(), DECK_SIZE);
    }

    #[test]
    fn test_deal_takes_from_the_front() {
        let mut deck = Deck::ordered();
        let first = deck.deal(2);
        assert_eq!(first, vec![Card::new(1, Suit::Denari), Card::new(1, Suit::Coppe)]);
        assert_eq!(deck.cards()[0], Card::new(1, Suit::Spade));
        assert_eq!(deck.deal(100).len(), 38);
        assert!(deck.deal(1).is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Card::new(1, Suit::Coppe).label(), "Asso");
        assert_eq!(Card::new(5, Suit::Coppe).label(), "5");
        assert_eq!(Card::new(8, Suit::Spade).label(), "Fante");
        assert_eq!(Card::new(9, Suit::Spade).label(), "Cavallo");
        assert_eq!(Card::new(10, Suit::Denari).label(), "Re");
        assert_eq!(Card::new(7, Suit::Denari).to_string(), "7 di Denari");
    }

    #[test]
    fn test_card_json_shape() {
        let json = serde_json::to_value(Card::new(9, Suit::Bastoni)).unwrap();
        assert_eq!(json, serde_json::json!({"suit": "Bastoni", "value": 9, "label": "Cavallo"}));

        let back: Card = serde_json::from_value(json).unwrap();
        assert_eq!(back, Card::new(9, Suit::Bastoni));

        let bad = serde_json::from_str::<Card>(r#"{"suit":"Coppe","value":11}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_values_outside_range_never_make_a_card() {
        for value in [0, 11, 255] {
            let json = format!(r#"{{"suit":"Denari","value":{value}}}"#);
            assert!(serde_json::from_str::<Card>(&json).is_err(), "accepted value {value}");
        }
        let card = Card::new(10, Suit::Denari);
        assert_eq!((card.value(), card.suit()), (10, Suit::Denari));
    }

    #[test]
    #[should_panic(expected = "card value must be in 1..=10")]
    fn test_new_rejects_zero() {
        Card::new(0, Suit::Spade);
    }
}
