use core::fmt;
use core::ops::Index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

/// Number of distinct symbols, each dealt twice.
pub const PAIR_COUNT: u8 = 4;

/// Number of cards in one deal.
pub const CARD_COUNT: usize = PAIR_COUNT as usize * 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    A,
    B,
    C,
    D,
}

impl Symbol {
    pub const ALL: [Symbol; PAIR_COUNT as usize] = [Symbol::A, Symbol::B, Symbol::C, Symbol::D];

    pub const fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One game piece. `revealed` covers both transiently face-up and matched cards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    symbol: Symbol,
    revealed: bool,
    matched: bool,
}

impl Card {
    pub const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            revealed: false,
            matched: false,
        }
    }

    pub const fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub const fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub const fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn reveal(&mut self) {
        self.revealed = true;
    }

    pub(crate) fn hide(&mut self) {
        if !self.matched {
            self.revealed = false;
        }
    }

    pub(crate) fn mark_matched(&mut self) {
        self.revealed = true;
        self.matched = true;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: [Card; CARD_COUNT],
}

impl Deck {
    /// Sorted deck, `[A, A, B, B, C, C, D, D]`.
    pub fn ordered() -> Self {
        let mut symbols = [Symbol::A; CARD_COUNT];
        for (pair, symbol) in Symbol::ALL.into_iter().enumerate() {
            symbols[pair * 2] = symbol;
            symbols[pair * 2 + 1] = symbol;
        }
        Self::from_symbols_unchecked(symbols)
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        shuffle(&mut deck.cards, rng);
        deck
    }

    /// Builds a deck in a fixed order, checking that every symbol appears exactly twice.
    pub fn from_symbols(symbols: [Symbol; CARD_COUNT]) -> Result<Self> {
        let balanced = Symbol::ALL
            .iter()
            .all(|symbol| symbols.iter().filter(|&s| s == symbol).count() == 2);
        if balanced {
            Ok(Self::from_symbols_unchecked(symbols))
        } else {
            Err(GameError::InvalidDeck)
        }
    }

    fn from_symbols_unchecked(symbols: [Symbol; CARD_COUNT]) -> Self {
        Self {
            cards: symbols.map(Card::new),
        }
    }

    pub fn symbols(&self) -> [Symbol; CARD_COUNT] {
        self.cards.map(|card| card.symbol)
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(usize::from(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CardId, &Card)> {
        (0..).zip(self.cards.iter())
    }

    pub(crate) fn validate_id(&self, id: CardId) -> Result<CardId> {
        if usize::from(id) < self.cards.len() {
            Ok(id)
        } else {
            Err(GameError::InvalidCard)
        }
    }

    pub(crate) fn card_mut(&mut self, id: CardId) -> &mut Card {
        &mut self.cards[usize::from(id)]
    }
}

impl Index<CardId> for Deck {
    type Output = Card;

    fn index(&self, id: CardId) -> &Self::Output {
        &self.cards[usize::from(id)]
    }
}

/// Fisher-Yates: walks from the last slot down to 1, swapping each with a uniformly chosen slot in `0..=i`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
