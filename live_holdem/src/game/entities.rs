use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    #[serde(rename = "hearts")]
    Heart,
    #[serde(rename = "diamonds")]
    Diamond,
    #[serde(rename = "clubs")]
    Club,
    #[serde(rename = "spades")]
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Self::Heart, Self::Diamond, Self::Club, Self::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Card rank, deuce low and ace high. The numeric value is what hand
/// evaluation compares on.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two = 2,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
    ];

    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Jack => "J".to_string(),
            Self::Queen => "Q".to_string(),
            Self::King => "K".to_string(),
            Self::Ace => "A".to_string(),
            other => other.value().to_string(),
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.rank, self.suit);
        write!(f, "{repr:>4}")
    }
}

pub const DECK_SIZE: usize = 52;

/// A full 52-card deck dealt from the front. Dealing only advances
/// `deck_idx`; shuffling replaces the order wholesale and rewinds.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    deck_idx: usize,
}

impl Deck {
    /// A freshly shuffled deck.
    #[must_use]
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        DECK_SIZE - self.deck_idx
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }

    /// Deals `count` cards from the front. A deck that can't cover the
    /// whole request is replaced by a fresh shuffled one first.
    pub fn deal_cards(&mut self, count: usize) -> Vec<Card> {
        if self.remaining() < count {
            log::warn!(
                "Deck has {} cards left, {} requested. Reshuffling a full deck.",
                self.remaining(),
                count
            );
            self.shuffle();
        }
        let dealt = self.cards[self.deck_idx..self.deck_idx + count].to_vec();
        self.deck_idx += count;
        dealt
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card::new(Rank::Two, Suit::Heart); DECK_SIZE];
        for (i, suit) in Suit::ALL.into_iter().enumerate() {
            for (j, rank) in Rank::ALL.into_iter().enumerate() {
                cards[13 * i + j] = Card::new(rank, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Whole chips. Stacks, bets and pots never go negative.
pub type Chips = u32;

/// Type alias for seat positions in a table's roster.
pub type SeatIndex = usize;

pub type PlayerId = String;

pub type TableId = String;

/// Short random identifier used for players and tables.
#[must_use]
pub fn generate_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Default display name for a freshly connected player.
#[must_use]
pub fn generate_player_name() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    let suffix: String = (0..4)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("Player {suffix}")
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    /// Phases in which players take betting actions.
    #[must_use]
    pub fn is_betting(self) -> bool {
        matches!(self, Self::Preflop | Self::Flop | Self::Turn | Self::River)
    }

    /// Number of community cards on the board during this phase.
    #[must_use]
    pub fn board_size(self) -> usize {
        match self {
            Self::Waiting | Self::Preflop => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::River | Self::Showdown => 5,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

/// A wagering action. Amounts on `Bet` and `Raise` are the chips the
/// player adds on top of their current street bet.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(Chips),
    Raise(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "folds"),
            Self::Check => write!(f, "checks"),
            Self::Call => write!(f, "calls"),
            Self::Bet(amount) => write!(f, "bets {amount}"),
            Self::Raise(amount) => write!(f, "raises by {amount}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = format!("{}/{}", self.small, self.big);
        write!(f, "{repr}")
    }
}

/// A seated player. Owned by exactly one table's roster; connection
/// handlers only ever refer to it by `id`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub bet: Chips,
    pub hole_cards: Vec<Card>,
    pub folded: bool,
    pub connected: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: String, stack: Chips) -> Self {
        Self {
            id,
            name,
            stack,
            bet: 0,
            hole_cards: Vec::with_capacity(2),
            folded: false,
            connected: true,
        }
    }

    /// Connected and still holding cards this hand.
    #[must_use]
    pub fn is_contending(&self) -> bool {
        self.connected && !self.folded
    }

    /// A contender who still has chips behind and so can act.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.is_contending() && self.stack > 0
    }

    /// Moves up to `amount` from the stack into the street bet and
    /// returns what actually moved.
    pub fn commit(&mut self, amount: Chips) -> Chips {
        let moved = amount.min(self.stack);
        self.stack -= moved;
        self.bet += moved;
        moved
    }

    pub fn reset_for_hand(&mut self) {
        self.hole_cards.clear();
        self.bet = 0;
        self.folded = false;
    }
}

/// One roster entry as a particular viewer is allowed to see it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub chips: Chips,
    pub bet: Chips,
    pub hole_cards: Vec<Card>,
    pub folded: bool,
    pub active: bool,
}

/// Per-viewer table snapshot pushed as the `gameState` payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub id: TableId,
    pub players: Vec<PlayerView>,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub current_turn: SeatIndex,
    pub dealer: SeatIndex,
    pub small_blind: Chips,
    pub big_blind: Chips,
    #[serde(rename = "state")]
    pub phase: Phase,
    pub your_turn: bool,
}
