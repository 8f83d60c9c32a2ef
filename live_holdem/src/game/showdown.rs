//! Winner resolution at showdown.
//!
//! The table hands every remaining contender to a [`WinnerResolver`] and
//! credits whatever awards come back. Two strategies ship with the crate:
//! [`RandomWinner`], which picks one contender at random for the whole pot,
//! and [`BestHand`], a real best-five-of-seven evaluator that splits ties.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{cmp::Reverse, collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use super::entities::{Card, Chips, PlayerId, SeatIndex};

/// A player still holding cards when the hand reaches showdown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contender {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub player_name: String,
    pub hole_cards: Vec<Card>,
}

/// Chips paid to one winner.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Award {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub player_name: String,
    pub amount: Chips,
    /// The winning five cards, when the resolver ranked hands.
    pub hand: Option<Vec<Card>>,
    pub hand_rank: Option<String>,
}

impl Award {
    /// The whole pot to the last player standing.
    #[must_use]
    pub fn uncontested(contender: &Contender, pot: Chips) -> Self {
        Self {
            seat: contender.seat,
            player_id: contender.player_id.clone(),
            player_name: contender.player_name.clone(),
            amount: pot,
            hand: None,
            hand_rank: Some("uncontested".to_string()),
        }
    }

    fn plain(contender: &Contender, amount: Chips) -> Self {
        Self {
            seat: contender.seat,
            player_id: contender.player_id.clone(),
            player_name: contender.player_name.clone(),
            amount,
            hand: None,
            hand_rank: None,
        }
    }
}

/// Decides who wins a contested pot.
///
/// Implementations receive at least two contenders (in seat order) and
/// must return awards whose amounts sum to `pot`.
pub trait WinnerResolver: Send + Sync {
    fn resolve(&self, contenders: &[Contender], board: &[Card], pot: Chips) -> Vec<Award>;
}

/// Placeholder resolver: one uniformly random contender takes the pot.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomWinner;

impl WinnerResolver for RandomWinner {
    fn resolve(&self, contenders: &[Contender], _board: &[Card], pot: Chips) -> Vec<Award> {
        if contenders.is_empty() {
            return Vec::new();
        }
        let idx = rand::rng().random_range(0..contenders.len());
        vec![Award::plain(&contenders[idx], pot)]
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "High Card",
            Self::OnePair => "One Pair",
            Self::TwoPair => "Two Pair",
            Self::ThreeOfAKind => "Three of a Kind",
            Self::Straight => "Straight",
            Self::Flush => "Flush",
            Self::FullHouse => "Full House",
            Self::FourOfAKind => "Four of a Kind",
            Self::StraightFlush => "Straight Flush",
        };
        write!(f, "{repr}")
    }
}

/// Comparable strength of a five-card hand. Category dominates; `values`
/// break ties, most significant first.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HandStrength {
    pub category: HandCategory,
    pub values: Vec<u8>,
}

impl HandStrength {
    /// Human-readable name, with the ace-high straight flush called out.
    #[must_use]
    pub fn name(&self) -> String {
        if self.category == HandCategory::StraightFlush && self.values.first() == Some(&14) {
            "Royal Flush".to_string()
        } else {
            self.category.to_string()
        }
    }
}

/// Scores exactly the given cards (five in normal play).
#[must_use]
pub fn evaluate(cards: &[Card]) -> HandStrength {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for card in cards {
        *counts.entry(card.rank.value()).or_default() += 1;
    }
    let mut groups: Vec<(usize, u8)> = counts.into_iter().map(|(v, c)| (c, v)).collect();
    groups.sort_by_key(|&(count, value)| Reverse((count, value)));
    let values: Vec<u8> = groups
        .iter()
        .flat_map(|&(count, value)| std::iter::repeat_n(value, count))
        .collect();
    let shape: Vec<usize> = groups.iter().map(|&(count, _)| count).collect();

    let five = cards.len() == 5;
    let flush = five && cards.iter().all(|c| c.suit == cards[0].suit);
    let straight_high = if five && shape.len() == 5 {
        match values.as_slice() {
            [14, 5, 4, 3, 2] => Some(5),
            [high, .., low] if high - low == 4 => Some(*high),
            _ => None,
        }
    } else {
        None
    };

    let (category, values) = match (straight_high, flush, shape.as_slice()) {
        (Some(high), true, _) => (HandCategory::StraightFlush, vec![high]),
        (_, _, [4, ..]) => (HandCategory::FourOfAKind, values),
        (_, _, [3, 2]) => (HandCategory::FullHouse, values),
        (_, true, _) => (HandCategory::Flush, values),
        (Some(high), _, _) => (HandCategory::Straight, vec![high]),
        (_, _, [3, ..]) => (HandCategory::ThreeOfAKind, values),
        (_, _, [2, 2, ..]) => (HandCategory::TwoPair, values),
        (_, _, [2, ..]) => (HandCategory::OnePair, values),
        _ => (HandCategory::HighCard, values),
    };
    HandStrength { category, values }
}

/// Best five-card hand out of `cards`, with the five cards that make it.
#[must_use]
pub fn best_hand(cards: &[Card]) -> (HandStrength, Vec<Card>) {
    if cards.len() <= 5 {
        return (evaluate(cards), cards.to_vec());
    }
    let n = cards.len();
    let mut best: Option<(HandStrength, Vec<Card>)> = None;
    for mask in (0u32..1 << n).filter(|m| m.count_ones() == 5) {
        let combo: Vec<Card> = (0..n)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| cards[i])
            .collect();
        let strength = evaluate(&combo);
        if best.as_ref().is_none_or(|(top, _)| strength > *top) {
            best = Some((strength, combo));
        }
    }
    best.unwrap_or_else(|| (evaluate(cards), cards.to_vec()))
}

/// Ranks every contender's best five of hole plus board cards. Tied
/// winners split the pot; the odd chip goes to the earliest seat.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestHand;

impl WinnerResolver for BestHand {
    fn resolve(&self, contenders: &[Contender], board: &[Card], pot: Chips) -> Vec<Award> {
        let scored: Vec<(&Contender, HandStrength, Vec<Card>)> = contenders
            .iter()
            .map(|c| {
                let mut cards = c.hole_cards.clone();
                cards.extend_from_slice(board);
                let (strength, five) = best_hand(&cards);
                (c, strength, five)
            })
            .collect();

        let Some(top) = scored.iter().map(|(_, s, _)| s).max().cloned() else {
            return Vec::new();
        };
        let mut winners: Vec<&(&Contender, HandStrength, Vec<Card>)> =
            scored.iter().filter(|(_, s, _)| *s == top).collect();
        winners.sort_by_key(|(c, _, _)| c.seat);

        let share = pot / winners.len() as Chips;
        let odd = pot % winners.len() as Chips;
        winners
            .into_iter()
            .enumerate()
            .map(|(i, (contender, strength, five))| Award {
                seat: contender.seat,
                player_id: contender.player_id.clone(),
                player_name: contender.player_name.clone(),
                amount: if i == 0 { share + odd } else { share },
                hand: Some(five.clone()),
                hand_rank: Some(strength.name()),
            })
            .collect()
    }
}

/// Resolver selection, as named in configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResolverKind {
    #[default]
    Random,
    BestHand,
}

impl ResolverKind {
    #[must_use]
    pub fn build(self) -> Arc<dyn WinnerResolver> {
        match self {
            Self::Random => Arc::new(RandomWinner),
            Self::BestHand => Arc::new(BestHand),
        }
    }
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "best_hand" | "best-hand" | "besthand" => Ok(Self::BestHand),
            other => Err(format!(
                "unknown winner resolver '{other}' (expected 'random' or 'best_hand')"
            )),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::BestHand => write!(f, "best_hand"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn contender(seat: SeatIndex, hole: [Card; 2]) -> Contender {
        Contender {
            seat,
            player_id: format!("p{seat}"),
            player_name: format!("Player {seat}"),
            hole_cards: hole.to_vec(),
        }
    }

    // === Evaluation Tests ===

    #[test]
    fn test_categories() {
        use Rank::*;
        use Suit::*;

        let cases = [
            (
                vec![c(Ten, Spade), c(Jack, Spade), c(Queen, Spade), c(King, Spade), c(Ace, Spade)],
                HandCategory::StraightFlush,
            ),
            (
                vec![c(Nine, Club), c(Nine, Heart), c(Nine, Spade), c(Nine, Diamond), c(Two, Club)],
                HandCategory::FourOfAKind,
            ),
            (
                vec![c(Three, Club), c(Three, Heart), c(Three, Spade), c(Two, Diamond), c(Two, Club)],
                HandCategory::FullHouse,
            ),
            (
                vec![c(Two, Heart), c(Seven, Heart), c(Nine, Heart), c(Jack, Heart), c(King, Heart)],
                HandCategory::Flush,
            ),
            (
                vec![c(Ace, Club), c(Two, Heart), c(Three, Spade), c(Four, Diamond), c(Five, Club)],
                HandCategory::Straight,
            ),
            (
                vec![c(Four, Club), c(Four, Heart), c(Four, Spade), c(King, Diamond), c(Two, Club)],
                HandCategory::ThreeOfAKind,
            ),
            (
                vec![c(Four, Club), c(Four, Heart), c(King, Spade), c(King, Diamond), c(Two, Club)],
                HandCategory::TwoPair,
            ),
            (
                vec![c(Four, Club), c(Four, Heart), c(Queen, Spade), c(King, Diamond), c(Two, Club)],
                HandCategory::OnePair,
            ),
            (
                vec![c(Four, Club), c(Six, Heart), c(Queen, Spade), c(King, Diamond), c(Two, Club)],
                HandCategory::HighCard,
            ),
        ];
        for (cards, expected) in cases {
            assert_eq!(evaluate(&cards).category, expected, "{cards:?}");
        }
    }

    #[test]
    fn test_wheel_is_lowest_straight() {
        use Rank::*;
        use Suit::*;
        let wheel = evaluate(&[c(Ace, Club), c(Two, Heart), c(Three, Spade), c(Four, Diamond), c(Five, Club)]);
        let six_high =
            evaluate(&[c(Six, Club), c(Two, Heart), c(Three, Spade), c(Four, Diamond), c(Five, Club)]);
        assert_eq!(wheel.values, vec![5]);
        assert!(six_high > wheel);
    }

    #[test]
    fn test_kickers_break_ties() {
        use Rank::*;
        use Suit::*;
        let aces_king = evaluate(&[c(Ace, Club), c(Ace, Heart), c(King, Spade), c(Four, Diamond), c(Two, Club)]);
        let aces_queen =
            evaluate(&[c(Ace, Spade), c(Ace, Diamond), c(Queen, Spade), c(Four, Club), c(Two, Heart)]);
        assert!(aces_king > aces_queen);
        assert_eq!(aces_king.values, vec![14, 14, 13, 4, 2]);
    }

    #[test]
    fn test_best_hand_picks_from_seven() {
        use Rank::*;
        use Suit::*;
        let cards = [
            c(Ace, Heart),
            c(King, Heart),
            c(Queen, Heart),
            c(Jack, Heart),
            c(Ten, Heart),
            c(Two, Club),
            c(Two, Spade),
        ];
        let (strength, five) = best_hand(&cards);
        assert_eq!(strength.name(), "Royal Flush");
        assert_eq!(five.len(), 5);
        assert!(five.iter().all(|card| card.suit == Heart));
    }

    // === Resolver Tests ===

    #[test]
    fn test_best_hand_awards_strongest() {
        use Rank::*;
        use Suit::*;
        let board = [c(Two, Club), c(Seven, Diamond), c(Nine, Heart), c(Jack, Spade), c(Four, Club)];
        let contenders = [
            contender(0, [c(Three, Heart), c(Five, Heart)]),
            contender(2, [c(Jack, Heart), c(Jack, Club)]),
        ];
        let awards = BestHand.resolve(&contenders, &board, 100);
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].seat, 2);
        assert_eq!(awards[0].amount, 100);
        assert_eq!(awards[0].hand_rank.as_deref(), Some("Three of a Kind"));
    }

    #[test]
    fn test_split_pot_odd_chip_to_first_seat() {
        use Rank::*;
        use Suit::*;
        // Board plays for everyone.
        let board = [c(Ten, Spade), c(Jack, Spade), c(Queen, Spade), c(King, Spade), c(Ace, Spade)];
        let contenders = [
            contender(1, [c(Two, Club), c(Three, Club)]),
            contender(4, [c(Two, Heart), c(Three, Heart)]),
            contender(6, [c(Two, Diamond), c(Three, Diamond)]),
        ];
        let awards = BestHand.resolve(&contenders, &board, 100);
        let amounts: Vec<(SeatIndex, Chips)> = awards.iter().map(|a| (a.seat, a.amount)).collect();
        assert_eq!(amounts, vec![(1, 34), (4, 33), (6, 33)]);
    }

    #[test]
    fn test_random_winner_takes_whole_pot() {
        use Rank::*;
        use Suit::*;
        let contenders = [
            contender(0, [c(Two, Club), c(Three, Club)]),
            contender(1, [c(Two, Heart), c(Three, Heart)]),
        ];
        for _ in 0..20 {
            let awards = RandomWinner.resolve(&contenders, &[], 60);
            assert_eq!(awards.len(), 1);
            assert_eq!(awards[0].amount, 60);
            assert!(awards[0].seat <= 1);
        }
        assert!(RandomWinner.resolve(&[], &[], 60).is_empty());
    }

    #[test]
    fn test_resolver_kind_parsing() {
        assert_eq!("random".parse::<ResolverKind>(), Ok(ResolverKind::Random));
        assert_eq!("BEST_HAND".parse::<ResolverKind>(), Ok(ResolverKind::BestHand));
        assert!("oracle".parse::<ResolverKind>().is_err());
        assert_eq!(ResolverKind::default().to_string(), "random");
    }
}
