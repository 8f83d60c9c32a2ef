//! Table state and the betting state machine.
//!
//! A [`Table`] owns its roster, deck, board and pot. Every mutation goes
//! through a method on it, and the table actor guarantees those methods
//! are never called concurrently, so nothing here needs interior locking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{
    Action, Blinds, Card, Chips, Deck, Phase, Player, PlayerId, PlayerView, SeatIndex, TableId,
    TableView,
};
use super::showdown::{Award, Contender, WinnerResolver};

/// Rule violations and seating refusals. The display text is what the
/// client receives in its `error` envelope.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("Table is full.")]
    CapacityReached,
    #[error("Hand already in progress.")]
    GameAlreadyInProgress,
    #[error("No hand in progress.")]
    NoHandInProgress,
    #[error("Player already seated.")]
    UserAlreadyExists,
    #[error("Table chip limit reached.")]
    ChipLimitExceeded,
    #[error("Player not found.")]
    UserDoesNotExist,
    #[error("Player is not connected.")]
    UserDisconnected,
    #[error("Player has already folded.")]
    UserFolded,
    #[error("Not your turn.")]
    OutOfTurnAction,
    #[error("Cannot check, there's an active bet.")]
    CannotCheck,
    #[error("No amount to call.")]
    NothingToCall,
    #[error("Cannot bet, someone has already bet. You must call or raise.")]
    CannotBet,
    #[error("Invalid bet amount.")]
    InvalidBetAmount,
    #[error("Bet must be at least the big blind.")]
    BetBelowBigBlind,
    #[error("Your bet must be at least the current highest bet.")]
    BetBelowHighest,
    #[error("Invalid raise amount.")]
    InvalidRaiseAmount,
    #[error("Invalid raise amount. Must be at least the previous raise increment.")]
    RaiseBelowIncrement,
}

/// What an accepted action (or a round start) did to the hand.
#[derive(Clone, Debug, PartialEq)]
pub enum HandProgress {
    /// Not enough players; the table sits in `waiting`.
    Waiting,
    /// Betting continues on the current street.
    InProgress,
    /// Betting closed and the next street was dealt.
    StreetDealt(Phase),
    /// The hand reached showdown and the pot was paid out.
    Showdown(Vec<Award>),
}

/// Outcome of a cleanup pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PruneReport {
    pub removed: Vec<PlayerId>,
    pub reset_to_waiting: bool,
}

#[derive(Debug)]
pub struct Table {
    id: TableId,
    players: Vec<Player>,
    deck: Deck,
    community: Vec<Card>,
    pot: Chips,
    current_turn: SeatIndex,
    dealer: SeatIndex,
    blinds: Blinds,
    phase: Phase,
    hand_number: u64,
    max_players: usize,
    min_players: usize,
}

impl Table {
    #[must_use]
    pub fn new(id: TableId, blinds: Blinds, max_players: usize, min_players: usize) -> Self {
        Self {
            id,
            players: Vec::with_capacity(max_players),
            deck: Deck::shuffled(),
            community: Vec::with_capacity(5),
            pot: 0,
            current_turn: 0,
            dealer: 0,
            blinds,
            phase: Phase::Waiting,
            hand_number: 0,
            max_players,
            min_players,
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn community_cards(&self) -> &[Card] {
        &self.community
    }

    #[must_use]
    pub fn pot(&self) -> Chips {
        self.pot
    }

    #[must_use]
    pub fn current_turn(&self) -> SeatIndex {
        self.current_turn
    }

    #[must_use]
    pub fn dealer(&self) -> SeatIndex {
        self.dealer
    }

    #[must_use]
    pub fn blinds(&self) -> &Blinds {
        &self.blinds
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Incremented on every round start.
    #[must_use]
    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    #[must_use]
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// Sum of every chip on the table: stacks plus the pot.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.pot + self.players.iter().map(|p| p.stack).sum::<Chips>()
    }

    /// Maximum street bet among connected, non-folded players.
    #[must_use]
    pub fn highest_bet(&self) -> Chips {
        self.players
            .iter()
            .filter(|p| p.is_contending())
            .map(|p| p.bet)
            .max()
            .unwrap_or(0)
    }

    fn contender_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_contending()).count()
    }

    fn can_act_count(&self) -> usize {
        self.players.iter().filter(|p| p.can_act()).count()
    }

    fn position(&self, id: &str) -> Option<SeatIndex> {
        self.players.iter().position(|p| p.id == id)
    }

    /// First seat strictly after `from` (wrapping, `from` itself last)
    /// whose player satisfies `pred`.
    fn next_seat(&self, from: SeatIndex, pred: impl Fn(&Player) -> bool) -> Option<SeatIndex> {
        let len = self.players.len();
        (1..=len)
            .map(|offset| (from + offset) % len)
            .find(|&idx| pred(&self.players[idx]))
    }

    /// Seat of the next player able to act after `from`, falling back to any
    /// contender when everyone left is all-in.
    fn next_actor(&self, from: SeatIndex) -> SeatIndex {
        self.next_seat(from, Player::can_act)
            .or_else(|| self.next_seat(from, Player::is_contending))
            .unwrap_or(from)
    }

    // === Seating ===

    /// Appends a player to the roster. Only a waiting table takes seats.
    pub fn seat(&mut self, player: Player) -> Result<SeatIndex, UserError> {
        if self.phase != Phase::Waiting {
            return Err(UserError::GameAlreadyInProgress);
        }
        if self.players.len() >= self.max_players {
            return Err(UserError::CapacityReached);
        }
        if self.position(&player.id).is_some() {
            return Err(UserError::UserAlreadyExists);
        }
        // Chips are conserved from here on, so bounding the total at the
        // door keeps every later pot, bet and payout sum in range.
        if self.total_chips().checked_add(player.stack).is_none() {
            return Err(UserError::ChipLimitExceeded);
        }
        log::info!(
            "Table {}: {} ({}) took seat {}",
            self.id,
            player.name,
            player.id,
            self.players.len()
        );
        self.players.push(player);
        Ok(self.players.len() - 1)
    }

    /// Flags a player as gone. The seat is released by the next
    /// [`Table::prune_disconnected`] pass.
    pub fn mark_disconnected(&mut self, id: &str) -> bool {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) if player.connected => {
                player.connected = false;
                log::info!("Table {}: {} marked disconnected", self.id, player.name);
                true
            }
            _ => false,
        }
    }

    /// Removes disconnected players and recomputes the turn and dealer
    /// seats against the shortened roster. Drops the table back to
    /// `waiting` (forfeiting the pot) when a hand can no longer continue.
    pub fn prune_disconnected(&mut self) -> PruneReport {
        if self.players.iter().all(|p| p.connected) {
            return PruneReport::default();
        }

        let successor = |seat: SeatIndex| -> Option<PlayerId> {
            let player = self.players.get(seat)?;
            if player.connected {
                Some(player.id.clone())
            } else {
                self.next_seat(seat, |p| p.connected).map(|idx| self.players[idx].id.clone())
            }
        };
        let turn_id = successor(self.current_turn);
        let dealer_connected = self.players.get(self.dealer).is_some_and(|p| p.connected);
        let dealer_id = successor(self.dealer);

        let mut removed = Vec::new();
        self.players.retain(|p| {
            if !p.connected {
                removed.push(p.id.clone());
            }
            p.connected
        });
        for id in &removed {
            log::info!("Table {}: removed disconnected player {}", self.id, id);
        }

        let len = self.players.len();
        self.current_turn = turn_id.and_then(|id| self.position(&id)).unwrap_or(0);
        self.dealer = match dealer_id.and_then(|id| self.position(&id)) {
            Some(idx) if dealer_connected => idx,
            // The departed dealer's successor opens the next street, so the
            // button sits on the seat just before it.
            Some(idx) => (idx + len - 1) % len,
            None => 0,
        };

        let reset_to_waiting = len < 2 && self.phase != Phase::Waiting;
        if reset_to_waiting {
            log::info!(
                "Table {}: {} players left, resetting to waiting (pot of {} forfeited)",
                self.id,
                len,
                self.pot
            );
            self.reset_hand();
            self.phase = Phase::Waiting;
        }

        PruneReport {
            removed,
            reset_to_waiting,
        }
    }

    fn reset_hand(&mut self) {
        self.deck.shuffle();
        self.community.clear();
        self.pot = 0;
        for player in &mut self.players {
            player.reset_for_hand();
        }
    }

    // === Hand flow ===

    /// Starts a new hand if enough connected players with chips are seated,
    /// otherwise parks the table in `waiting`.
    pub fn start_round(&mut self, resolver: &dyn WinnerResolver) -> HandProgress {
        let ready = self
            .players
            .iter()
            .filter(|p| p.connected && p.stack > 0)
            .count();
        if ready < self.min_players {
            log::info!(
                "Table {}: {} players ready, {} needed. Waiting for more players.",
                self.id,
                ready,
                self.min_players
            );
            self.reset_hand();
            self.phase = Phase::Waiting;
            return HandProgress::Waiting;
        }

        self.reset_hand();
        self.phase = Phase::Preflop;
        self.hand_number += 1;
        for player in &mut self.players {
            // Busted players sit the hand out.
            if !player.connected || player.stack == 0 {
                player.folded = true;
            }
        }

        let has_chips = |p: &Player| p.connected && p.stack > 0;
        self.dealer = self.next_seat(self.dealer, |p| p.connected).unwrap_or(0);
        let small_seat = self.next_seat(self.dealer, has_chips).unwrap_or(self.dealer);
        let big_seat = self.next_seat(small_seat, has_chips).unwrap_or(small_seat);

        let small = self.players[small_seat].commit(self.blinds.small);
        self.pot += small;
        let big = self.players[big_seat].commit(self.blinds.big);
        self.pot += big;
        log::info!(
            "Table {}: hand #{} started. {} posted small blind {}, {} posted big blind {}",
            self.id,
            self.hand_number,
            self.players[small_seat].name,
            small,
            self.players[big_seat].name,
            big
        );

        self.current_turn = self.next_actor(big_seat);
        for player in self.players.iter_mut().filter(|p| !p.folded) {
            player.hole_cards = self.deck.deal_cards(2);
        }

        if self.can_act_count() < 2 && self.is_round_complete() {
            // Blinds put everyone but at most one player all-in.
            return self.finish_street(resolver);
        }
        HandProgress::InProgress
    }

    /// Validates and applies one betting action. A rejected action leaves
    /// the table untouched.
    pub fn take_action(
        &mut self,
        player_id: &str,
        action: Action,
        resolver: &dyn WinnerResolver,
    ) -> Result<HandProgress, UserError> {
        if !self.phase.is_betting() {
            return Err(UserError::NoHandInProgress);
        }
        let seat = self.position(player_id).ok_or(UserError::UserDoesNotExist)?;
        let highest = self.highest_bet();
        let big_blind = self.blinds.big;
        let preflop = self.phase == Phase::Preflop;
        let player = &self.players[seat];

        if !player.connected {
            return Err(UserError::UserDisconnected);
        }
        if player.folded {
            return Err(UserError::UserFolded);
        }
        if seat != self.current_turn {
            return Err(UserError::OutOfTurnAction);
        }

        let moved = match action {
            Action::Fold => {
                self.players[seat].folded = true;
                0
            }
            Action::Check => {
                if player.bet < highest {
                    return Err(UserError::CannotCheck);
                }
                0
            }
            Action::Call => {
                let to_call = highest - player.bet;
                if to_call == 0 {
                    return Err(UserError::NothingToCall);
                }
                self.players[seat].commit(to_call)
            }
            Action::Bet(amount) => {
                if highest > player.bet {
                    return Err(UserError::CannotBet);
                }
                if amount == 0 || amount > player.stack {
                    return Err(UserError::InvalidBetAmount);
                }
                if preflop && amount < big_blind {
                    return Err(UserError::BetBelowBigBlind);
                }
                if amount < highest {
                    return Err(UserError::BetBelowHighest);
                }
                self.players[seat].commit(amount)
            }
            Action::Raise(amount) => {
                if amount == 0 || amount > player.stack {
                    return Err(UserError::InvalidRaiseAmount);
                }
                let min_increment = match highest - player.bet {
                    0 if highest > 0 => highest,
                    0 => big_blind,
                    outstanding => outstanding,
                };
                if player.bet.saturating_add(amount) < highest.saturating_add(min_increment) {
                    return Err(UserError::RaiseBelowIncrement);
                }
                self.players[seat].commit(amount)
            }
        };
        self.pot += moved;
        log::info!(
            "Table {}: {} {} (pot {})",
            self.id,
            self.players[seat].name,
            action,
            self.pot
        );

        self.current_turn = self.next_actor(self.current_turn);
        if self.is_round_complete() {
            return Ok(self.finish_street(resolver));
        }
        Ok(HandProgress::InProgress)
    }

    /// Picks the hand back up after a mid-hand prune: moves the turn off
    /// players who can no longer act and closes the street if nobody is
    /// left to respond.
    pub fn resume_after_departure(&mut self, resolver: &dyn WinnerResolver) -> HandProgress {
        if !self.phase.is_betting() {
            return HandProgress::InProgress;
        }
        let on_turn_can_act = self
            .players
            .get(self.current_turn)
            .is_some_and(Player::can_act);
        if !on_turn_can_act {
            self.current_turn = self.next_actor(self.current_turn);
        }
        if self.is_round_complete() {
            return self.finish_street(resolver);
        }
        HandProgress::InProgress
    }

    /// Betting on a street is over once at most one contender remains or
    /// every contender has matched the highest bet or is all-in.
    ///
    /// This does not track whether everyone has acted since the last
    /// aggressive action, so a big blind can be skipped preflop.
    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        if self.contender_count() <= 1 {
            return true;
        }
        let highest = self.highest_bet();
        self.players
            .iter()
            .filter(|p| p.is_contending())
            .all(|p| p.bet == highest || p.stack == 0)
    }

    fn finish_street(&mut self, resolver: &dyn WinnerResolver) -> HandProgress {
        if self.contender_count() <= 1 {
            return HandProgress::Showdown(self.showdown(resolver));
        }
        loop {
            let next = match self.phase {
                Phase::Preflop => Phase::Flop,
                Phase::Flop => Phase::Turn,
                Phase::Turn => Phase::River,
                _ => return HandProgress::Showdown(self.showdown(resolver)),
            };
            self.open_street(next);
            if self.can_act_count() >= 2 {
                return HandProgress::StreetDealt(next);
            }
            log::debug!(
                "Table {}: fewer than two players can act, running out the board",
                self.id
            );
        }
    }

    fn open_street(&mut self, phase: Phase) {
        let missing = phase.board_size().saturating_sub(self.community.len());
        self.community.extend(self.deck.deal_cards(missing));
        self.phase = phase;
        for player in &mut self.players {
            player.bet = 0;
        }
        self.current_turn = self.next_actor(self.dealer);
        log::info!(
            "Table {}: advanced to {}. Board: {}",
            self.id,
            phase,
            self.community
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    fn showdown(&mut self, resolver: &dyn WinnerResolver) -> Vec<Award> {
        let missing = Phase::Showdown
            .board_size()
            .saturating_sub(self.community.len());
        self.community.extend(self.deck.deal_cards(missing));
        self.phase = Phase::Showdown;

        let contenders: Vec<Contender> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_contending())
            .map(|(seat, p)| Contender {
                seat,
                player_id: p.id.clone(),
                player_name: p.name.clone(),
                hole_cards: p.hole_cards.clone(),
            })
            .collect();

        let pot = self.pot;
        let awards = match contenders.as_slice() {
            [] => {
                log::info!("Table {}: no contenders, pot of {} discarded", self.id, pot);
                Vec::new()
            }
            [sole] => vec![Award::uncontested(sole, pot)],
            _ => resolver.resolve(&contenders, &self.community, pot),
        };

        for award in &awards {
            if let Some(player) = self.players.get_mut(award.seat) {
                player.stack += award.amount;
                log::info!(
                    "Table {}: {} ({}) won {}",
                    self.id,
                    player.name,
                    player.id,
                    award.amount
                );
            }
        }
        self.pot = 0;
        awards
    }

    // === Views ===

    /// Snapshot of the table as `viewer` may see it. Other players' hole
    /// cards stay hidden until showdown.
    #[must_use]
    pub fn view_for(&self, viewer: &str) -> TableView {
        let reveal = self.phase == Phase::Showdown;
        let players = self
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                chips: p.stack,
                bet: p.bet,
                hole_cards: if reveal || p.id == viewer {
                    p.hole_cards.clone()
                } else {
                    Vec::new()
                },
                folded: p.folded,
                active: p.connected,
            })
            .collect();

        TableView {
            id: self.id.clone(),
            players,
            community_cards: self.community.clone(),
            pot: self.pot,
            current_turn: self.current_turn,
            dealer: self.dealer,
            small_blind: self.blinds.small,
            big_blind: self.blinds.big,
            phase: self.phase,
            your_turn: self.phase.is_betting()
                && self
                    .players
                    .get(self.current_turn)
                    .is_some_and(|p| p.id == viewer),
        }
    }
}
