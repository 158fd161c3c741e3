use crate::card::{Card, Deck};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seats at the table. Turn order and teams follow the seat index.
pub const SEATS: usize = 4;
pub const CARDS_PER_HAND: usize = 10;
/// Cumulative score a team needs (and must strictly exceed the other team's) to win.
pub const WINNING_SCORE: u32 = 21;
pub const MAX_NAME_LEN: usize = 20;

/// 0-based seat index, `0..SEATS`. Externally players are numbered from 1.
pub type Seat = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// Seats 0 and 2 play for A, 1 and 3 for B.
    pub fn of_seat(seat: Seat) -> Team {
        if seat % 2 == 0 { Team::A } else { Team::B }
    }

    pub fn seats(self) -> [Seat; 2] {
        match self {
            Team::A => [0, 2],
            Team::B => [1, 3],
        }
    }

    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Team::A => "A",
            Team::B => "B",
        })
    }
}

/// A pair of per-team numbers, serialized as `{"A": .., "B": ..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    #[serde(rename = "A")]
    pub a: u32,
    #[serde(rename = "B")]
    pub b: u32,
}

impl TeamScores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::A => self.a,
            Team::B => self.b,
        }
    }

    pub fn add(&mut self, team: Team, points: u32) {
        match team {
            Team::A => self.a += points,
            Team::B => self.b += points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    /// Display order; `cardIndex` in a play refers to this order.
    pub hand: Vec<Card>,
    /// Captured cards for the current round. Order is irrelevant.
    pub captures: Vec<Card>,
    pub scope: u32,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Player {
        Player {
            name: name.into(),
            hand: Vec::new(),
            captures: Vec::new(),
            scope: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Seats are filling up or names are not all confirmed yet.
    WaitingForPlayers,
    InRound,
    /// Round scored, next round not started yet.
    RoundEnd,
    GameOver,
}

/// The authoritative game. Owned by exactly one task; nothing here is shared.
#[derive(Debug, Clone)]
pub struct Game {
    pub players: Vec<Player>,
    pub deck: Deck,
    /// Face-up cards, in the order they were placed.
    pub table: Vec<Card>,
    pub turn: Seat,
    /// 1-based.
    pub round: u32,
    pub team_scores: TeamScores,
    pub moves_in_round: u32,
    pub phase: GamePhase,
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

impl Game {
    pub fn new() -> Game {
        Game {
            players: Vec::with_capacity(SEATS),
            deck: Deck::default(),
            table: Vec::new(),
            turn: 0,
            round: 1,
            team_scores: TeamScores::default(),
            moves_in_round: 0,
            phase: GamePhase::WaitingForPlayers,
        }
    }

    /// True once all four seats are taken.
    pub fn is_full(&self) -> bool {
        self.players.len() == SEATS
    }

    pub fn is_started(&self) -> bool {
        self.phase != GamePhase::WaitingForPlayers
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        self.players.get(seat)
    }

    pub fn team_names(&self, team: Team) -> Vec<String> {
        team.seats()
            .iter()
            .filter_map(|&seat| self.players.get(seat).map(|p| p.name.clone()))
            .collect()
    }

    /// Cards currently accounted for in deck, hands, table and capture piles.
    pub fn cards_in_play(&self) -> usize {
        self.deck.len()
            + self.table.len()
            + self
                .players
                .iter()
                .map(|p| p.hand.len() + p.captures.len())
                .sum::<usize>()
    }

    /// Snapshot of the game as seen by `viewer`.
    ///
    /// A seated player sees their own hand; every other hand is replaced by
    /// hidden placeholders of the same length. Spectators and `reveal_all`
    /// (debug mode) see everything.
    pub fn view_for(&self, viewer: Viewer, reveal_all: bool) -> StateView {
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| {
                let visible = reveal_all
                    || match viewer {
                        Viewer::Seat(s) => s == seat,
                        Viewer::Spectator => true,
                    };
                let hand = if visible {
                    p.hand.iter().map(|c| HandCard::Visible(*c)).collect()
                } else {
                    vec![HandCard::Hidden { hidden: true }; p.hand.len()]
                };
                PlayerView {
                    name: p.name.clone(),
                    captures_count: p.captures.len(),
                    team: Team::of_seat(seat),
                    scope: p.scope,
                    hand,
                }
            })
            .collect();

        StateView {
            round: self.round,
            turn: self.turn,
            table: self.table.clone(),
            team_scores: self.team_scores,
            players,
        }
    }
}

/// Who a state snapshot is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Seat(Seat),
    Spectator,
}

/// A card in a broadcast hand: either the real card or an opaque placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandCard {
    Hidden { hidden: bool },
    Visible(Card),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    pub captures_count: usize,
    pub team: Team,
    pub scope: u32,
    pub hand: Vec<HandCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub round: u32,
    /// 0-based seat whose move is next.
    pub turn: Seat,
    pub table: Vec<Card>,
    pub team_scores: TeamScores,
    pub players: Vec<PlayerView>,
}
