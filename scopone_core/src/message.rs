use crate::card::Card;
use crate::logic::{Bonus, GameEvent};
use crate::scoring::RoundResult;
use crate::state::{Game, StateView, Team, TeamScores, SEATS};
use serde::{Deserialize, Serialize};

/// Players are numbered from 1 on the wire; seats are 0-based internally.
pub type PlayerId = u8;

pub fn player_id(seat: usize) -> PlayerId {
    (seat + 1) as PlayerId
}

/// Inverse of [`player_id`]. `None` for 0.
pub fn seat_of(id: PlayerId) -> Option<usize> {
    (id as usize).checked_sub(1)
}

// --- Client -> server messages ---
// One JSON object per line, discriminated by `action`.

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    #[default]
    Player,
    Spectator,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayPayload {
    pub player_id: PlayerId,
    pub card_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// First message of every connection.
    Join {
        #[serde(default)]
        nick: String,
        #[serde(default)]
        mode: JoinMode,
    },
    /// Rename while waiting in the lobby.
    SetName { nick: String },
    Play { payload: PlayPayload },
    /// Acknowledges the round summary so the next round can start.
    RoundReady { player_id: PlayerId },
}

// --- Server -> client messages ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Spectator,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    /// 1-based player id; `None` for spectators.
    pub id: Option<PlayerId>,
    pub role: Role,
    pub name: String,
    pub players: usize,
    pub needed: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Place,
    Capture,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CoppiaSummary {
    pub players: Vec<String>,
    pub points: u32,
    pub total: u32,
    pub cards: usize,
    pub denari: usize,
    pub napoli: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent privately in reply to `join`.
    Welcome { payload: Welcome },
    /// Seat occupancy while the table fills up.
    Lobby { players: usize, needed: usize },
    /// Full snapshot, redacted for the recipient.
    State { payload: StateView },
    Event {
        #[serde(rename = "type")]
        kind: EventKind,
        /// 0-based seat.
        player: usize,
        card: Card,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taken: Option<Vec<Card>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cards: Option<Vec<Card>>,
    },
    Announce {
        #[serde(rename = "type")]
        kind: Bonus,
        player: usize,
        who: String,
    },
    RoundPrepare { next_round: u32, needed: usize },
    RoundProgress { next_round: u32, ready: usize, total: usize },
    RoundSummary {
        round: u32,
        #[serde(rename = "final")]
        is_final: bool,
        winner: Option<Team>,
        coppia_a: CoppiaSummary,
        coppia_b: CoppiaSummary,
        notes: Vec<String>,
    },
    GameOver {
        msg: String,
        winner: Option<Team>,
        team_scores: TeamScores,
    },
    /// Sent only to the connection whose action failed.
    Error { player_id: Option<PlayerId>, msg: String },
}

impl ServerMessage {
    pub fn lobby(game: &Game) -> ServerMessage {
        ServerMessage::Lobby {
            players: game.players.len(),
            needed: SEATS,
        }
    }

    /// Wire form of a table event. Announcements carry the player's name.
    pub fn from_event(event: &GameEvent, game: &Game) -> ServerMessage {
        match event {
            GameEvent::Place { player, card } => ServerMessage::Event {
                kind: EventKind::Place,
                player: *player,
                card: *card,
                taken: None,
                cards: None,
            },
            GameEvent::Capture { player, card, taken, cards } => ServerMessage::Event {
                kind: EventKind::Capture,
                player: *player,
                card: *card,
                taken: Some(taken.clone()),
                cards: Some(cards.clone()),
            },
            GameEvent::Announce { bonus, player } => ServerMessage::Announce {
                kind: *bonus,
                player: *player,
                who: game
                    .player(*player)
                    .map_or_else(|| format!("Player{}", player + 1), |p| p.name.clone()),
            },
        }
    }

    pub fn round_summary(game: &Game, result: &RoundResult) -> ServerMessage {
        let coppia = |team: Team| {
            let detail = result.score.detail(team);
            CoppiaSummary {
                players: game.team_names(team),
                points: result.score.round_points.get(team),
                total: result.score.team_scores.get(team),
                cards: detail.cards,
                denari: detail.denari,
                napoli: result.score.napoli.get(team),
            }
        };
        ServerMessage::RoundSummary {
            round: game.round,
            is_final: result.winner.is_some(),
            winner: result.winner,
            coppia_a: coppia(Team::A),
            coppia_b: coppia(Team::B),
            notes: result.score.notes.clone(),
        }
    }
}
