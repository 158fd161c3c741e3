// The table: one task that owns the game and every connection's session
// record. All mutations happen here, one event at a time, so capture
// resolution and turn advancement never interleave.

use std::collections::HashMap;
use std::net::SocketAddr;

use scopone_core::{
    player_id, seat_of, validate_name, ClientMessage, Game, GamePhase, JoinMode, PlayerId, Role,
    Seat, ServerMessage, Team, Viewer, Welcome, SEATS,
};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{ConnId, ConnectionEvent, EventReceiver, Outbox};
use crate::error::SessionError;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Won(Team),
    /// A seated player left; nobody wins.
    Aborted { name: String },
    /// Every event sender went away.
    Closed,
}

/// Where a connection sits at the table. Fixed once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seating {
    /// Connected, no `join` yet.
    Pending,
    Player(Seat),
    Spectator,
}

/// Per-connection record.
struct Session {
    outbox: Outbox,
    addr: SocketAddr,
    seating: Seating,
    name: String,
}

impl Session {
    fn player_id(&self) -> Option<PlayerId> {
        match self.seating {
            Seating::Player(seat) => Some(player_id(seat)),
            _ => None,
        }
    }

    fn send(&self, msg: ServerMessage) {
        // A closed outbox means the connection task is gone; its
        // Disconnected event is already on the way.
        if self.outbox.send(msg).is_err() {
            debug!("outbox for {} closed", self.addr);
        }
    }
}

pub struct Table {
    config: ServerConfig,
    game: Game,
    sessions: HashMap<ConnId, Session>,
    /// Seats that acknowledged the last round summary.
    ready: [bool; SEATS],
    events: EventReceiver,
}

impl Table {
    pub fn new(config: ServerConfig, events: EventReceiver) -> Table {
        Table {
            config,
            game: Game::new(),
            sessions: HashMap::new(),
            ready: [false; SEATS],
            events,
        }
    }

    /// Runs until the game is won, a player leaves, or all senders close.
    pub async fn run(mut self) -> Outcome {
        let mut lobby_tick = tokio::time::interval(self.config.lobby_interval);
        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("all connections closed");
                        return Outcome::Closed;
                    };
                    if let Some(outcome) = self.handle_event(event) {
                        return outcome;
                    }
                }
                _ = lobby_tick.tick(), if !self.game.is_full() => {
                    self.broadcast_lobby();
                }
            }
        }
    }

    fn handle_event(&mut self, event: ConnectionEvent) -> Option<Outcome> {
        match event {
            ConnectionEvent::Connected { id, addr, outbox } => {
                self.sessions.insert(
                    id,
                    Session {
                        outbox,
                        addr,
                        seating: Seating::Pending,
                        name: String::new(),
                    },
                );
                None
            }
            ConnectionEvent::Disconnected { id } => self.handle_disconnect(id),
            ConnectionEvent::Malformed { id, reason } => {
                warn!("[{}] malformed message: {}", id, reason);
                self.reject(id, SessionError::Malformed(reason));
                None
            }
            ConnectionEvent::Message { id, msg } => match self.dispatch(id, msg) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.reject(id, e);
                    None
                }
            },
        }
    }

    fn dispatch(&mut self, id: ConnId, msg: ClientMessage) -> Result<Option<Outcome>, SessionError> {
        match msg {
            ClientMessage::Join { nick, mode } => {
                self.handle_join(id, &nick, mode)?;
                Ok(None)
            }
            ClientMessage::SetName { nick } => {
                self.handle_set_name(id, &nick)?;
                Ok(None)
            }
            ClientMessage::Play { payload } => {
                let seat = self.acting_seat(id, payload.player_id)?;
                self.handle_play(seat, payload.card_index)
            }
            ClientMessage::RoundReady { player_id } => {
                let seat = self.acting_seat(id, player_id)?;
                self.handle_round_ready(seat)?;
                Ok(None)
            }
        }
    }

    // --- Lobby ---

    fn handle_join(&mut self, id: ConnId, nick: &str, mode: JoinMode) -> Result<(), SessionError> {
        let session = self.sessions.get(&id).ok_or(SessionError::MustJoinFirst)?;
        if session.seating != Seating::Pending {
            return Err(SessionError::AlreadyRegistered);
        }

        let seat = match mode {
            JoinMode::Player => self.game.seat_player(nick),
            JoinMode::Spectator => None,
        };
        let (seating, name, role) = match seat {
            Some(seat) => (Seating::Player(seat), self.game.players[seat].name.clone(), Role::Player),
            None => (
                Seating::Spectator,
                validate_name(nick).unwrap_or_else(|_| "Spectator".to_string()),
                Role::Spectator,
            ),
        };

        let welcome = ServerMessage::Welcome {
            payload: Welcome {
                id: seat.map(player_id),
                role,
                name: name.clone(),
                players: self.game.players.len(),
                needed: SEATS,
            },
        };
        if let Some(session) = self.sessions.get_mut(&id) {
            session.seating = seating;
            session.name = name;
            info!("[{}] joined as {:?} {:?} ({})", id, role, session.name, session.addr);
            session.send(welcome);
        }

        self.broadcast_lobby();
        if self.game.is_started() {
            // Late spectators catch up immediately.
            self.send_state(id);
        }
        self.maybe_start();
        Ok(())
    }

    fn handle_set_name(&mut self, id: ConnId, nick: &str) -> Result<(), SessionError> {
        let seat = match self.seating(id)? {
            Seating::Player(seat) => seat,
            _ => return Err(scopone_core::GameError::UnknownPlayer.into()),
        };
        if self.game.is_started() {
            return Err(SessionError::NamesLocked);
        }
        self.game.set_player_name(seat, nick)?;

        let name = self.game.players[seat].name.clone();
        let welcome = ServerMessage::Welcome {
            payload: Welcome {
                id: Some(player_id(seat)),
                role: Role::Player,
                name: name.clone(),
                players: self.game.players.len(),
                needed: SEATS,
            },
        };
        if let Some(session) = self.sessions.get_mut(&id) {
            info!("[{}] renamed {:?} -> {:?}", id, session.name, name);
            session.name = name;
            session.send(welcome);
        }
        self.maybe_start();
        Ok(())
    }

    /// Starts the first round once four players have confirmed names.
    fn maybe_start(&mut self) {
        if self.game.phase != GamePhase::WaitingForPlayers || !self.game.all_names_confirmed() {
            return;
        }
        self.game.start_round();
        info!(
            "game started: {}",
            self.game.players.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
        );
        self.broadcast_state();
    }

    // --- Play ---

    fn handle_play(&mut self, seat: Seat, card_index: usize) -> Result<Option<Outcome>, SessionError> {
        let outcome = self.game.play_card(seat, card_index)?;
        debug!("seat {} played index {}: {:?}", seat, card_index, outcome.events);

        for event in &outcome.events {
            self.broadcast(ServerMessage::from_event(event, &self.game));
        }
        self.broadcast_state();

        if !outcome.round_end {
            return Ok(None);
        }

        let result = self.game.finish_round();
        info!(
            "round {} over: A {} B {}",
            self.game.round, result.score.team_scores.a, result.score.team_scores.b
        );
        self.broadcast(ServerMessage::round_summary(&self.game, &result));

        if let Some(team) = result.winner {
            info!("team {} wins", team);
            self.broadcast(ServerMessage::GameOver {
                msg: format!("Team {} wins", team),
                winner: Some(team),
                team_scores: self.game.team_scores,
            });
            return Ok(Some(Outcome::Won(team)));
        }

        self.ready = [false; SEATS];
        self.broadcast(ServerMessage::RoundPrepare {
            next_round: self.game.round + 1,
            needed: SEATS,
        });
        Ok(None)
    }

    /// Counts one acknowledgment per seat; the fourth starts the next round.
    fn handle_round_ready(&mut self, seat: Seat) -> Result<(), SessionError> {
        if self.game.phase != GamePhase::RoundEnd {
            return Err(SessionError::NoRoundPending);
        }
        self.ready[seat] = true;
        let ready = self.ready.iter().filter(|r| **r).count();
        info!("seat {} ready for round {} ({}/{})", seat, self.game.round + 1, ready, SEATS);
        self.broadcast(ServerMessage::RoundProgress {
            next_round: self.game.round + 1,
            ready,
            total: SEATS,
        });

        if ready == SEATS {
            self.ready = [false; SEATS];
            self.game.next_round();
            info!("round {} started", self.game.round);
            self.broadcast_state();
        }
        Ok(())
    }

    // --- Sessions ---

    fn seating(&self, id: ConnId) -> Result<Seating, SessionError> {
        match self.sessions.get(&id).map(|s| s.seating) {
            None | Some(Seating::Pending) => Err(SessionError::MustJoinFirst),
            Some(seating) => Ok(seating),
        }
    }

    /// The seat a player action comes from. The claimed id must be the
    /// sender's own.
    fn acting_seat(&self, id: ConnId, claimed: PlayerId) -> Result<Seat, SessionError> {
        match self.seating(id)? {
            Seating::Player(seat) if seat_of(claimed) == Some(seat) => Ok(seat),
            _ => Err(scopone_core::GameError::UnknownPlayer.into()),
        }
    }

    fn handle_disconnect(&mut self, id: ConnId) -> Option<Outcome> {
        let session = self.sessions.remove(&id)?;
        match session.seating {
            Seating::Player(_) if self.game.phase != GamePhase::GameOver => {
                warn!("player {:?} disconnected, ending the game", session.name);
                self.broadcast(ServerMessage::GameOver {
                    msg: format!("{} disconnected", session.name),
                    winner: None,
                    team_scores: self.game.team_scores,
                });
                Some(Outcome::Aborted { name: session.name })
            }
            _ => {
                info!("[{}] {:?} left", id, session.seating);
                None
            }
        }
    }

    /// Reports `error` to the offending connection, then resyncs everyone.
    fn reject(&self, id: ConnId, error: SessionError) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        info!("[{}] rejected: {}", id, error);
        session.send(ServerMessage::Error {
            player_id: session.player_id(),
            msg: error.to_string(),
        });
        if self.game.is_started() {
            self.broadcast_state();
        }
    }

    // --- Broadcast ---

    /// Sends to every connection that has joined.
    fn broadcast(&self, msg: ServerMessage) {
        for session in self.sessions.values().filter(|s| s.seating != Seating::Pending) {
            session.send(msg.clone());
        }
    }

    /// Seat occupancy goes to every connection, joined or not.
    fn broadcast_lobby(&self) {
        let msg = ServerMessage::lobby(&self.game);
        for session in self.sessions.values() {
            session.send(msg.clone());
        }
    }

    fn state_for(&self, session: &Session) -> Option<ServerMessage> {
        let viewer = match session.seating {
            Seating::Pending => return None,
            Seating::Player(seat) => Viewer::Seat(seat),
            Seating::Spectator => Viewer::Spectator,
        };
        Some(ServerMessage::State {
            payload: self.game.view_for(viewer, self.config.reveal_all),
        })
    }

    fn send_state(&self, id: ConnId) {
        if let Some(session) = self.sessions.get(&id) {
            if let Some(msg) = self.state_for(session) {
                session.send(msg);
            }
        }
    }

    /// Each connection gets its own redacted snapshot.
    fn broadcast_state(&self) {
        for session in self.sessions.values() {
            if let Some(msg) = self.state_for(session) {
                session.send(msg);
            }
        }
    }
}
