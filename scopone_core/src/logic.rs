use crate::card::*;
use crate::error::GameError;
use crate::state::*;
use serde::{Deserialize, Serialize};

// --- Move results ---

/// Bonus announced during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bonus {
    Settebello,
    Rebello,
    Scopa,
}

/// Something that happened on the table, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Place {
        player: Seat,
        card: Card,
    },
    Capture {
        player: Seat,
        card: Card,
        /// Cards taken from the table (the ace alone when it captures itself).
        taken: Vec<Card>,
        /// Everything that went to the capture pile: played card plus taken.
        cards: Vec<Card>,
    },
    Announce {
        bonus: Bonus,
        player: Seat,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub events: Vec<GameEvent>,
    pub round_end: bool,
}

/// What a played card does to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Take {
    /// No capture; the card joins the table.
    Place,
    /// Ace on an empty table: it captures only itself.
    SelfCapture,
    /// Indices into the table, ascending.
    Cards(Vec<usize>),
}

// --- Capture resolver ---

/// Decides what `played` takes from `table`.
///
/// Priority: ace sweeps a non-empty table, then the first card of equal
/// value, then the smallest combination of cards summing to the value
/// (ties broken by earliest table positions), otherwise the card is placed.
pub fn resolve_capture(played: Card, table: &[Card]) -> Take {
    if played.is_ace() {
        return if table.is_empty() {
            Take::SelfCapture
        } else {
            Take::Cards((0..table.len()).collect())
        };
    }

    if let Some(idx) = table.iter().position(|c| c.value() == played.value()) {
        return Take::Cards(vec![idx]);
    }

    let target = played.value() as u32;
    for size in 2..=table.len() {
        let mut chosen = Vec::with_capacity(size);
        if find_sum(table, 0, size, target, &mut chosen) {
            return Take::Cards(chosen);
        }
    }
    Take::Place
}

/// Depth-first search for exactly `size` more cards from `table[start..]`
/// summing to `remaining`, in lexicographic index order.
fn find_sum(table: &[Card], start: usize, size: usize, remaining: u32, chosen: &mut Vec<usize>) -> bool {
    if size == 0 {
        return remaining == 0;
    }
    // Every card is worth at least 1.
    if remaining < size as u32 {
        return false;
    }
    for idx in start..table.len() {
        let value = table[idx].value() as u32;
        if value > remaining {
            continue;
        }
        chosen.push(idx);
        if find_sum(table, idx + 1, size - 1, remaining - value, chosen) {
            return true;
        }
        chosen.pop();
    }
    false
}

// --- Names ---

/// Trims and checks a requested name.
pub fn validate_name(raw: &str) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidName);
    }
    Ok(name.to_string())
}

/// Matches the auto-generated `Player<digits>` pattern.
pub fn is_default_name(name: &str) -> bool {
    name.strip_prefix("Player")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

// --- Game flow ---

impl Game {
    /// Case-insensitive name lookup among seated players, ignoring `except`.
    pub fn is_name_taken(&self, name: &str, except: Option<Seat>) -> bool {
        let lower = name.to_lowercase();
        self.players
            .iter()
            .enumerate()
            .any(|(seat, p)| Some(seat) != except && p.name.to_lowercase() == lower)
    }

    /// Name a player joining at `seat` ends up with: the requested one if it
    /// is valid and free, otherwise `Player<seat+1>` with a numeric suffix
    /// appended until it no longer collides.
    pub fn resolve_join_name(&self, seat: Seat, requested: &str) -> String {
        if let Ok(name) = validate_name(requested) {
            if !self.is_name_taken(&name, Some(seat)) {
                return name;
            }
        }
        let base = format!("Player{}", seat + 1);
        if !self.is_name_taken(&base, Some(seat)) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.is_name_taken(candidate, Some(seat)))
            .unwrap_or_else(|| base.clone())
    }

    /// Takes the next free seat. Returns `None` when the table is full.
    pub fn seat_player(&mut self, requested: &str) -> Option<Seat> {
        if self.is_full() {
            return None;
        }
        let seat = self.players.len();
        let name = self.resolve_join_name(seat, requested);
        self.players.push(Player::new(name));
        Some(seat)
    }

    pub fn set_player_name(&mut self, seat: Seat, raw: &str) -> Result<(), GameError> {
        if seat >= self.players.len() {
            return Err(GameError::UnknownPlayer);
        }
        let name = validate_name(raw)?;
        if self.is_name_taken(&name, Some(seat)) {
            return Err(GameError::NameAlreadyTaken);
        }
        self.players[seat].name = name;
        Ok(())
    }

    /// Four seats taken and nobody still carries a generated name.
    pub fn all_names_confirmed(&self) -> bool {
        self.is_full() && self.players.iter().all(|p| !is_default_name(&p.name))
    }

    /// Deals a new round from a freshly shuffled deck.
    pub fn start_round(&mut self) {
        self.start_round_with(Deck::new());
    }

    /// Deals 10 cards to each seat in seat order from `deck`.
    ///
    /// Does nothing until all four seats are taken.
    pub fn start_round_with(&mut self, mut deck: Deck) {
        if !self.is_full() {
            return;
        }
        for player in self.players.iter_mut() {
            player.hand = deck.deal(CARDS_PER_HAND);
            player.captures.clear();
            player.scope = 0;
        }
        self.deck = deck;
        self.table.clear();
        self.turn = 0;
        self.moves_in_round = 0;
        self.phase = GamePhase::InRound;
    }

    /// Moves on to the next round after a non-final round end.
    pub fn next_round(&mut self) {
        self.round += 1;
        self.start_round();
    }

    /// Plays `card_index` from `seat`'s hand.
    ///
    /// On error nothing changes.
    pub fn play_card(&mut self, seat: Seat, card_index: usize) -> Result<PlayOutcome, GameError> {
        if self.phase != GamePhase::InRound {
            return Err(GameError::RoundNotInProgress);
        }
        if seat >= self.players.len() {
            return Err(GameError::UnknownPlayer);
        }
        if seat != self.turn {
            return Err(GameError::NotYourTurn);
        }
        let card = *self.players[seat]
            .hand
            .get(card_index)
            .ok_or(GameError::InvalidCardIndex)?;
        if card.is_ace() && self.round == 1 && self.moves_in_round == 0 {
            return Err(GameError::AceAsFirstMoveForbidden);
        }

        let card = self.players[seat].hand.remove(card_index);
        let had_cards_before = !self.table.is_empty();
        let mut events = Vec::new();

        match resolve_capture(card, &self.table) {
            Take::Place => {
                self.table.push(card);
                events.push(GameEvent::Place { player: seat, card });
            }
            Take::SelfCapture => {
                self.players[seat].captures.push(card);
                events.push(GameEvent::Capture {
                    player: seat,
                    card,
                    taken: vec![card],
                    cards: vec![card],
                });
            }
            Take::Cards(indices) => {
                // Remove back to front so earlier indices stay valid.
                let mut taken: Vec<Card> = indices.iter().rev().map(|&i| self.table.remove(i)).collect();
                taken.reverse();

                let mut cards = Vec::with_capacity(taken.len() + 1);
                cards.push(card);
                cards.extend_from_slice(&taken);
                self.players[seat].captures.extend_from_slice(&cards);

                events.push(GameEvent::Capture {
                    player: seat,
                    card,
                    taken,
                    cards: cards.clone(),
                });
                if cards.iter().any(Card::is_settebello) {
                    events.push(GameEvent::Announce { bonus: Bonus::Settebello, player: seat });
                }
                if cards.iter().any(Card::is_rebello) {
                    events.push(GameEvent::Announce { bonus: Bonus::Rebello, player: seat });
                }
                if !card.is_ace() && had_cards_before && self.table.is_empty() {
                    self.players[seat].scope += 1;
                    events.push(GameEvent::Announce { bonus: Bonus::Scopa, player: seat });
                }
            }
        }

        self.turn = (self.turn + 1) % SEATS;
        self.moves_in_round += 1;

        Ok(PlayOutcome {
            events,
            round_end: self.is_round_end(),
        })
    }

    /// True when every hand is empty.
    pub fn is_round_end(&self) -> bool {
        self.is_full() && self.players.iter().all(|p| p.hand.is_empty())
    }
}

// --- Unit tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use Suit::*;

    fn card(value: u8, suit: Suit) -> Card {
        Card::new(value, suit)
    }

    fn values(table: &[Card], take: &Take) -> Vec<u8> {
        match take {
            Take::Cards(indices) => indices.iter().map(|&i| table[i].value()).collect(),
            _ => vec![],
        }
    }

    // Four seated players with an ordered deck dealt.
    fn seated_game() -> Game {
        let mut game = Game::new();
        for name in ["Ann", "Bob", "Cid", "Dee"] {
            game.seat_player(name);
        }
        game.start_round_with(Deck::ordered());
        game
    }

    // --- Capture resolver ---

    #[test]
    fn test_subset_sum_capture() {
        let table = [card(3, Coppe), card(4, Spade)];
        let take = resolve_capture(card(7, Bastoni), &table);
        assert_eq!(take, Take::Cards(vec![0, 1]));
    }

    #[test]
    fn test_exact_match_beats_subset_sum() {
        let table = [card(7, Coppe), card(2, Spade), card(5, Denari)];
        let take = resolve_capture(card(7, Bastoni), &table);
        assert_eq!(take, Take::Cards(vec![0]));
    }

    #[test]
    fn test_exact_match_takes_earliest() {
        let table = [card(2, Coppe), card(5, Spade), card(5, Denari)];
        assert_eq!(resolve_capture(card(5, Bastoni), &table), Take::Cards(vec![1]));
    }

    #[test]
    fn test_smallest_subset_preferred() {
        // 1+1+2+4 and 2+6 both make 8; the pair wins.
        let table = [card(1, Coppe), card(1, Spade), card(2, Denari), card(4, Coppe), card(6, Bastoni)];
        let take = resolve_capture(card(8, Spade), &table);
        assert_eq!(values(&table, &take), vec![2, 6]);
    }

    #[test]
    fn test_ace_sweeps_table() {
        let table = [card(3, Coppe), card(9, Spade), card(1, Denari)];
        assert_eq!(resolve_capture(card(1, Bastoni), &table), Take::Cards(vec![0, 1, 2]));
        assert_eq!(resolve_capture(card(1, Bastoni), &[]), Take::SelfCapture);
    }

    #[test]
    fn test_no_capture_places() {
        let table = [card(6, Coppe), card(5, Spade)];
        assert_eq!(resolve_capture(card(4, Bastoni), &table), Take::Place);
        assert_eq!(resolve_capture(card(4, Bastoni), &[]), Take::Place);
    }

    // --- Names ---

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  Ann "), Ok("Ann".to_string()));
        assert_eq!(validate_name("   "), Err(GameError::InvalidName));
        assert_eq!(validate_name(&"x".repeat(21)), Err(GameError::InvalidName));
        assert!(validate_name(&"x".repeat(20)).is_ok());
        assert!(is_default_name("Player3"));
        assert!(is_default_name("Player12"));
        assert!(!is_default_name("Player"));
        assert!(!is_default_name("Playerone"));
    }

    #[test]
    fn test_join_names_are_deduplicated() {
        let mut game = Game::new();
        assert_eq!(game.seat_player("Ann"), Some(0));
        assert_eq!(game.seat_player("ANN"), Some(1));
        assert_eq!(game.players[1].name, "Player2");
        assert_eq!(game.seat_player(""), Some(2));
        assert_eq!(game.players[2].name, "Player3");

        // A real player already holds the generated name for seat 4.
        game.players[0].name = "player4".to_string();
        assert_eq!(game.seat_player("Bob"), Some(3));
        assert_eq!(game.resolve_join_name(3, "player4"), "Player42");

        assert_eq!(game.seat_player("Eve"), None);
        assert!(!game.all_names_confirmed());
    }

    #[test]
    fn test_set_player_name() {
        let mut game = Game::new();
        game.seat_player("Ann");
        game.seat_player("");
        assert_eq!(game.set_player_name(1, "ann"), Err(GameError::NameAlreadyTaken));
        assert_eq!(game.set_player_name(1, ""), Err(GameError::InvalidName));
        assert_eq!(game.set_player_name(2, "Cid"), Err(GameError::UnknownPlayer));
        assert_eq!(game.set_player_name(1, "Bob"), Ok(()));
        // Renaming to your own name in another case is fine.
        assert_eq!(game.set_player_name(1, "BOB"), Ok(()));
    }

    // --- Turn machine ---

    #[test]
    fn test_start_round_deals_everything() {
        let game = seated_game();
        assert_eq!(game.phase, GamePhase::InRound);
        assert!(game.deck.is_empty());
        assert!(game.table.is_empty());
        assert!(game.players.iter().all(|p| p.hand.len() == CARDS_PER_HAND));
        assert_eq!(game.cards_in_play(), DECK_SIZE);
    }

    #[test]
    fn test_start_round_needs_four_players() {
        let mut game = Game::new();
        game.seat_player("Ann");
        game.start_round();
        assert_eq!(game.phase, GamePhase::WaitingForPlayers);
        assert!(game.players[0].hand.is_empty());
    }

    #[test]
    fn test_play_rejections_leave_state_alone() {
        let mut game = seated_game();
        let before = game.clone().players;

        assert_eq!(game.play_card(1, 0), Err(GameError::NotYourTurn));
        assert_eq!(game.play_card(0, 10), Err(GameError::InvalidCardIndex));
        assert_eq!(game.play_card(7, 0), Err(GameError::UnknownPlayer));
        assert_eq!(game.players, before);
        assert_eq!(game.turn, 0);
        assert_eq!(game.moves_in_round, 0);
    }

    #[test]
    fn test_first_ace_of_game_rejected_in_place() {
        let mut game = seated_game();
        game.players[0].hand = vec![card(5, Coppe), card(1, Denari), card(9, Spade)];
        let hand = game.players[0].hand.clone();

        assert_eq!(game.play_card(0, 1), Err(GameError::AceAsFirstMoveForbidden));
        assert_eq!(game.players[0].hand, hand);
        assert_eq!(game.players[0].hand[1], card(1, Denari));
        assert_eq!(game.turn, 0);

        // Any other first card is fine, and later aces are allowed.
        game.play_card(0, 0).unwrap();
        game.players[1].hand[0] = card(1, Bastoni);
        assert!(game.play_card(1, 0).is_ok());
    }

    #[test]
    fn test_first_ace_allowed_after_round_one() {
        let mut game = seated_game();
        game.round = 2;
        game.players[0].hand[0] = card(1, Coppe);
        let outcome = game.play_card(0, 0).unwrap();
        assert!(matches!(outcome.events[0], GameEvent::Capture { .. }));
    }

    #[test]
    fn test_place_then_capture_with_scopa() {
        let mut game = seated_game();
        game.players[0].hand = vec![card(3, Coppe)];
        game.players[1].hand = vec![card(4, Spade)];
        game.players[2].hand = vec![card(7, Bastoni)];

        let out = game.play_card(0, 0).unwrap();
        assert_eq!(out.events, vec![GameEvent::Place { player: 0, card: card(3, Coppe) }]);
        game.play_card(1, 0).unwrap();
        assert_eq!(game.table, vec![card(3, Coppe), card(4, Spade)]);

        let out = game.play_card(2, 0).unwrap();
        assert_eq!(
            out.events,
            vec![
                GameEvent::Capture {
                    player: 2,
                    card: card(7, Bastoni),
                    taken: vec![card(3, Coppe), card(4, Spade)],
                    cards: vec![card(7, Bastoni), card(3, Coppe), card(4, Spade)],
                },
                GameEvent::Announce { bonus: Bonus::Scopa, player: 2 },
            ]
        );
        assert!(game.table.is_empty());
        assert_eq!(game.players[2].scope, 1);
        assert_eq!(game.turn, 3);
        assert_eq!(game.moves_in_round, 3);
    }

    #[test]
    fn test_ace_clearing_table_is_not_scopa() {
        let mut game = seated_game();
        game.moves_in_round = 1;
        game.table = vec![card(7, Denari), card(5, Coppe)];
        game.players[0].hand = vec![card(1, Spade)];

        let out = game.play_card(0, 0).unwrap();
        assert!(game.table.is_empty());
        assert_eq!(game.players[0].scope, 0);
        assert!(out.events.contains(&GameEvent::Announce { bonus: Bonus::Settebello, player: 0 }));
        assert!(!out.events.iter().any(|e| matches!(e, GameEvent::Announce { bonus: Bonus::Scopa, .. })));
    }

    #[test]
    fn test_ace_on_empty_table_captures_itself() {
        let mut game = seated_game();
        game.moves_in_round = 1;
        game.players[0].hand = vec![card(1, Coppe)];

        let out = game.play_card(0, 0).unwrap();
        assert!(game.table.is_empty());
        assert_eq!(game.players[0].captures, vec![card(1, Coppe)]);
        assert_eq!(game.players[0].scope, 0);
        assert_eq!(out.events.len(), 1);
    }

    #[test]
    fn test_partial_capture_is_not_scopa_and_announces_rebello() {
        let mut game = seated_game();
        game.table = vec![card(10, Denari), card(2, Coppe)];
        game.players[0].hand = vec![card(10, Spade)];

        let out = game.play_card(0, 0).unwrap();
        assert_eq!(game.table, vec![card(2, Coppe)]);
        assert_eq!(
            out.events[1..],
            [GameEvent::Announce { bonus: Bonus::Rebello, player: 0 }]
        );
    }

    #[test]
    fn test_full_round_conserves_cards() {
        let mut game = Game::new();
        for name in ["Ann", "Bob", "Cid", "Dee"] {
            game.seat_player(name);
        }
        game.round = 2;
        game.start_round();

        let mut moves = 0;
        while !game.is_round_end() {
            let seat = game.turn;
            let outcome = game.play_card(seat, 0).unwrap();
            moves += 1;
            assert_eq!(game.cards_in_play(), DECK_SIZE);
            assert_eq!(outcome.round_end, game.is_round_end());
        }
        assert_eq!(moves, 40);
        assert_eq!(game.turn, 0);
    }
}
