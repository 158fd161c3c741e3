use crate::card::{Card, Suit};
use crate::state::*;

/// Captured-card counts for one team at the end of a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamDetail {
    pub cards: usize,
    pub denari: usize,
}

/// Result of scoring one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundScore {
    /// Points earned this round.
    pub round_points: TeamScores,
    /// Cumulative scores after this round.
    pub team_scores: TeamScores,
    pub detail_a: TeamDetail,
    pub detail_b: TeamDetail,
    pub napoli: TeamScores,
    /// One line per category, ties included.
    pub notes: Vec<String>,
}

impl RoundScore {
    pub fn detail(&self, team: Team) -> TeamDetail {
        match team {
            Team::A => self.detail_a,
            Team::B => self.detail_b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub score: RoundScore,
    pub winner: Option<Team>,
}

/// Which team has strictly more, if any.
fn more(a: usize, b: usize) -> Option<Team> {
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => Some(Team::A),
        std::cmp::Ordering::Less => Some(Team::B),
        std::cmp::Ordering::Equal => None,
    }
}

fn count(cards: &[Card], pred: impl Fn(&Card) -> bool) -> usize {
    cards.iter().filter(|c| pred(c)).count()
}

/// Napoli points for a capture pile: the length of the unbroken run of
/// Denari starting at the ace, but only if it reaches at least the three.
pub fn napoli_points(cards: &[Card]) -> u32 {
    let mut have = [false; 11];
    for c in cards.iter().filter(|c| c.suit() == Suit::Denari) {
        have[c.value() as usize] = true;
    }
    let run = (1..=10).take_while(|&v| have[v]).count() as u32;
    if run >= 3 { run } else { 0 }
}

/// A team wins once it has at least `WINNING_SCORE` and more than the other.
pub fn winner_of(scores: &TeamScores) -> Option<Team> {
    [Team::A, Team::B].into_iter().find(|&team| {
        let own = scores.get(team);
        own >= WINNING_SCORE && own > scores.get(team.other())
    })
}

impl Game {
    /// All cards captured by the two players of `team` this round.
    pub fn team_captures(&self, team: Team) -> Vec<Card> {
        team.seats()
            .iter()
            .filter_map(|&seat| self.players.get(seat))
            .flat_map(|p| p.captures.iter().copied())
            .collect()
    }

    /// Scores the round and adds the points to the running totals.
    pub fn score_round(&mut self) -> RoundScore {
        let caps_a = self.team_captures(Team::A);
        let caps_b = self.team_captures(Team::B);
        let detail_a = TeamDetail {
            cards: caps_a.len(),
            denari: count(&caps_a, |c| c.suit() == Suit::Denari),
        };
        let detail_b = TeamDetail {
            cards: caps_b.len(),
            denari: count(&caps_b, |c| c.suit() == Suit::Denari),
        };

        let mut points = TeamScores::default();
        let mut notes = Vec::new();
        let mut award = |category: &str, winner: Option<Team>, suffix: &str, none: &str| match winner {
            Some(team) => {
                points.add(team, 1);
                notes.push(format!("{category}: +1 to {team}{suffix}"));
            }
            None => notes.push(format!("{category}: {none}")),
        };

        award("Carte", more(detail_a.cards, detail_b.cards), "", "tie, no point");
        award("Denari", more(detail_a.denari, detail_b.denari), "", "tie, no point");

        let holds = |cards: &[Card], pred: fn(&Card) -> bool| cards.iter().any(pred);
        let settebello = more(
            holds(&caps_a, Card::is_settebello) as usize,
            holds(&caps_b, Card::is_settebello) as usize,
        );
        award("Settebello", settebello, "", "nobody");
        let rebello = more(
            holds(&caps_a, Card::is_rebello) as usize,
            holds(&caps_b, Card::is_rebello) as usize,
        );
        award("Re bello", rebello, "", "nobody");

        let sevens = more(count(&caps_a, |c| c.value() == 7), count(&caps_b, |c| c.value() == 7));
        if sevens.is_some() {
            award("Primiera", sevens, " (7s)", "");
        } else {
            let sixes = more(count(&caps_a, |c| c.value() == 6), count(&caps_b, |c| c.value() == 6));
            award("Primiera", sixes, " (6s)", "tie, no point");
        }

        let napoli = TeamScores {
            a: napoli_points(&caps_a),
            b: napoli_points(&caps_b),
        };
        for team in [Team::A, Team::B] {
            let n = napoli.get(team);
            if n > 0 {
                points.add(team, n);
                notes.push(format!("Napoli: {team} gets {n} points"));
            }
        }
        if napoli.a == 0 && napoli.b == 0 {
            notes.push("Napoli: none".to_string());
        }

        self.team_scores.a += points.a;
        self.team_scores.b += points.b;

        RoundScore {
            round_points: points,
            team_scores: self.team_scores,
            detail_a,
            detail_b,
            napoli,
            notes,
        }
    }

    pub fn check_winner(&self) -> Option<Team> {
        winner_of(&self.team_scores)
    }

    /// Scores a finished round and moves to `RoundEnd` or `GameOver`.
    pub fn finish_round(&mut self) -> RoundResult {
        let score = self.score_round();
        let winner = self.check_winner();
        self.phase = if winner.is_some() { GamePhase::GameOver } else { GamePhase::RoundEnd };
        RoundResult { score, winner }
    }
}
