use crate::board::{Board, Mark, Move, Outcome};
use crate::config::Config;
use crate::error::GameError;
use crate::players::{ComputerPlayerRL, Player};
use crate::q_table::SharedQTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::mem;
use tracing::{debug, info, instrument, warn};

pub mod board;
pub mod config;
pub mod error;
pub mod players;
pub mod q_table;
pub mod symmetry;

/// Episodes between two progress lines while pretraining.
pub const PROGRESS_EVERY: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Session {
    Unprimed,
    Awaiting,
    Finished,
}

/// A player together with its mark and the state of its session.
struct Seat {
    player: Box<dyn Player>,
    mark: Mark,
    session: Session,
}

impl Seat {
    fn new(player: Box<dyn Player>, mark: Mark) -> Self {
        Seat {
            player,
            mark,
            session: Session::Unprimed,
        }
    }

    fn name(&self) -> &str {
        self.player.get_name()
    }

    fn violation(&self, reason: &str) -> GameError {
        GameError::Protocol {
            player: self.name().to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn expect_awaiting(&self) -> Result<(), GameError> {
        match self.session {
            Session::Awaiting => Ok(()),
            Session::Unprimed => Err(self.violation("session was not primed")),
            Session::Finished => Err(self.violation("input requested after the game finished")),
        }
    }

    fn prime(&mut self) -> Result<(), GameError> {
        if self.session != Session::Unprimed {
            return Err(self.violation("primed twice"));
        }
        self.player.prime(self.mark);
        self.session = Session::Awaiting;
        Ok(())
    }

    fn request(&mut self, board: &Board) -> Result<Move, GameError> {
        self.expect_awaiting()?;
        self.player.choose_move(board)
    }

    fn reject(&mut self, board: &Board, mv: Move) -> Result<Move, GameError> {
        self.expect_awaiting()?;
        self.player.on_illegal(board, mv)
    }

    fn finish(&mut self, outcome: Outcome) -> Result<(), GameError> {
        self.expect_awaiting()?;
        self.session = Session::Finished;
        self.player.on_finished(outcome)
    }
}

/// Result of one complete match.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSummary {
    pub outcome: Outcome,
    pub board: Board,
    /// Applied moves, cross first.
    pub history: Vec<Move>,
}

/// Drives a single match between two players. Cross always opens.
pub struct Game {
    pub board: Board,
    current_player: Seat,
    other_player: Seat,
    history: Vec<Move>,
}

impl Game {
    pub fn new(player_x: Box<dyn Player>, player_o: Box<dyn Player>) -> Self {
        Game {
            board: Board::new(),
            current_player: Seat::new(player_x, Mark::Cross),
            other_player: Seat::new(player_o, Mark::Nought),
            history: Vec::with_capacity(9),
        }
    }

    pub fn swap_players(&mut self) {
        mem::swap(&mut self.current_player, &mut self.other_player);
    }

    /// Plays the match to the end. Any error from a player stops the match
    /// on the spot; no result is delivered in that case.
    pub fn play(mut self) -> Result<GameSummary, GameError> {
        self.current_player.prime()?;
        self.other_player.prime()?;
        loop {
            let mark = self.current_player.mark;
            let mut mv = self.current_player.request(&self.board)?;
            while !self.board.is_legal(mv) {
                warn!(player = self.current_player.name(), %mv, "illegal move");
                mv = self.current_player.reject(&self.board, mv)?;
            }
            self.board = self.board.place(mv, mark);
            self.history.push(mv);
            debug!(player = self.current_player.name(), %mark, %mv, board = %self.board, "move");

            let outcome = match self.board.winner() {
                Some(winner) => Outcome::Win(winner),
                None if self.board.is_full() => Outcome::Draw,
                None => {
                    self.swap_players();
                    continue;
                }
            };
            return self.finish(outcome);
        }
    }

    fn finish(mut self, outcome: Outcome) -> Result<GameSummary, GameError> {
        debug!(?outcome, board = %self.board, "game finished");
        if self.current_player.mark != Mark::Cross {
            self.swap_players();
        }
        self.current_player.finish(outcome)?;
        self.other_player.finish(outcome)?;
        Ok(GameSummary {
            outcome,
            board: self.board,
            history: self.history,
        })
    }
}

/// Tally of a pretraining run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingStats {
    pub episodes: usize,
    pub x_wins: usize,
    pub o_wins: usize,
    pub draws: usize,
}

impl TrainingStats {
    fn record(&mut self, outcome: Outcome) {
        self.episodes += 1;
        match outcome {
            Outcome::Win(Mark::Cross) => self.x_wins += 1,
            Outcome::Win(Mark::Nought) => self.o_wins += 1,
            Outcome::Draw => self.draws += 1,
        }
    }
}

/// Runs `episodes` self-play matches between two exploring learners that
/// share `q`. Each learner gets its own generator seeded from `rng`.
#[instrument(skip(q, config, rng))]
pub fn pretrain<R: Rng>(
    q: &SharedQTable,
    config: &Config,
    episodes: usize,
    rng: &mut R,
) -> Result<TrainingStats, GameError> {
    let mut stats = TrainingStats::default();
    for episode in 1..=episodes {
        let player_x = ComputerPlayerRL::new(q.clone(), *config, StdRng::seed_from_u64(rng.gen()))
            .with_name("RL X")
            .training(true);
        let player_o = ComputerPlayerRL::new(q.clone(), *config, StdRng::seed_from_u64(rng.gen()))
            .with_name("RL O")
            .training(true);
        let summary = Game::new(Box::new(player_x), Box::new(player_o)).play()?;
        stats.record(summary.outcome);
        if episode % PROGRESS_EVERY == 0 {
            info!(
                episode,
                x_wins = stats.x_wins,
                o_wins = stats.o_wins,
                draws = stats.draws,
                table_size = q.borrow().len(),
                "pretraining"
            );
        }
    }
    info!(?stats, table_size = q.borrow().len(), "pretraining finished");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::FirstLegalPlayer;
    use crate::q_table::QTable;

    #[test]
    fn simple_players_play_to_a_cross_win() {
        let summary = Game::new(
            Box::new(FirstLegalPlayer::default()),
            Box::new(FirstLegalPlayer::default()),
        )
        .play()
        .unwrap();
        // X takes (0,0), (0,2), (1,1), (2,0): the anti diagonal.
        assert_eq!(summary.outcome, Outcome::Win(Mark::Cross));
        assert_eq!(summary.history.len(), 7);
        assert_eq!(summary.board.to_string(), "XOX/OXO/X--");
    }

    #[test]
    fn seat_rejects_calls_outside_its_session() {
        let mut seat = Seat::new(Box::new(FirstLegalPlayer::default()), Mark::Cross);
        assert!(matches!(
            seat.request(&Board::new()),
            Err(GameError::Protocol { .. })
        ));
        seat.prime().unwrap();
        assert!(matches!(seat.prime(), Err(GameError::Protocol { .. })));
        seat.request(&Board::new()).unwrap();
        seat.finish(Outcome::Draw).unwrap();
        assert!(matches!(
            seat.request(&Board::new()),
            Err(GameError::Protocol { .. })
        ));
        assert!(matches!(
            seat.finish(Outcome::Draw),
            Err(GameError::Protocol { .. })
        ));
    }

    #[test]
    fn pretrain_counts_every_episode() {
        let q = QTable::shared();
        let mut rng = StdRng::seed_from_u64(1);
        let stats = pretrain(&q, &Config::default(), 200, &mut rng).unwrap();
        assert_eq!(stats.episodes, 200);
        assert_eq!(stats.x_wins + stats.o_wins + stats.draws, 200);
        assert!(!q.borrow().is_empty());
    }

    #[test]
    fn pretrain_is_reproducible_from_a_seed() {
        let run = |seed| {
            let q = QTable::shared();
            let mut rng = StdRng::seed_from_u64(seed);
            let stats = pretrain(&q, &Config::default(), 100, &mut rng).unwrap();
            let size = q.borrow().len();
            (stats, size)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn trained_opening_is_not_losing() {
        let q = QTable::shared();
        let mut rng = StdRng::seed_from_u64(2024);
        pretrain(&q, &Config::default(), 3_000, &mut rng).unwrap();
        let best_opening = q.borrow().best_value(&Board::new());
        assert!(best_opening > -0.5, "best opening value {best_opening}");
    }
}
