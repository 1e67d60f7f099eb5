use crate::board::{Board, Mark, Move, Outcome};
use crate::config::Config;
use crate::error::GameError;
use crate::q_table::SharedQTable;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

/// One side of a match. The engine primes the player, asks it for moves,
/// may reject a move, and finally reports the result exactly once.
pub trait Player {
    fn get_name(&self) -> &str;
    /// Starts a new session playing `mark`.
    fn prime(&mut self, mark: Mark);
    fn choose_move(&mut self, board: &Board) -> Result<Move, GameError>;
    /// The engine rejected `mv` on `board`; return a replacement.
    fn on_illegal(&mut self, board: &Board, mv: Move) -> Result<Move, GameError>;
    fn on_finished(&mut self, outcome: Outcome) -> Result<(), GameError>;
}

/// Supplies moves for a [`HumanPlayer`]: a console, a script, a test.
///
/// Malformed input must be dealt with by the source itself; it only hands
/// back well-formed coordinates, or `None` once its input is exhausted.
pub trait MoveSource {
    fn next_move(&mut self, mark: Mark, board: &Board, legal: &[Move]) -> Option<Move>;
    fn illegal_move(&mut self, _mv: Move) {}
    fn game_finished(&mut self, _mark: Mark, _outcome: Outcome) {}
}

/// Message shown to a human playing `mark` when the match ends.
pub fn result_message(mark: Mark, outcome: Outcome) -> String {
    match outcome {
        Outcome::Win(winner) if winner == mark => format!("{winner} wins!"),
        Outcome::Win(winner) => format!("{winner} wins this one. Try again!"),
        Outcome::Draw => "Draw.".to_owned(),
    }
}

#[derive(Debug)]
pub struct HumanPlayer<S> {
    pub name: String,
    mark: Mark,
    source: S,
}

impl<S: MoveSource> HumanPlayer<S> {
    pub fn new(name: impl Into<String>, source: S) -> Self {
        HumanPlayer {
            name: name.into(),
            mark: Mark::Cross,
            source,
        }
    }

    fn ask(&mut self, board: &Board) -> Result<Move, GameError> {
        self.source
            .next_move(self.mark, board, &board.legal_moves())
            .ok_or_else(|| GameError::InputClosed {
                player: self.name.clone(),
            })
    }
}

impl<S: MoveSource> Player for HumanPlayer<S> {
    fn get_name(&self) -> &str {
        &self.name
    }
    fn prime(&mut self, mark: Mark) {
        self.mark = mark;
    }
    fn choose_move(&mut self, board: &Board) -> Result<Move, GameError> {
        self.ask(board)
    }
    fn on_illegal(&mut self, board: &Board, mv: Move) -> Result<Move, GameError> {
        self.source.illegal_move(mv);
        self.ask(board)
    }
    fn on_finished(&mut self, outcome: Outcome) -> Result<(), GameError> {
        self.source.game_finished(self.mark, outcome);
        Ok(())
    }
}

pub fn first_legal_move(board: &Board) -> Option<Move> {
    board
        .cells()
        .indexed_iter()
        .find(|(_, cell)| cell.is_empty())
        .map(|(index, _)| Move::from(index))
}

/// Always takes the first empty cell in row-major order.
#[derive(Debug)]
pub struct FirstLegalPlayer {
    pub name: String,
}

impl Default for FirstLegalPlayer {
    fn default() -> Self {
        FirstLegalPlayer {
            name: "Simple AI".to_owned(),
        }
    }
}

impl Player for FirstLegalPlayer {
    fn get_name(&self) -> &str {
        &self.name
    }
    fn prime(&mut self, _mark: Mark) {}
    fn choose_move(&mut self, board: &Board) -> Result<Move, GameError> {
        first_legal_move(board).ok_or_else(|| GameError::NoLegalMoves {
            player: self.name.clone(),
        })
    }
    fn on_illegal(&mut self, _board: &Board, mv: Move) -> Result<Move, GameError> {
        Err(GameError::IllegalMove {
            player: self.name.clone(),
            mv,
        })
    }
    fn on_finished(&mut self, _outcome: Outcome) -> Result<(), GameError> {
        Ok(())
    }
}

/// Epsilon-greedy player learning into a shared value table.
///
/// Between turns it remembers the board it last moved from and the move it
/// made; that pair is updated once the opponent has replied, and again
/// when the result arrives.
#[derive(Debug)]
pub struct ComputerPlayerRL<R = StdRng> {
    pub name: String,
    mark: Mark,
    q: SharedQTable,
    config: Config,
    training: bool,
    rng: R,
    last: Option<(Board, Move)>,
}

impl<R: Rng> ComputerPlayerRL<R> {
    pub fn new(q: SharedQTable, config: Config, rng: R) -> Self {
        ComputerPlayerRL {
            name: "RL".to_owned(),
            mark: Mark::Cross,
            q,
            config,
            training: false,
            rng,
            last: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Exploration only happens in training mode.
    pub fn training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    pub fn last_move(&self) -> Option<&(Board, Move)> {
        self.last.as_ref()
    }

    fn is_exploration_step(&mut self) -> bool {
        self.training && self.rng.gen::<f64>() < self.config.exploration_rate
    }

    fn no_legal_moves(&self) -> GameError {
        GameError::NoLegalMoves {
            player: self.name.clone(),
        }
    }
}

impl<R: Rng> Player for ComputerPlayerRL<R> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn prime(&mut self, mark: Mark) {
        self.mark = mark;
        self.last = None;
    }

    fn choose_move(&mut self, board: &Board) -> Result<Move, GameError> {
        if let Some((last_board, last_move)) = &self.last {
            self.q
                .borrow_mut()
                .update_q_table(last_board, *last_move, self.mark, &self.config);
        }

        let legal_moves = board.legal_moves();
        let mv = if self.is_exploration_step() {
            let mv = *legal_moves
                .choose(&mut self.rng)
                .ok_or_else(|| self.no_legal_moves())?;
            debug!(player = %self.name, %mv, "exploring");
            mv
        } else {
            let max_moves = self.q.borrow().max_moves(board, &legal_moves);
            *max_moves
                .choose(&mut self.rng)
                .ok_or_else(|| self.no_legal_moves())?
        };

        self.last = Some((board.clone(), mv));
        Ok(mv)
    }

    fn on_illegal(&mut self, _board: &Board, mv: Move) -> Result<Move, GameError> {
        Err(GameError::IllegalMove {
            player: self.name.clone(),
            mv,
        })
    }

    fn on_finished(&mut self, outcome: Outcome) -> Result<(), GameError> {
        let (last_board, last_move) =
            self.last
                .take()
                .ok_or_else(|| GameError::FinishedBeforeMove {
                    player: self.name.clone(),
                })?;
        let mut q = self.q.borrow_mut();
        if outcome == Outcome::Win(self.mark) {
            q.update_win(&last_board, last_move, &self.config);
        } else {
            // Draws and losses bootstrap like any other step.
            q.update_q_table(&last_board, last_move, self.mark, &self.config);
        }
        Ok(())
    }
}
