use crate::board::Move;
use thiserror::Error;

/// Fatal conditions raised while driving a match. Each one means a broken
/// collaborator; the match stops as soon as one surfaces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("illegal move {mv} by computer player {player}")]
    IllegalMove { player: String, mv: Move },

    #[error("{player} was asked to move with no legal moves available")]
    NoLegalMoves { player: String },

    #[error("{player} received the game result before making a move")]
    FinishedBeforeMove { player: String },

    #[error("protocol violation by {player}: {reason}")]
    Protocol { player: String, reason: String },

    #[error("move input for {player} was closed")]
    InputClosed { player: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseBoardError {
    #[error("invalid cell character {0:?}")]
    InvalidCell(char),

    #[error("expected 9 cells, found {0}")]
    WrongCellCount(usize),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}
