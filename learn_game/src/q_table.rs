use crate::board::{Board, Mark, Move};
use crate::config::Config;
use crate::symmetry::{canonicalize, StateKey};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Value table shared by every learning player of a process (or a test).
pub type SharedQTable = Rc<RefCell<QTable>>;

/// Learned estimates keyed by canonical (board, move). Entries are created
/// by the first update that touches them and are never removed.
#[derive(Debug, Default)]
pub struct QTable {
    qtable: HashMap<StateKey, f64>,
}

impl QTable {
    pub fn new() -> Self {
        QTable {
            qtable: HashMap::with_capacity(4096),
        }
    }

    pub fn shared() -> SharedQTable {
        Rc::new(RefCell::new(QTable::new()))
    }

    pub fn len(&self) -> usize {
        self.qtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qtable.is_empty()
    }

    pub fn get(&self, key: &StateKey) -> Option<f64> {
        self.qtable.get(key).copied()
    }

    /// Estimate for playing `mv` on `board`, 0 when never updated.
    pub fn value(&self, board: &Board, mv: Move) -> f64 {
        self.get(&canonicalize(board, mv)).unwrap_or(0.0)
    }

    /// Greatest estimate over the legal moves of `board`, 0 when none.
    pub fn best_value(&self, board: &Board) -> f64 {
        board
            .legal_moves()
            .into_iter()
            .map(|mv| self.value(board, mv))
            .max_by(|value1, value2| value1.total_cmp(value2))
            .unwrap_or(0.0)
    }

    /// All moves among `moves` that share the greatest estimate.
    pub fn max_moves(&self, board: &Board, moves: &[Move]) -> Vec<Move> {
        moves
            .iter()
            .map(|&mv| (mv, self.value(board, mv)))
            .max_set_by(|(_, value1), (_, value2)| value1.total_cmp(value2))
            .into_iter()
            .map(|(mv, _)| mv)
            .collect()
    }

    fn blend(&mut self, key: StateKey, target: f64, config: &Config) -> f64 {
        let rate = config.learning_rate;
        let entry = self.qtable.entry(key).or_insert(0.0);
        *entry = (1.0 - rate) * *entry + rate * target;
        *entry
    }

    /// Bootstrap update after `mark` played `mv` on `board`.
    ///
    /// The best estimate of the resulting board belongs to the opponent, who
    /// moves next, so it enters the target negated.
    pub fn update_q_table(&mut self, board: &Board, mv: Move, mark: Mark, config: &Config) -> f64 {
        let successor = board.place(mv, mark);
        let best_next = self.best_value(&successor);
        let target = config.discount_rate * -best_next;
        let value = self.blend(canonicalize(board, mv), target, config);
        trace!(%board, %mv, best_next, value, "step update");
        value
    }

    /// Terminal update for the move that won the match: a fixed reward of 1.
    pub fn update_win(&mut self, board: &Board, mv: Move, config: &Config) -> f64 {
        let value = self.blend(canonicalize(board, mv), 1.0, config);
        trace!(%board, %mv, value, "win update");
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn unseen_entries_read_as_zero() {
        let q = QTable::new();
        assert_eq!(q.value(&Board::new(), Move::new(1, 1)), 0.0);
        assert_eq!(q.best_value(&Board::new()), 0.0);
        assert!(q.is_empty());
    }

    #[test]
    fn win_update_sets_value_to_one() {
        let mut q = QTable::new();
        let b = board("XX-/OO-/---");
        let value = q.update_win(&b, Move::new(0, 2), &Config::default());
        assert_eq!(value, 1.0);
        assert_eq!(q.value(&b, Move::new(0, 2)), 1.0);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn win_update_blends_with_partial_learning_rate() {
        let mut q = QTable::new();
        let config = Config {
            learning_rate: 0.5,
            ..Config::default()
        };
        let b = board("XX-/OO-/---");
        assert_eq!(q.update_win(&b, Move::new(0, 2), &config), 0.5);
        assert_eq!(q.update_win(&b, Move::new(0, 2), &config), 0.75);
    }

    #[test]
    fn step_update_negates_opponent_best_value() {
        let mut q = QTable::new();
        let config = Config::default();
        // O to move with a win on the middle row.
        let threat = board("XX-/OO-/X--");
        q.update_win(&threat, Move::new(1, 2), &config);

        // X's last move at (2, 0) left that win open.
        let before = board("XX-/OO-/---");
        let value = q.update_q_table(&before, Move::new(2, 0), Mark::Cross, &config);
        assert!((value - -0.9).abs() < 1e-12);
    }

    #[test]
    fn step_update_on_full_successor_bootstraps_from_zero() {
        let mut q = QTable::new();
        let b = board("XOX/XOO/OX-");
        let value = q.update_q_table(&b, Move::new(2, 2), Mark::Cross, &Config::default());
        assert_eq!(value, 0.0);
        assert_eq!(q.get(&canonicalize(&b, Move::new(2, 2))), Some(0.0));
    }

    #[test]
    fn symmetric_positions_share_entries() {
        let mut q = QTable::new();
        q.update_win(&Board::new(), Move::new(0, 0), &Config::default());
        assert_eq!(q.value(&Board::new(), Move::new(2, 2)), 1.0);
        assert_eq!(q.value(&Board::new(), Move::new(0, 1)), 0.0);
    }

    #[test]
    fn max_moves_returns_all_ties() {
        let mut q = QTable::new();
        let config = Config::default();
        let b = Board::new();
        q.update_win(&b, Move::new(1, 1), &config);
        assert_eq!(q.max_moves(&b, &b.legal_moves()), vec![Move::new(1, 1)]);

        let fresh = QTable::new();
        assert_eq!(fresh.max_moves(&b, &b.legal_moves()).len(), 9);
    }
}
