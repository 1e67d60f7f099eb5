//! Reduction of (board, move) pairs under the eight symmetries of the square.
//!
//! Every symmetry is a composition of a row reversal (bit 0), a column
//! reversal (bit 1) and a transpose (bit 2), applied in that order to the
//! grid and to the move coordinates alike.

use crate::board::{Board, Move};
use ndarray::Axis;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Symmetry(u8);

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry(0);
    const ROW_REVERSAL: u8 = 1;
    const COLUMN_REVERSAL: u8 = 2;
    const TRANSPOSE: u8 = 4;

    pub fn new(index: u8) -> Option<Self> {
        (index < 8).then_some(Symmetry(index))
    }

    /// All eight symmetries in index order.
    pub fn all() -> impl Iterator<Item = Symmetry> {
        (0..8).map(Symmetry)
    }

    pub fn apply(self, board: &Board, mv: Move) -> (Board, Move) {
        let last = Board::SIZE - 1;
        let mut view = board.cells();
        let Move { mut row, mut col } = mv;
        if self.0 & Self::ROW_REVERSAL != 0 {
            view.invert_axis(Axis(0));
            row = last - row;
        }
        if self.0 & Self::COLUMN_REVERSAL != 0 {
            view.invert_axis(Axis(1));
            col = last - col;
        }
        if self.0 & Self::TRANSPOSE != 0 {
            view = view.reversed_axes();
            std::mem::swap(&mut row, &mut col);
        }
        (Board::from_view(view), Move::new(row, col))
    }
}

/// Canonical (board, move) representative used to index the value table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub board: Board,
    pub mv: Move,
}

/// Row-major base-3 encoding of the cell weights.
fn cell_code(board: &Board) -> u32 {
    board
        .cells()
        .iter()
        .fold(0, |code, cell| code * 3 + cell.weight())
}

/// Order used to pick the representative: the order key first, then the
/// cell encoding, then the move. Images comparing equal are identical, so
/// the first one in symmetry order is kept.
fn compare_images(a: &(Board, Move), b: &(Board, Move)) -> Ordering {
    a.0.order_key()
        .cmp(&b.0.order_key())
        .then_with(|| cell_code(&a.0).cmp(&cell_code(&b.0)))
        .then_with(|| a.1.cmp(&b.1))
}

/// The cell sum alone is identical for all eight images of a board, so on
/// its own it would always keep the identity image and symmetric positions
/// would never share a key.
pub fn canonicalize(board: &Board, mv: Move) -> StateKey {
    let (board, mv) = Symmetry::all()
        .skip(1)
        .map(|symmetry| symmetry.apply(board, mv))
        .fold((board.clone(), mv), |best, image| {
            if compare_images(&image, &best) == Ordering::Less {
                image
            } else {
                best
            }
        });
    StateKey { board, mv }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Mark;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    #[test]
    fn identity_changes_nothing() {
        let b = board("XO-/---/--X");
        let mv = Move::new(0, 2);
        assert_eq!(Symmetry::IDENTITY.apply(&b, mv), (b.clone(), mv));
    }

    #[test]
    fn single_symmetries_move_cells_and_moves_together() {
        let b = Board::new().place(Move::new(0, 1), Mark::Cross);
        let mv = Move::new(0, 2);

        let (rows, rows_mv) = Symmetry::new(1).unwrap().apply(&b, mv);
        assert_eq!(rows, board("---/---/-X-"));
        assert_eq!(rows_mv, Move::new(2, 2));

        let (cols, cols_mv) = Symmetry::new(2).unwrap().apply(&b, mv);
        assert_eq!(cols, board("-X-/---/---"));
        assert_eq!(cols_mv, Move::new(0, 0));

        let (t, t_mv) = Symmetry::new(4).unwrap().apply(&b, mv);
        assert_eq!(t, board("---/X--/---"));
        assert_eq!(t_mv, Move::new(2, 0));
    }

    #[test]
    fn composition_applies_reversals_before_transpose() {
        let b = board("X--/---/---");
        let (image, mv) = Symmetry::new(5).unwrap().apply(&b, Move::new(0, 1));
        // row reversal puts X at (2, 0), transpose moves it to (0, 2)
        assert_eq!(image, board("--X/---/---"));
        assert_eq!(mv, Move::new(1, 2));
    }

    #[test]
    fn symmetries_preserve_the_winner() {
        let b = board("XO-/XO-/X--");
        for symmetry in Symmetry::all() {
            let (image, _) = symmetry.apply(&b, Move::new(2, 2));
            assert_eq!(image.winner(), Some(Mark::Cross));
            assert_eq!(image.order_key(), b.order_key());
        }
    }

    #[test]
    fn every_image_shares_one_key() {
        let b = board("X--/-O-/--X");
        let mv = Move::new(0, 1);
        let key = canonicalize(&b, mv);
        for symmetry in Symmetry::all() {
            let (image, image_mv) = symmetry.apply(&b, mv);
            assert_eq!(canonicalize(&image, image_mv), key);
        }
    }

    #[test]
    fn canonical_key_is_idempotent() {
        let key = canonicalize(&board("-X-/O--/---"), Move::new(2, 1));
        assert_eq!(canonicalize(&key.board, key.mv), key);
    }

    #[test]
    fn opening_moves_collapse_to_three_keys() {
        let empty = Board::new();
        let mut keys: Vec<StateKey> = empty
            .legal_moves()
            .into_iter()
            .map(|mv| canonicalize(&empty, mv))
            .collect();
        keys.sort_by_key(|key| key.mv);
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        assert!(Symmetry::new(8).is_none());
        assert_eq!(Symmetry::all().count(), 8);
    }
}
