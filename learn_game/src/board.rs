use crate::error::ParseBoardError;
use itertools::Itertools;
use ndarray::prelude::*;
use std::{fmt, iter, str::FromStr};

/// The symbol a player puts on the board. Cross always moves first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Mark {
    Cross,
    Nought,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Self::Cross => Mark::Nought,
            Self::Nought => Mark::Cross,
        }
    }
    pub fn as_char(self) -> char {
        match self {
            Self::Cross => 'X',
            Self::Nought => 'O',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Cross,
    Nought,
}

impl Cell {
    pub fn mark(self) -> Option<Mark> {
        match self {
            Self::Empty => None,
            Self::Cross => Some(Mark::Cross),
            Self::Nought => Some(Mark::Nought),
        }
    }
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
    /// Contribution of the cell to a board's order key.
    pub fn weight(self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Cross => 1,
            Self::Nought => 2,
        }
    }
    pub fn as_char(self) -> char {
        self.mark().map_or('-', Mark::as_char)
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Cross => Cell::Cross,
            Mark::Nought => Cell::Nought,
        }
    }
}

/// Target cell of a move, zero-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub const fn new(row: usize, col: usize) -> Self {
        Move { row, col }
    }
}

impl From<(usize, usize)> for Move {
    fn from((row, col): (usize, usize)) -> Self {
        Move { row, col }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// How a match ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Outcome {
    Win(Mark),
    Draw,
}

impl Outcome {
    pub fn winner(self) -> Option<Mark> {
        match self {
            Outcome::Win(mark) => Some(mark),
            Outcome::Draw => None,
        }
    }
}

/// Immutable 3x3 grid. Placing a mark yields a new board.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: Array2<Cell>,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    pub const SIZE: usize = 3;

    pub fn new() -> Self {
        Board {
            cells: Array::from_elem((Self::SIZE, Self::SIZE), Cell::Empty),
        }
    }

    /// Builds a board from any 3x3 view, normalising the memory layout so
    /// that equal grids hash equally.
    pub(crate) fn from_view(view: ArrayView2<Cell>) -> Self {
        debug_assert_eq!(view.dim(), (Self::SIZE, Self::SIZE));
        Board {
            cells: view.as_standard_layout().into_owned(),
        }
    }

    pub fn cells(&self) -> ArrayView2<Cell> {
        self.cells.view()
    }

    /// The cell under `mv`, or `None` when the move is off the board.
    pub fn cell(&self, mv: Move) -> Option<Cell> {
        self.cells.get([mv.row, mv.col]).copied()
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.cell(mv) == Some(Cell::Empty)
    }

    /// Returns a new board with `mark` at `mv`.
    ///
    /// The target cell must be empty; callers check [`Board::is_legal`] first.
    pub fn place(&self, mv: Move, mark: Mark) -> Board {
        debug_assert!(self.is_legal(mv), "placing {mark} on occupied cell {mv}");
        let mut cells = self.cells.clone();
        cells[[mv.row, mv.col]] = mark.into();
        Board { cells }
    }

    /// Empty cells in row-major order.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.cells
            .indexed_iter()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| Move::from(index))
            .collect()
    }

    /// Checks rows, then columns, then the main and anti diagonals, and
    /// returns the mark of the first fully matching line.
    pub fn winner(&self) -> Option<Mark> {
        let mirrored = self.cells.slice(s![.., ..;-1]);
        self.cells
            .rows()
            .into_iter()
            .chain(self.cells.columns())
            .chain(iter::once(self.cells.diag()))
            .chain(iter::once(mirrored.diag()))
            .find_map(line_winner)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// Sum of cell weights; cheap discriminator between symmetric images.
    pub fn order_key(&self) -> u32 {
        self.cells.iter().map(|cell| cell.weight()).sum()
    }

    pub fn count(&self, mark: Mark) -> usize {
        let cell = Cell::from(mark);
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Whose turn it is on a board reached by legal alternating play.
    pub fn to_move(&self) -> Mark {
        if self.count(Mark::Cross) > self.count(Mark::Nought) {
            Mark::Nought
        } else {
            Mark::Cross
        }
    }
}

fn line_winner(line: ArrayView1<Cell>) -> Option<Mark> {
    let first = line[0].mark()?;
    line.iter()
        .all(|cell| cell.mark() == Some(first))
        .then_some(first)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rows = self
            .cells
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|cell| cell.as_char()).collect::<String>())
            .join("/");
        write!(f, "{rows}")
    }
}

/// Parses nine cells written as `X`, `O` and `-` (or `.`), ignoring `/`
/// separators and whitespace, e.g. `"XXX/OO-/---"`.
impl FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cells = s
            .chars()
            .filter(|c| *c != '/' && !c.is_whitespace())
            .map(|c| match c {
                'X' | 'x' => Ok(Cell::Cross),
                'O' | 'o' => Ok(Cell::Nought),
                '-' | '.' => Ok(Cell::Empty),
                other => Err(ParseBoardError::InvalidCell(other)),
            })
            .collect::<Result<Vec<Cell>, _>>()?;
        let len = cells.len();
        let cells = Array2::from_shape_vec((Self::SIZE, Self::SIZE), cells)
            .map_err(|_| ParseBoardError::WrongCellCount(len))?;
        Ok(Board { cells })
    }
}
