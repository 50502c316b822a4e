use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::EngineError;

/// A single cell value. `0` is empty, anything else is a tile.
pub type Tile = u64;

/// A `(row, col)` position on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self { Coord { row, col } }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self { Coord { row, col } }
}

impl From<Coord> for (usize, usize) {
    fn from(c: Coord) -> Self { (c.row, c.col) }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Rectangular 2248 board stored row-major in an owned buffer.
///
/// Boards are values: nothing in this crate mutates a board after it is
/// built, and every transformation returns a fresh `Board`.
///
/// ```
/// use ai_2248::engine::Board;
/// let b = Board::from_rows(&[[2, 4], [0, 8]]).unwrap();
/// assert_eq!((b.rows(), b.cols()), (2, 2));
/// assert_eq!(b.highest_tile(), 8);
/// assert_eq!(b.count_empty(), 1);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoardParts", into = "BoardParts")]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Box<[Tile]>,
}

impl Board {
    /// Build a board from nested rows of signed values.
    ///
    /// Rejects ragged rows and negative values. An empty slice yields a
    /// 0x0 board.
    pub fn from_rows<R: AsRef<[i64]>>(rows: &[R]) -> Result<Self, EngineError> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(EngineError::board(format!(
                    "row {r} has {} cells, expected {cols}",
                    row.len()
                )));
            }
            for (c, &v) in row.iter().enumerate() {
                if v < 0 {
                    return Err(EngineError::board(format!("negative value {v} at ({r},{c})")));
                }
                cells.push(v as Tile);
            }
        }
        Ok(Board { rows: rows.len(), cols, cells: cells.into_boxed_slice() })
    }

    /// Build a board from a row-major cell buffer.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Tile>) -> Result<Self, EngineError> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| EngineError::board(format!("{rows}x{cols} is too large")))?;
        if cells.len() != expected {
            return Err(EngineError::board(format!(
                "{} cells given for a {rows}x{cols} board",
                cells.len()
            )));
        }
        Ok(Board { rows, cols, cells: cells.into_boxed_slice() })
    }

    /// An all-empty board of the given size.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Board { rows, cols, cells: vec![0; rows * cols].into_boxed_slice() }
    }

    /// A board with every cell filled by a random tile `2^k`, `1 <= k <= max_exponent`.
    ///
    /// ```
    /// use ai_2248::engine::Board;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let b = Board::random(5, 4, 4, &mut rng);
    /// assert_eq!(b.count_empty(), 0);
    /// assert!(b.highest_tile() <= 16);
    /// ```
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, max_exponent: u32, rng: &mut R) -> Self {
        Board::empty(rows, cols).with_random_fill(max_exponent, rng)
    }

    /// Return a copy with every empty cell replaced by a random tile.
    pub fn with_random_fill<R: Rng + ?Sized>(&self, max_exponent: u32, rng: &mut R) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|&v| if v == 0 { generate_random_tile(max_exponent, rng) } else { v })
            .collect();
        Board { rows: self.rows, cols: self.cols, cells }
    }

    #[inline]
    pub fn rows(&self) -> usize { self.rows }

    #[inline]
    pub fn cols(&self) -> usize { self.cols }

    /// True when the board has no cells at all (zero rows or zero columns).
    #[inline]
    pub fn is_degenerate(&self) -> bool { self.cells.is_empty() }

    /// Row-major view of the cells.
    #[inline]
    pub fn cells(&self) -> &[Tile] { &self.cells }

    /// Value at `(row, col)`, or `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        self.index_of(Coord::new(row, col)).map(|i| self.cells[i])
    }

    /// Value at `coord`, or `None` when out of bounds.
    #[inline]
    pub fn tile_at(&self, coord: Coord) -> Option<Tile> {
        self.index_of(coord).map(|i| self.cells[i])
    }

    #[inline]
    pub fn contains(&self, coord: Coord) -> bool { coord.row < self.rows && coord.col < self.cols }

    #[inline]
    pub(crate) fn index_of(&self, coord: Coord) -> Option<usize> {
        self.contains(coord).then(|| coord.row * self.cols + coord.col)
    }

    /// Neighbour of `coord` offset by `(dr, dc)`, if it lies on the board.
    #[inline]
    pub fn offset(&self, coord: Coord, (dr, dc): (isize, isize)) -> Option<Coord> {
        let row = coord.row.checked_add_signed(dr)?;
        let col = coord.col.checked_add_signed(dc)?;
        let next = Coord::new(row, col);
        self.contains(next).then_some(next)
    }

    /// Iterate the board as rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Tile]> + '_ {
        // one slice per row, empty when cols == 0
        let cols = self.cols;
        (0..self.rows).map(move |r| &self.cells[r * cols..(r + 1) * cols])
    }

    /// Copy out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<Tile>> { self.iter_rows().map(<[Tile]>::to_vec).collect() }

    /// Highest tile value, 0 if the board is empty.
    #[inline]
    pub fn highest_tile(&self) -> Tile { self.cells.iter().copied().max().unwrap_or(0) }

    /// Number of empty cells.
    #[inline]
    pub fn count_empty(&self) -> usize { self.cells.iter().filter(|&&v| v == 0).count() }

    /// Sum of every tile on the board.
    #[inline]
    pub fn tile_sum(&self) -> Tile { self.cells.iter().fold(0, |acc: Tile, &v| acc.saturating_add(v)) }

    pub(crate) fn from_parts_unchecked(rows: usize, cols: usize, cells: Box<[Tile]>) -> Self {
        debug_assert_eq!(cells.len(), rows * cols);
        Board { rows, cols, cells }
    }
}

impl Index<Coord> for Board {
    type Output = Tile;

    fn index(&self, coord: Coord) -> &Tile {
        match self.index_of(coord) {
            Some(i) => &self.cells[i],
            None => panic!("{coord} is outside a {}x{} board", self.rows, self.cols),
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({}x{}, {:?})", self.rows, self.cols, self.to_rows())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.highest_tile().to_string().len().max(1);
        let rule = "-".repeat(self.cols * (width + 3));
        for (r, row) in self.iter_rows().enumerate() {
            if r > 0 {
                writeln!(f, "{rule}")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v, width)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

/// Parse a text grid: one row per line, cells split by whitespace or commas.
///
/// Blank lines are skipped and `.` is read as an empty cell.
///
/// ```
/// use ai_2248::engine::Board;
/// let b: Board = "2, 2, .\n4 0 8\n".parse().unwrap();
/// assert_eq!(b.to_rows(), vec![vec![2, 2, 0], vec![4, 0, 8]]);
/// assert!("2 2\n4".parse::<Board>().is_err());
/// ```
impl FromStr for Board {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<Vec<i64>> = Vec::new();
        for (line_no, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(|ch: char| ch == ',' || ch.is_whitespace())
                .filter(|tok| !tok.is_empty())
                .map(|tok| match tok {
                    "." => Ok(0),
                    _ => tok.parse::<i64>().map_err(|e| {
                        EngineError::board(format!("line {}: bad cell '{tok}': {e}", line_no + 1))
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Board::from_rows(&rows)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct BoardParts {
    rows: usize,
    cols: usize,
    cells: Vec<Tile>,
}

impl TryFrom<BoardParts> for Board {
    type Error = EngineError;

    fn try_from(p: BoardParts) -> Result<Self, Self::Error> { Board::from_cells(p.rows, p.cols, p.cells) }
}

impl From<Board> for BoardParts {
    fn from(b: Board) -> Self { BoardParts { rows: b.rows, cols: b.cols, cells: b.cells.into_vec() } }
}

fn generate_random_tile<R: Rng + ?Sized>(max_exponent: u32, rng: &mut R) -> Tile {
    1 << rng.gen_range(1..=max_exponent.clamp(1, 63))
}

fn format_val(val: Tile, width: usize) -> String {
    match val {
        0 => format!(" {:width$} ", ""),
        x => format!(" {x:>width$} "),
    }
}
