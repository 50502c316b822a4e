use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::board::{Board, Coord};

/// The eight neighbour offsets, in traversal order: N, S, W, E, NW, NE, SW, SE.
pub const NEIGHBORS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// An ordered group of connected, equal-valued cells.
///
/// The first coordinate is the anchor where discovery started; the rest follow
/// depth-first visitation order. A chain is only meaningful against the board
/// it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Chain(Vec<Coord>);

impl Chain {
    #[inline]
    pub fn new(cells: Vec<Coord>) -> Self { Chain(cells) }

    #[inline]
    pub fn cells(&self) -> &[Coord] { &self.0 }

    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Where the merged tile lands.
    #[inline]
    pub fn anchor(&self) -> Option<Coord> { self.0.first().copied() }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Coord> { self.0.iter() }

    #[inline]
    pub fn into_inner(self) -> Vec<Coord> { self.0 }
}

impl From<Vec<Coord>> for Chain {
    fn from(cells: Vec<Coord>) -> Self { Chain(cells) }
}

impl From<Vec<(usize, usize)>> for Chain {
    fn from(cells: Vec<(usize, usize)>) -> Self { cells.into_iter().map(Coord::from).collect() }
}

impl FromIterator<Coord> for Chain {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self { Chain(iter.into_iter().collect()) }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Coord;
    type IntoIter = std::slice::Iter<'a, Coord>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl Index<usize> for Chain {
    type Output = Coord;

    fn index(&self, i: usize) -> &Coord { &self.0[i] }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Find every chain of two or more connected equal tiles.
///
/// Cells are scanned row-major; each unvisited tile anchors a depth-first walk
/// over its equal-valued 8-neighbours. Every cell is visited at most once per
/// call, so the returned chains partition the non-singleton tiles.
///
/// ```
/// use ai_2248::engine::{find_all_chains, Board};
/// let b = Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap();
/// let chains = find_all_chains(&b);
/// assert!(!chains.is_empty());
/// assert!(chains.iter().all(|c| c.len() >= 2));
/// ```
pub fn find_all_chains(board: &Board) -> Vec<Chain> {
    let mut chains = Vec::new();
    if board.is_degenerate() {
        return chains;
    }
    let mut visited = vec![false; board.cells().len()];
    let mut stack: Vec<(Coord, usize)> = Vec::new();
    for row in 0..board.rows() {
        for col in 0..board.cols() {
            let anchor = Coord::new(row, col);
            let idx = row * board.cols() + col;
            if visited[idx] || board.cells()[idx] == 0 {
                continue;
            }
            let chain = walk_chain(board, anchor, &mut visited, &mut stack);
            if chain.len() >= 2 {
                chains.push(Chain(chain));
            }
        }
    }
    log::trace!("found {} chains on a {}x{} board", chains.len(), board.rows(), board.cols());
    chains
}

// Iterative pre-order DFS. Each stack frame remembers which neighbour to try
// next, so cells come out in the same order a recursive walk would produce.
fn walk_chain(board: &Board, anchor: Coord, visited: &mut [bool], stack: &mut Vec<(Coord, usize)>) -> Vec<Coord> {
    let target = board[anchor];
    let cols = board.cols();
    let mut chain = vec![anchor];
    visited[anchor.row * cols + anchor.col] = true;
    stack.clear();
    stack.push((anchor, 0));
    while let Some(frame) = stack.last_mut() {
        let (cell, next_dir) = *frame;
        if next_dir == NEIGHBORS.len() {
            stack.pop();
            continue;
        }
        frame.1 += 1;
        let Some(next) = board.offset(cell, NEIGHBORS[next_dir]) else { continue };
        let idx = next.row * cols + next.col;
        if !visited[idx] && board.cells()[idx] == target {
            visited[idx] = true;
            chain.push(next);
            stack.push((next, 0));
        }
    }
    chain
}
