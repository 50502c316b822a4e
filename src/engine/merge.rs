use serde::{Deserialize, Serialize};

use super::board::{Board, Tile};
use super::chains::Chain;
use super::EngineError;

/// Result of collapsing one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub board: Board,
    /// Sum of the tiles consumed by the merge.
    pub gain: Tile,
    /// Value written at the chain's anchor (0 when nothing merged).
    pub merged_value: Tile,
}

impl Board {
    /// Collapse `chain` into a single tile at its anchor.
    ///
    /// See [`simulate_merge`].
    pub fn merge_chain(&self, chain: &Chain) -> Result<MergeOutcome, EngineError> {
        if chain.len() < 2 {
            return Ok(MergeOutcome { board: self.clone(), gain: 0, merged_value: 0 });
        }
        let value = chain.validate_against(self)?;
        let len = chain.len();
        let overflow = || EngineError::MergeOverflow { value, len };
        let shift = u32::try_from(len - 1).map_err(|_| overflow())?;
        let merged_value = value
            .checked_mul(1u64.checked_shl(shift).ok_or_else(overflow)?)
            .ok_or_else(overflow)?;
        let gain = value.checked_mul(len as Tile).ok_or_else(overflow)?;

        let mut cells: Box<[Tile]> = self.cells().into();
        for &c in chain {
            cells[c.row * self.cols() + c.col] = 0;
        }
        if let Some(anchor) = chain.anchor() {
            cells[anchor.row * self.cols() + anchor.col] = merged_value;
        }
        Ok(MergeOutcome {
            board: Board::from_parts_unchecked(self.rows(), self.cols(), cells),
            gain,
            merged_value,
        })
    }
}

impl Chain {
    /// Check that the chain is a legal merge on `board` and return its shared value.
    ///
    /// Every cell must be on the board, distinct, non-empty and equal to the
    /// anchor's value.
    pub fn validate_against(&self, board: &Board) -> Result<Tile, EngineError> {
        let anchor = self.anchor().ok_or_else(|| EngineError::chain("chain is empty"))?;
        let mut seen = vec![false; board.cells().len()];
        let mut value = None;
        for &c in self {
            let idx = board
                .index_of(c)
                .ok_or_else(|| EngineError::chain(format!("{c} is outside a {}x{} board", board.rows(), board.cols())))?;
            if std::mem::replace(&mut seen[idx], true) {
                return Err(EngineError::chain(format!("{c} appears twice")));
            }
            let v = board.cells()[idx];
            let expected = *value.get_or_insert(v);
            if v == 0 {
                return Err(EngineError::chain(format!("{c} is empty")));
            }
            if v != expected {
                return Err(EngineError::chain(format!("{c} holds {v}, anchor {anchor} holds {expected}")));
            }
        }
        Ok(value.unwrap_or(0))
    }
}

/// Collapse `chain` into one tile and report the score gained.
///
/// With anchor value `v` and `n` cells, every chain cell is cleared and
/// `v * 2^(n-1)` is written at the anchor; the gain is `v * n`. The input board
/// is left untouched. Chains shorter than two cells return an unchanged copy
/// and zero gain.
///
/// ```
/// use ai_2248::engine::{simulate_merge, Board, Chain};
/// let b = Board::from_rows(&[[2, 2, 4, 4], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();
/// let (nb, gain) = simulate_merge(&b, &Chain::from(vec![(0, 0), (0, 1)])).unwrap();
/// assert_eq!(nb.get(0, 0), Some(4));
/// assert_eq!(nb.get(0, 1), Some(0));
/// assert_eq!(gain, 4);
/// ```
pub fn simulate_merge(board: &Board, chain: &Chain) -> Result<(Board, Tile), EngineError> {
    board.merge_chain(chain).map(|out| (out.board, out.gain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{find_all_chains, Coord};

    fn sample() -> Board {
        Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap()
    }

    #[test]
    fn pair_merge() {
        let b = Board::from_rows(&[[2, 2, 4, 4], [0, 0, 0, 0]]).unwrap();
        let (nb, gain) = simulate_merge(&b, &Chain::from(vec![(0, 0), (0, 1)])).unwrap();
        assert_eq!(nb.to_rows(), vec![vec![4, 0, 4, 4], vec![0, 0, 0, 0]]);
        assert_eq!(gain, 4);
        assert_eq!(b.get(0, 1), Some(2));
    }

    #[test]
    fn long_chain_doubles_per_extra_tile() {
        let b = sample();
        let chain = Chain::from(vec![(3, 0), (3, 1), (3, 2), (3, 3)]);
        let out = b.merge_chain(&chain).unwrap();
        assert_eq!(out.merged_value, 16);
        assert_eq!(out.gain, 8);
        assert_eq!(out.board.iter_rows().nth(3).unwrap(), &[16, 0, 0, 0]);
        // rest of the board unchanged
        for r in 0..3 {
            for c in 0..4 {
                assert_eq!(out.board.get(r, c), b.get(r, c));
            }
        }
    }

    #[test]
    fn merge_lands_on_anchor_not_first_in_grid() {
        let b = sample();
        let chain = Chain::from(vec![(2, 3), (1, 3), (2, 2)]);
        let out = b.merge_chain(&chain).unwrap();
        assert_eq!(out.board.get(2, 3), Some(32));
        assert_eq!(out.board.get(1, 3), Some(0));
        assert_eq!(out.board.get(2, 2), Some(0));
        assert_eq!(out.gain, 24);
    }

    #[test]
    fn short_chains_are_noops() {
        let b = sample();
        for chain in [Chain::default(), Chain::from(vec![(0, 0)])] {
            let (nb, gain) = simulate_merge(&b, &chain).unwrap();
            assert_eq!(nb, b);
            assert_eq!(gain, 0);
        }
    }

    #[test]
    fn rejects_inconsistent_chains() {
        let b = sample();
        let cases = [
            vec![(0, 0), (9, 9)],
            vec![(0, 0), (0, 2)],
            vec![(1, 1), (2, 1)],
            vec![(0, 0), (0, 0)],
        ];
        for cells in cases {
            let chain = Chain::from(cells);
            assert!(
                matches!(simulate_merge(&b, &chain), Err(EngineError::InvalidChain { .. })),
                "{chain} should be rejected"
            );
        }
    }

    #[test]
    fn overflow_is_reported() {
        let b = Board::from_cells(1, 2, vec![1 << 63, 1 << 63]).unwrap();
        let chain = Chain::new(vec![Coord::new(0, 0), Coord::new(0, 1)]);
        assert!(matches!(b.merge_chain(&chain), Err(EngineError::MergeOverflow { len: 2, .. })));
    }

    #[test]
    fn every_found_chain_merges() {
        let b = sample();
        for chain in find_all_chains(&b) {
            let v = b[chain[0]];
            let out = b.merge_chain(&chain).unwrap();
            assert_eq!(out.gain, v * chain.len() as Tile);
            assert_eq!(out.board[chain[0]], v << (chain.len() - 1));
            assert!(chain.iter().skip(1).all(|&c| out.board[c] == 0));
        }
    }
}
