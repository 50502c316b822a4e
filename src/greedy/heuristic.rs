use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::engine::{Board, Coord, EngineError, NEIGHBORS};

/// Tiles below this value count toward the cluster penalty.
pub const SMALL_TILE_LIMIT: u64 = 32;

/// Feature names accepted in a weight mapping.
pub const FEATURE_NAMES: [&str; 5] = ["max_tile", "empty_cells", "monotonicity", "smoothness", "cluster_penalty"];

/// Weights for the five board features.
///
/// `Default` gives the tuned reference values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    pub max_tile: f64,
    pub empty_cells: f64,
    pub monotonicity: f64,
    pub smoothness: f64,
    pub cluster_penalty: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self { max_tile: 1.0, empty_cells: 2.0, monotonicity: 1.0, smoothness: 1.5, cluster_penalty: 0.5 }
    }
}

impl HeuristicWeights {
    /// Build from a name -> weight lookup. Every feature must be present;
    /// unknown names are ignored.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use ai_2248::engine::EngineError;
    /// use ai_2248::greedy::HeuristicWeights;
    ///
    /// let mut map: HashMap<String, f64> = HashMap::new();
    /// map.insert("max_tile".into(), 1.0);
    /// assert_eq!(HeuristicWeights::from_map(&map), Err(EngineError::MissingWeight("empty_cells")));
    /// ```
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, EngineError>
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let mut get = |name: &'static str| lookup(name).ok_or(EngineError::MissingWeight(name));
        Ok(Self {
            max_tile: get("max_tile")?,
            empty_cells: get("empty_cells")?,
            monotonicity: get("monotonicity")?,
            smoothness: get("smoothness")?,
            cluster_penalty: get("cluster_penalty")?,
        })
    }

    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self, EngineError> {
        Self::from_lookup(|name| map.get(name).copied())
    }

    pub fn from_btree(map: &BTreeMap<String, f64>) -> Result<Self, EngineError> {
        Self::from_lookup(|name| map.get(name).copied())
    }

    /// Parse a JSON object of feature weights.
    ///
    /// ```
    /// use ai_2248::greedy::HeuristicWeights;
    /// let w = HeuristicWeights::from_json_str(
    ///     r#"{"max_tile": 1, "empty_cells": 2, "monotonicity": 1, "smoothness": 1.5, "cluster_penalty": 0.5}"#,
    /// ).unwrap();
    /// assert_eq!(w, HeuristicWeights::default());
    /// assert!(HeuristicWeights::from_json_str(r#"{"max_tile": 1}"#).is_err());
    /// ```
    pub fn from_json_str(s: &str) -> Result<Self, EngineError> {
        let map: BTreeMap<String, f64> =
            serde_json::from_str(s).map_err(|e| EngineError::InvalidWeights(e.to_string()))?;
        Self::from_btree(&map)
    }

    /// The weights as a name -> weight mapping.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        FEATURE_NAMES
            .iter()
            .zip([self.max_tile, self.empty_cells, self.monotonicity, self.smoothness, self.cluster_penalty])
            .map(|(name, w)| (name.to_string(), w))
            .collect()
    }
}

/// Raw feature values for a board, before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Features {
    pub max_tile: u64,
    pub empty_cells: u64,
    pub monotonicity: i64,
    /// Always <= 0. Wide enough for differences between any two tiles.
    pub smoothness: i128,
    pub cluster_penalty: u64,
}

impl Features {
    /// Weighted sum; the cluster penalty is subtracted.
    #[inline]
    pub fn weighted(&self, w: &HeuristicWeights) -> f64 {
        w.max_tile * self.max_tile as f64
            + w.empty_cells * self.empty_cells as f64
            + w.monotonicity * self.monotonicity as f64
            + w.smoothness * self.smoothness as f64
            - w.cluster_penalty * self.cluster_penalty as f64
    }
}

/// Measure all five features of `board`.
pub fn evaluate_features(board: &Board) -> Features {
    Features {
        max_tile: board.highest_tile(),
        empty_cells: board.count_empty() as u64,
        monotonicity: calc_monotonicity(board),
        smoothness: calc_smoothness(board),
        cluster_penalty: calc_cluster_penalty(board),
    }
}

/// Heuristic score of a board; higher is better.
///
/// ```
/// use ai_2248::engine::Board;
/// use ai_2248::greedy::{evaluate_position, HeuristicWeights};
/// let b = Board::from_rows(&[[2, 4, 8, 16], [32, 64, 128, 256], [512, 1024, 2048, 0], [0, 0, 0, 0]]).unwrap();
/// let s = evaluate_position(&b, &HeuristicWeights::default());
/// assert!(s.is_finite());
/// ```
#[inline]
pub fn evaluate_position(board: &Board, weights: &HeuristicWeights) -> f64 {
    evaluate_features(board).weighted(weights)
}

// +1 for every adjacent non-empty pair that does not increase going right or
// down, -1 for every pair that does.
fn calc_monotonicity(board: &Board) -> i64 {
    let score = |a: u64, b: u64| -> i64 {
        match (a, b) {
            (0, _) | (_, 0) => 0,
            (a, b) if a >= b => 1,
            _ => -1,
        }
    };
    let rows: i64 = board.iter_rows().map(|row| row.windows(2).map(|p| score(p[0], p[1])).sum::<i64>()).sum();
    let cols: i64 = board
        .iter_rows()
        .zip(board.iter_rows().skip(1))
        .map(|(top, bottom)| top.iter().zip(bottom).map(|(&a, &b)| score(a, b)).sum::<i64>())
        .sum();
    rows + cols
}

// Right and down neighbours only, so each pair is counted once.
fn calc_smoothness(board: &Board) -> i128 {
    let mut smoothness = 0i128;
    for (r, row) in board.iter_rows().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            if v == 0 {
                continue;
            }
            for (dr, dc) in [(0usize, 1usize), (1, 0)] {
                if let Some(n) = board.get(r + dr, c + dc) {
                    if n != 0 {
                        smoothness -= i128::from(v.abs_diff(n));
                    }
                }
            }
        }
    }
    smoothness
}

// Ordered pairs: two adjacent small tiles add 2.
fn calc_cluster_penalty(board: &Board) -> u64 {
    let is_small = |v: u64| v != 0 && v < SMALL_TILE_LIMIT;
    let mut penalty = 0u64;
    for (r, row) in board.iter_rows().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            if !is_small(v) {
                continue;
            }
            let here = Coord::new(r, c);
            penalty += NEIGHBORS
                .iter()
                .filter_map(|&d| board.offset(here, d))
                .filter(|&n| is_small(board[n]))
                .count() as u64;
        }
    }
    penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[[i64; 4]]) -> Board { Board::from_rows(rows).unwrap() }

    #[test]
    fn features_of_reference_board() {
        let b = board(&[[2, 4, 8, 16], [32, 64, 128, 256], [512, 1024, 2048, 0], [0, 0, 0, 0]]);
        let f = evaluate_features(&b);
        assert_eq!(f.max_tile, 2048);
        assert_eq!(f.empty_cells, 5);
        // rows all increase (-3, -3, -2); columns all increase (-4, -3)
        assert_eq!(f.monotonicity, -15);
        // row diffs: 2+4+8, 32+64+128, 512+1024; col diffs: 30+60+120+240, 480+960+1920
        assert_eq!(f.smoothness, -(14 + 224 + 1536 + 450 + 3360));
        // 2,4,8,16 each touch the other small tiles in row 0 only
        assert_eq!(f.cluster_penalty, 6);
    }

    #[test]
    fn weighted_sum_matches_manual() {
        let b = board(&[[4, 2, 0, 0], [2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
        let f = evaluate_features(&b);
        assert_eq!(f, Features { max_tile: 4, empty_cells: 13, monotonicity: 2, smoothness: -4, cluster_penalty: 6 });
        let w = HeuristicWeights::default();
        let expected = 4.0 + 2.0 * 13.0 + 2.0 + 1.5 * -4.0 - 0.5 * 6.0;
        assert_eq!(evaluate_position(&b, &w), expected);
    }

    #[test]
    fn large_tiles_do_not_cluster() {
        let b = board(&[[32, 64, 32, 64], [64, 32, 64, 32], [0; 4], [0; 4]]);
        assert_eq!(evaluate_features(&b).cluster_penalty, 0);
    }

    #[test]
    fn empty_board_only_counts_space() {
        let b = Board::empty(3, 3);
        let f = evaluate_features(&b);
        assert_eq!(f, Features { empty_cells: 9, ..Default::default() });
        assert_eq!(evaluate_features(&Board::empty(0, 0)), Features::default());
    }

    #[test]
    fn huge_tiles_score_without_overflow() {
        let b = Board::from_rows(&[[1 << 62, 1 << 62], [2, 8]]).unwrap();
        let chain = crate::engine::find_all_chains(&b).remove(0);
        let merged = b.merge_chain(&chain).unwrap().board;
        assert_eq!(merged.get(0, 0), Some(1 << 63));
        let f = evaluate_features(&merged);
        // |2^63 - 2| down the first column, |2 - 8| along the bottom row
        assert_eq!(f.smoothness, -(1i128 << 63) - 4);
        assert!(evaluate_position(&merged, &HeuristicWeights::default()).is_finite());

        let extremes = Board::from_cells(1, 3, vec![u64::MAX, 1, u64::MAX]).unwrap();
        assert_eq!(evaluate_features(&extremes).smoothness, -2 * i128::from(u64::MAX - 1));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let b = board(&[[2, 8, 2, 4], [16, 2, 64, 4], [8, 8, 2, 0], [1024, 2, 4, 32]]);
        let w = HeuristicWeights::default();
        assert_eq!(evaluate_position(&b, &w).to_bits(), evaluate_position(&b, &w).to_bits());
    }

    #[test]
    fn weights_round_trip_through_map() {
        let w = HeuristicWeights { max_tile: 0.5, empty_cells: 3.0, monotonicity: -1.0, smoothness: 0.25, cluster_penalty: 2.0 };
        assert_eq!(HeuristicWeights::from_btree(&w.to_map()), Ok(w));
        let mut partial = w.to_map();
        partial.remove("cluster_penalty");
        partial.insert("unused".into(), 9.0);
        assert_eq!(HeuristicWeights::from_btree(&partial), Err(EngineError::MissingWeight("cluster_penalty")));
    }

    #[test]
    fn bad_weight_json() {
        assert!(matches!(HeuristicWeights::from_json_str("[1, 2]"), Err(EngineError::InvalidWeights(_))));
        assert!(matches!(
            HeuristicWeights::from_json_str(r#"{"max_tile": "big"}"#),
            Err(EngineError::InvalidWeights(_))
        ));
    }
}
