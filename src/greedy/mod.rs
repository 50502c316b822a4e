//! Greedy one-ply chain selection for 2248.
//!
//! Every candidate chain is merged on a scratch copy of the board, the result
//! is scored with [`evaluate_position`], and a discounted share of the
//! immediate merge gain is added on top. The chain with the highest total
//! wins; ties go to the earliest chain in input order.
//!
//! Two policies share the same surface:
//! - [`Greedy`]: single-threaded scan.
//! - [`GreedyParallel`]: rayon evaluation of candidates, re-sequenced before
//!   the tie-break so it always agrees with [`Greedy`].
//!
//! Quick start
//! ```
//! use ai_2248::engine::Board;
//! use ai_2248::greedy::{Greedy, GreedyParallel};
//!
//! let b = Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap();
//! let mut seq = Greedy::new();
//! let mut par = GreedyParallel::new();
//! let best = seq.best_chain(&b).unwrap();
//! assert!(best.is_some());
//! assert_eq!(best, par.best_chain(&b).unwrap());
//! ```

use crate::engine::{Board, Chain, EngineError, Tile};

mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::{
    evaluate_features, evaluate_position, Features, HeuristicWeights, FEATURE_NAMES, SMALL_TILE_LIMIT,
};
pub use search_par::GreedyParallel;
pub use search_seq::Greedy;

/// Share of the immediate merge gain added to the position score.
pub const DEFAULT_GAIN_DISCOUNT: f64 = 0.1;

/// Knobs for chain selection.
///
/// - `weights`: feature weights for [`evaluate_position`].
/// - `gain_discount`: multiplier applied to the merge gain before it is added.
/// - `par_min_chains`: the parallel policy scans sequentially below this many candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorConfig {
    pub weights: HeuristicWeights,
    pub gain_discount: f64,
    pub par_min_chains: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { weights: HeuristicWeights::default(), gain_discount: DEFAULT_GAIN_DISCOUNT, par_min_chains: 4 }
    }
}

/// Score breakdown for one candidate chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainEval {
    /// Position of the chain in the candidate list.
    pub index: usize,
    pub position_score: f64,
    pub gain: Tile,
    pub total: f64,
}

/// Counters for the selection calls made by a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Candidates scored by the last call.
    pub chains: u64,
    /// Most candidates seen by a single call.
    pub peak_chains: u64,
    /// Calls that scored at least one candidate.
    pub decisions: u64,
}

impl SelectionStats {
    fn record(&mut self, chains: usize) {
        self.chains = chains as u64;
        self.peak_chains = self.peak_chains.max(self.chains);
        if chains > 0 {
            self.decisions += 1;
        }
    }
}

/// Pick the highest-scoring chain with the reference gain discount.
///
/// Returns `Ok(None)` when `chains` is empty. Chains must come from
/// [`find_all_chains`](crate::engine::find_all_chains) on the same board,
/// otherwise [`EngineError::InvalidChain`] is returned.
///
/// ```
/// use ai_2248::engine::{Board, Chain};
/// use ai_2248::greedy::{select_best_chain, HeuristicWeights};
///
/// let b = Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap();
/// let chains = vec![
///     Chain::from(vec![(0, 0), (0, 1)]),
///     Chain::from(vec![(3, 0), (3, 1), (3, 2), (3, 3)]),
/// ];
/// let best = select_best_chain(&b, &chains, &HeuristicWeights::default()).unwrap().unwrap();
/// assert!(chains.contains(&best));
/// assert!(select_best_chain(&b, &[], &HeuristicWeights::default()).unwrap().is_none());
/// ```
pub fn select_best_chain(
    board: &Board,
    chains: &[Chain],
    weights: &HeuristicWeights,
) -> Result<Option<Chain>, EngineError> {
    Greedy::with_config(SelectorConfig { weights: *weights, ..SelectorConfig::default() }).select(board, chains)
}

/// Merge `chain` on a copy of `board` and score the result.
pub(crate) fn evaluate_chain(
    board: &Board,
    index: usize,
    chain: &Chain,
    cfg: &SelectorConfig,
) -> Result<ChainEval, EngineError> {
    let outcome = board.merge_chain(chain)?;
    let position_score = evaluate_position(&outcome.board, &cfg.weights);
    let total = position_score + outcome.gain as f64 * cfg.gain_discount;
    Ok(ChainEval { index, position_score, gain: outcome.gain, total })
}

/// Index of the first eval with the strictly greatest total, scanning in order.
///
/// NaN totals lose to any other total. A non-empty slice always yields a
/// winner; when every total is NaN it is the first candidate.
pub(crate) fn pick_best(evals: &[ChainEval]) -> Option<usize> {
    let (first, rest) = evals.split_first()?;
    let best = rest.iter().fold(first, |best, e| {
        if (best.total.is_nan() && !e.total.is_nan()) || e.total > best.total { e } else { best }
    });
    Some(best.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(index: usize, total: f64) -> ChainEval { ChainEval { index, position_score: total, gain: 0, total } }

    #[test]
    fn pick_best_keeps_first_on_ties() {
        let evals = [eval(0, 1.0), eval(1, 3.0), eval(2, 3.0), eval(3, 2.0)];
        assert_eq!(pick_best(&evals), Some(1));
        assert_eq!(pick_best(&[]), None);
        assert_eq!(pick_best(&[eval(0, f64::NAN), eval(1, f64::NAN)]), Some(0));
    }

    #[test]
    fn pick_best_skips_nan_totals() {
        assert_eq!(pick_best(&[eval(0, f64::NAN), eval(1, -5.0), eval(2, 1.0)]), Some(2));
        assert_eq!(pick_best(&[eval(0, f64::NAN), eval(1, 1.0), eval(2, f64::NAN)]), Some(1));
        assert_eq!(pick_best(&[eval(0, 1.0), eval(1, f64::NAN), eval(2, 1.0)]), Some(0));
        assert_eq!(pick_best(&[eval(0, f64::NAN), eval(1, 2.0), eval(2, 2.0)]), Some(1));
    }

    #[test]
    fn gain_is_discounted() {
        let b = Board::from_rows(&[[2, 2], [0, 0]]).unwrap();
        let chain = Chain::from(vec![(0, 0), (0, 1)]);
        let cfg = SelectorConfig::default();
        let e = evaluate_chain(&b, 7, &chain, &cfg).unwrap();
        assert_eq!(e.index, 7);
        assert_eq!(e.gain, 4);
        assert!((e.total - e.position_score - 0.4).abs() < 1e-12);

        let no_gain = SelectorConfig { gain_discount: 0.0, ..cfg };
        let e = evaluate_chain(&b, 0, &chain, &no_gain).unwrap();
        assert_eq!(e.total, e.position_score);
    }

    #[test]
    fn stats_track_peak() {
        let mut s = SelectionStats::default();
        s.record(3);
        s.record(0);
        s.record(2);
        assert_eq!(s, SelectionStats { chains: 2, peak_chains: 3, decisions: 2 });
    }
}
