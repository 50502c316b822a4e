use log::debug;

use crate::engine::{find_all_chains, Board, Chain, EngineError};

use super::{evaluate_chain, pick_best, ChainEval, SelectionStats, SelectorConfig};

/// Single-threaded greedy selection.
///
/// Holds its configuration and a running [`SelectionStats`]; the scoring
/// itself is stateless.
#[derive(Debug, Clone, Default)]
pub struct Greedy {
    cfg: SelectorConfig,
    stats: SelectionStats,
}

impl Greedy {
    pub fn new() -> Self { Self::with_config(SelectorConfig::default()) }

    pub fn with_config(cfg: SelectorConfig) -> Self { Self { cfg, stats: SelectionStats::default() } }

    #[inline]
    pub fn config(&self) -> &SelectorConfig { &self.cfg }

    /// Find every chain on `board` and return the best one, if any.
    ///
    /// Example
    /// ```
    /// use ai_2248::engine::Board;
    /// use ai_2248::greedy::Greedy;
    /// let b = Board::from_rows(&[[2, 4], [8, 16]]).unwrap();
    /// assert_eq!(Greedy::new().best_chain(&b).unwrap(), None);
    /// ```
    pub fn best_chain(&mut self, board: &Board) -> Result<Option<Chain>, EngineError> {
        let chains = find_all_chains(board);
        self.select(board, &chains)
    }

    /// Find and score every chain, returning the winner with its evaluation.
    pub fn best_move(&mut self, board: &Board) -> Result<Option<(Chain, ChainEval)>, EngineError> {
        let chains = find_all_chains(board);
        let evals = self.chain_evals(board, &chains)?;
        Ok(pick_best(&evals).map(|i| (chains[i].clone(), evals[i])))
    }

    /// Choose among `chains`, which must all be valid on `board`.
    pub fn select(&mut self, board: &Board, chains: &[Chain]) -> Result<Option<Chain>, EngineError> {
        Ok(self.select_index(board, chains)?.map(|i| chains[i].clone()))
    }

    /// Like [`Self::select`] but returns the winner's position in `chains`.
    pub fn select_index(&mut self, board: &Board, chains: &[Chain]) -> Result<Option<usize>, EngineError> {
        let evals = self.chain_evals(board, chains)?;
        let best = pick_best(&evals);
        if let Some(i) = best {
            debug!("selected chain {} of {} (len {}, total {:.3})", i, chains.len(), chains[i].len(), evals[i].total);
        }
        Ok(best)
    }

    /// Score every candidate, in input order.
    ///
    /// ```
    /// use ai_2248::engine::{find_all_chains, Board};
    /// use ai_2248::greedy::Greedy;
    /// let b = Board::from_rows(&[[2, 2, 0], [0, 8, 8]]).unwrap();
    /// let chains = find_all_chains(&b);
    /// let evals = Greedy::new().chain_evals(&b, &chains).unwrap();
    /// assert_eq!(evals.len(), 2);
    /// assert_eq!((evals[0].gain, evals[1].gain), (4, 16));
    /// ```
    pub fn chain_evals(&mut self, board: &Board, chains: &[Chain]) -> Result<Vec<ChainEval>, EngineError> {
        let evals = chains
            .iter()
            .enumerate()
            .map(|(i, chain)| evaluate_chain(board, i, chain, &self.cfg))
            .collect::<Result<Vec<_>, _>>()?;
        self.stats.record(evals.len());
        Ok(evals)
    }

    /// Statistics collected from the selection calls so far.
    #[inline]
    pub fn last_stats(&self) -> SelectionStats { self.stats }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SelectionStats::default(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy::HeuristicWeights;

    fn sample() -> Board {
        Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap()
    }

    #[test]
    fn picks_one_of_the_candidates() {
        let b = sample();
        let chains = vec![Chain::from(vec![(0, 0), (0, 1)]), Chain::from(vec![(3, 0), (3, 1), (3, 2), (3, 3)])];
        let best = Greedy::new().select(&b, &chains).unwrap().unwrap();
        assert!(chains.contains(&best));
    }

    #[test]
    fn highest_total_wins() {
        let b = sample();
        let chains = find_all_chains(&b);
        let mut greedy = Greedy::new();
        let evals = greedy.chain_evals(&b, &chains).unwrap();
        let max = evals.iter().map(|e| e.total).fold(f64::NEG_INFINITY, f64::max);
        let i = greedy.select_index(&b, &chains).unwrap().unwrap();
        assert_eq!(evals[i].total, max);
        assert!(evals[..i].iter().all(|e| e.total < max));
    }

    #[test]
    fn ties_go_to_first_chain() {
        // mirror-image pairs score identically after merging
        let b = Board::from_rows(&[[2, 2, 0, 0, 2, 2]]).unwrap();
        let chains = find_all_chains(&b);
        assert_eq!(chains.len(), 2);
        let mut greedy = Greedy::new();
        let evals = greedy.chain_evals(&b, &chains).unwrap();
        assert_eq!(evals[0].total, evals[1].total);
        assert_eq!(greedy.select_index(&b, &chains).unwrap(), Some(0));
        let reversed: Vec<Chain> = chains.iter().rev().cloned().collect();
        assert_eq!(greedy.select(&b, &reversed).unwrap(), Some(chains[1].clone()));
    }

    #[test]
    fn empty_list_is_no_move() {
        let mut greedy = Greedy::new();
        assert_eq!(greedy.select(&sample(), &[]).unwrap(), None);
        assert_eq!(greedy.last_stats().decisions, 0);
    }

    #[test]
    fn invalid_chain_is_an_error() {
        let chains = vec![Chain::from(vec![(0, 0), (0, 2)])];
        assert!(matches!(Greedy::new().select(&sample(), &chains), Err(EngineError::InvalidChain { .. })));
    }

    #[test]
    fn weights_steer_the_choice() {
        let b = Board::from_rows(&[[2, 2, 16], [0, 0, 16], [8, 8, 0]]).unwrap();
        let chains = find_all_chains(&b);
        let gain_only = SelectorConfig {
            weights: HeuristicWeights { max_tile: 0.0, empty_cells: 0.0, monotonicity: 0.0, smoothness: 0.0, cluster_penalty: 0.0 },
            gain_discount: 1.0,
            ..SelectorConfig::default()
        };
        let best = Greedy::with_config(gain_only).best_chain(&b).unwrap().unwrap();
        // both 16s merge for a gain of 32, the most available
        assert_eq!(best, chains.iter().find(|c| b[c[0]] == 16).cloned().unwrap());
    }

    #[test]
    fn stats_accumulate() {
        let b = sample();
        let mut greedy = Greedy::new();
        greedy.best_chain(&b).unwrap();
        greedy.best_chain(&Board::empty(2, 2)).unwrap();
        let s = greedy.last_stats();
        assert_eq!((s.chains, s.peak_chains, s.decisions), (0, 4, 1));
        greedy.reset_stats();
        assert_eq!(greedy.last_stats(), SelectionStats::default());
    }
}
