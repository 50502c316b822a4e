use log::debug;
use rayon::prelude::*;

use crate::engine::{find_all_chains, Board, Chain, EngineError};

use super::{evaluate_chain, pick_best, ChainEval, SelectionStats, SelectorConfig};

/// Greedy selection with candidates scored on the rayon pool.
///
/// Results are put back in input order before the tie-break, so the chosen
/// chain is always the one [`Greedy`](super::Greedy) would choose.
#[derive(Debug, Clone, Default)]
pub struct GreedyParallel {
    cfg: SelectorConfig,
    stats: SelectionStats,
}

impl GreedyParallel {
    pub fn new() -> Self { Self::with_config(SelectorConfig::default()) }

    pub fn with_config(cfg: SelectorConfig) -> Self { Self { cfg, stats: SelectionStats::default() } }

    #[inline]
    pub fn config(&self) -> &SelectorConfig { &self.cfg }

    /// Find every chain on `board` and return the best one, if any.
    #[inline]
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

    pub fn select_index(&mut self, board: &Board, chains: &[Chain]) -> Result<Option<usize>, EngineError> {
        let evals = self.chain_evals(board, chains)?;
        let best = pick_best(&evals);
        if let Some(i) = best {
            debug!("selected chain {} of {} (len {}, total {:.3})", i, chains.len(), chains[i].len(), evals[i].total);
        }
        Ok(best)
    }

    /// Score every candidate in parallel; the output is in input order.
    pub fn chain_evals(&mut self, board: &Board, chains: &[Chain]) -> Result<Vec<ChainEval>, EngineError> {
        let cfg = &self.cfg;
        let mut evals: Vec<ChainEval> = if chains.len() >= cfg.par_min_chains {
            chains
                .par_iter()
                .enumerate()
                .map(|(i, chain)| evaluate_chain(board, i, chain, cfg))
                .collect::<Result<_, _>>()?
        } else {
            chains
                .iter()
                .enumerate()
                .map(|(i, chain)| evaluate_chain(board, i, chain, cfg))
                .collect::<Result<_, _>>()?
        };
        // Tie-break depends on canonical order
        evals.sort_unstable_by_key(|e| e.index);
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
