//! ai-2248: a 2248 chain-merge engine + greedy one-ply policy
//!
//! This crate provides:
//! - An immutable `Board` grid with chain discovery (`find_all_chains`) and
//!   merge simulation (`simulate_merge`, `Board::merge_chain`)
//! - A weighted position heuristic and greedy chain selection (`greedy`
//!   module) with single-threaded and parallel variants
//! - A checksummed binary format for move histories (`history` module)
//!
//! Quick start:
//! ```
//! use ai_2248::engine::{find_all_chains, Board};
//! use ai_2248::greedy::{select_best_chain, HeuristicWeights};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let b0 = Board::random(5, 4, 3, &mut rng);
//! let chains = find_all_chains(&b0);
//! if let Some(best) = select_best_chain(&b0, &chains, &HeuristicWeights::default()).unwrap() {
//!     let b1 = b0.merge_chain(&best).unwrap().board.with_random_fill(3, &mut rng);
//!     assert_eq!(b1.count_empty(), 0);
//! }
//! ```
//!
//! Note: `select_best_chain` is a one-shot convenience. Keep a `greedy::Greedy`
//! (or `GreedyParallel`) around when you want custom discounts or stats.
//!
pub mod engine;
pub mod greedy;
pub mod history;
