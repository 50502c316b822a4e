//! Board model and game mechanics for 2248.
//!
//! - [`Board`]: immutable rectangular grid of tile values (0 = empty).
//! - [`find_all_chains`]: every maximal 8-connected group of equal tiles.
//! - [`simulate_merge`]: collapse one chain into a single doubled tile.
//!
//! Quick start
//! ```
//! use ai_2248::engine::{self, Board};
//!
//! let board: Board = "2 2 4\n0 8 4\n16 0 0".parse().unwrap();
//! let chains = engine::find_all_chains(&board);
//! assert_eq!(chains.len(), 2);
//! let (merged, gain) = engine::simulate_merge(&board, &chains[0]).unwrap();
//! assert_eq!(merged.get(0, 0), Some(4));
//! assert_eq!(gain, 4);
//! ```

pub mod board;
pub mod chains;
pub mod merge;

pub use board::{Board, Coord, Tile};
pub use chains::{find_all_chains, Chain, NEIGHBORS};
pub use merge::{simulate_merge, MergeOutcome};

/// Errors raised when caller input violates the engine's contracts.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid board: {reason}")]
    InvalidBoard { reason: String },
    #[error("invalid chain: {reason}")]
    InvalidChain { reason: String },
    #[error("missing heuristic weight '{0}'")]
    MissingWeight(&'static str),
    #[error("invalid heuristic weights: {0}")]
    InvalidWeights(String),
    #[error("merging {len} tiles of value {value} overflows u64")]
    MergeOverflow { value: Tile, len: usize },
}

impl EngineError {
    pub(crate) fn board(reason: impl Into<String>) -> Self {
        EngineError::InvalidBoard { reason: reason.into() }
    }

    pub(crate) fn chain(reason: impl Into<String>) -> Self {
        EngineError::InvalidChain { reason: reason.into() }
    }
}
