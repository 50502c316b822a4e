//! Binary move-history traces.
//!
//! A trace file is a small fixed frame around a postcard body:
//!
//! ```text
//! "2248" | version u8 | body_len u32 LE | postcard(Run) | crc32c u32 LE
//! ```
//!
//! The checksum covers every byte before it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::engine::{Board, Chain, Tile};
use crate::greedy::ChainEval;

const MAGIC: &[u8; 4] = b"2248";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 4;
const TRAILER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub steps: u32,
    pub start_unix_s: u64,
    pub elapsed_s: f32,
    /// Sum of all merge gains over the run.
    pub final_score: u64,
    pub highest_tile: Tile,
    pub engine_str: Option<String>,
}

/// One decision: the board it was made on and what was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub board: Board,
    pub chain: Chain,
    pub gain: Tile,
    /// Selector total for the chosen chain.
    pub total: f64,
    /// Running score after this move.
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub meta: Meta,
    pub moves: Vec<MoveRecord>, // length = meta.steps
    pub final_board: Board,
}

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("checksum mismatch")]
    Checksum,
    #[error("file too short or malformed")]
    Malformed,
    #[error("{0} moves do not fit in a trace")]
    TooManySteps(usize),
}

/// Collects moves during a game and produces a [`Run`] at the end.
#[derive(Debug)]
pub struct RunRecorder {
    start: Instant,
    start_unix_s: u64,
    engine_str: Option<String>,
    moves: Vec<MoveRecord>,
    score: u64,
}

impl RunRecorder {
    pub fn new(engine_str: Option<String>) -> Self {
        Self { start: Instant::now(), start_unix_s: now_unix_seconds(), engine_str, moves: Vec::with_capacity(256), score: 0 }
    }

    /// Record that `chain` was played on `board` with the given evaluation.
    pub fn record(&mut self, board: &Board, chain: &Chain, eval: &ChainEval) {
        self.score = self.score.saturating_add(eval.gain);
        self.moves.push(MoveRecord {
            board: board.clone(),
            chain: chain.clone(),
            gain: eval.gain,
            total: eval.total,
            score: self.score,
        });
    }

    #[inline]
    pub fn score(&self) -> u64 { self.score }

    #[inline]
    pub fn steps(&self) -> usize { self.moves.len() }

    /// Close the run. Fails when there are more moves than `Meta::steps` can hold.
    pub fn finish(self, final_board: Board) -> Result<Run, HistoryError> {
        let steps = step_count(self.moves.len())?;
        let highest_tile = self
            .moves
            .iter()
            .map(|m| m.board.highest_tile())
            .chain(std::iter::once(final_board.highest_tile()))
            .max()
            .unwrap_or(0);
        let meta = Meta {
            steps,
            start_unix_s: self.start_unix_s,
            elapsed_s: self.start.elapsed().as_secs_f32(),
            final_score: self.score,
            highest_tile,
            engine_str: self.engine_str,
        };
        Ok(Run { meta, moves: self.moves, final_board })
    }
}

#[inline]
fn step_count(moves: usize) -> Result<u32, HistoryError> {
    u32::try_from(moves).map_err(|_| HistoryError::TooManySteps(moves))
}

pub fn encode_run(run: &Run) -> Result<Vec<u8>, HistoryError> {
    let body = postcard::to_allocvec(run)?;
    let body_len = u32::try_from(body.len()).map_err(|_| HistoryError::Malformed)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&body_len.to_le_bytes());
    buf.extend_from_slice(&body);

    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn decode_run(bytes: &[u8]) -> Result<Run, HistoryError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(HistoryError::Malformed);
    }
    // Checksum first so nothing below reads corrupted lengths
    let (content, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let file_crc = read_u32_le(trailer).ok_or(HistoryError::Malformed)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(HistoryError::Checksum);
    }

    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(HistoryError::MagicOrVersion);
    }
    let body_len = read_u32_le(&content[5..]).ok_or(HistoryError::Malformed)? as usize;
    let body = &content[HEADER_LEN..];
    if body.len() != body_len {
        return Err(HistoryError::Malformed);
    }

    let run: Run = postcard::from_bytes(body)?;
    if run.moves.len() != run.meta.steps as usize {
        return Err(HistoryError::Malformed);
    }
    Ok(run)
}

pub fn write_run_to_path<P: AsRef<Path>>(path: P, run: &Run) -> Result<(), HistoryError> {
    let data = encode_run(run)?;
    let mut f = fs::File::create(path)?;
    f.write_all(&data)?;
    Ok(())
}

pub fn read_run_from_path<P: AsRef<Path>>(path: P) -> Result<Run, HistoryError> {
    let data = fs::read(path)?;
    decode_run(&data)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    let b: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy::Greedy;
    use tempfile::NamedTempFile;

    fn sample_run() -> Run {
        let mut board = Board::from_rows(&[[2, 2, 4, 4], [2, 0, 4, 8], [0, 0, 8, 8], [2, 2, 2, 2]]).unwrap();
        let mut greedy = Greedy::new();
        let mut rec = RunRecorder::new(Some("greedy-test".to_string()));
        for _ in 0..3 {
            let Some((chain, eval)) = greedy.best_move(&board).unwrap() else { break };
            rec.record(&board, &chain, &eval);
            board = board.merge_chain(&chain).unwrap().board;
        }
        rec.finish(board).unwrap()
    }

    #[test]
    fn recorder_tracks_score() {
        let run = sample_run();
        assert_eq!(run.meta.steps, 3);
        assert_eq!(run.moves.len(), 3);
        let total: u64 = run.moves.iter().map(|m| m.gain).sum();
        assert_eq!(run.meta.final_score, total);
        assert_eq!(run.moves.last().unwrap().score, total);
        assert!(run.meta.highest_tile >= 8);
    }

    #[test]
    fn step_count_is_checked() {
        assert_eq!(step_count(3).unwrap(), 3);
        assert_eq!(step_count(u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(step_count(u32::MAX as usize + 1), Err(HistoryError::TooManySteps(_))));
    }

    #[test]
    fn round_trip_file() {
        let run = sample_run();
        let tmp = NamedTempFile::new().unwrap();
        write_run_to_path(tmp.path(), &run).unwrap();
        let loaded = read_run_from_path(tmp.path()).unwrap();
        assert_eq!(loaded, run);
    }

    #[test]
    fn checksum_mismatch() {
        let mut bytes = encode_run(&sample_run()).unwrap();
        bytes[HEADER_LEN + 3] ^= 0xFF;
        assert!(matches!(decode_run(&bytes), Err(HistoryError::Checksum)));
    }

    #[test]
    fn bad_magic() {
        let mut bytes = encode_run(&sample_run()).unwrap();
        bytes[0] = b'X';
        let n = bytes.len() - TRAILER_LEN;
        let crc = crc32c::crc32c(&bytes[..n]);
        bytes[n..].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(decode_run(&bytes), Err(HistoryError::MagicOrVersion)));
    }

    #[test]
    fn truncated() {
        let bytes = encode_run(&sample_run()).unwrap();
        assert!(matches!(decode_run(&bytes[..6]), Err(HistoryError::Malformed)));
        // Cut mid-body and re-seal so only the length check can catch it
        let mut cut = bytes[..bytes.len() - TRAILER_LEN - 5].to_vec();
        let crc = crc32c::crc32c(&cut);
        cut.extend_from_slice(&crc.to_le_bytes());
        assert!(matches!(decode_run(&cut), Err(HistoryError::Malformed)));
    }

    #[test]
    fn step_count_must_match_moves() {
        let mut run = sample_run();
        run.meta.steps += 1;
        let bytes = encode_run(&run).unwrap();
        assert!(matches!(decode_run(&bytes), Err(HistoryError::Malformed)));
    }
}
