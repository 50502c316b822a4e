use ai_2248::engine::{Board, Chain, EngineError};
use ai_2248::greedy::{ChainEval, Greedy, GreedyParallel, HeuristicWeights, SelectorConfig};
use ai_2248::history::{self, Run, RunRecorder};
use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(name = "play", about = "Greedy 2248 self-play runner")]
struct Args {
    /// Board rows
    #[arg(long, default_value_t = 8)]
    rows: usize,

    /// Board columns
    #[arg(long, default_value_t = 5)]
    cols: usize,

    /// Refill tiles are 2^1 ..= 2^max_exponent
    #[arg(long, default_value_t = 3)]
    max_exponent: u32,

    /// Seed for board generation and refills (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: u64,

    /// Stop each game after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Start every game from the board in this text file instead of a random one
    #[arg(long)]
    board: Option<PathBuf>,

    /// JSON object with the five heuristic weights
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Share of the merge gain added to the position score
    #[arg(long, default_value_t = ai_2248::greedy::DEFAULT_GAIN_DISCOUNT)]
    gain_discount: f64,

    /// Score candidate chains on the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Write one history trace per game into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Suppress the spinner and per-game lines
    #[arg(long)]
    quiet: bool,
}

enum Policy {
    Seq(Greedy),
    Par(GreedyParallel),
}

impl Policy {
    fn best_move(&mut self, board: &Board) -> Result<Option<(Chain, ChainEval)>, EngineError> {
        match self {
            Policy::Seq(g) => g.best_move(board),
            Policy::Par(g) => g.best_move(board),
        }
    }

    fn engine_str(&self) -> &'static str {
        match self {
            Policy::Seq(_) => "greedy",
            Policy::Par(_) => "greedy-par",
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));
    let args = Args::parse();
    if args.games == 0 {
        bail!("--games must be at least 1");
    }

    let weights = match &args.weights {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading weights from {}", path.display()))?;
            HeuristicWeights::from_json_str(&text)?
        }
        None => HeuristicWeights::default(),
    };
    let start_board = match &args.board {
        Some(path) => Some(load_board(path)?),
        None => None,
    };
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
    }

    let cfg = SelectorConfig { weights, gain_discount: args.gain_discount, ..SelectorConfig::default() };
    let mut policy = if args.parallel { Policy::Par(GreedyParallel::with_config(cfg)) } else { Policy::Seq(Greedy::with_config(cfg)) };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | Games: {pos} | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let (mut total_moves, mut best_score, mut best_tile) = (0u64, 0u64, 0u64);
    for game in 0..args.games {
        let board = match &start_board {
            Some(b) => b.with_random_fill(args.max_exponent, &mut rng),
            None => Board::random(args.rows, args.cols, args.max_exponent, &mut rng),
        };
        let run = play_game(&mut policy, board, args.max_exponent, args.steps, &mut rng)?;
        info!(
            "game {}: {} moves, score {}, highest tile {}",
            game, run.meta.steps, run.meta.final_score, run.meta.highest_tile
        );
        total_moves += u64::from(run.meta.steps);
        best_score = best_score.max(run.meta.final_score);
        best_tile = best_tile.max(run.meta.highest_tile);

        if let Some(dir) = &args.out_dir {
            let path = dir.join(format!("game-{:04}-{}.h2248", game, run.meta.start_unix_s));
            history::write_run_to_path(&path, &run).with_context(|| format!("writing {}", path.display()))?;
        }
        if let Some(pb) = &pb {
            pb.set_position(game + 1);
            pb.set_message(format!("moves: {} | best score: {} | best tile: {}", total_moves, best_score, best_tile));
        }
    }

    if let Some(pb) = pb { pb.finish_and_clear(); }
    if !args.quiet {
        let elapsed = start.elapsed().as_secs_f64().max(1e-6);
        println!(
            "Games: {} | Moves: {} | moves/sec: {:.1} | best score: {} | best tile: {}",
            args.games,
            total_moves,
            (total_moves as f64) / elapsed,
            best_score,
            best_tile
        );
    }
    Ok(())
}

fn play_game<R: Rng>(
    policy: &mut Policy,
    mut board: Board,
    max_exponent: u32,
    steps: Option<u64>,
    rng: &mut R,
) -> anyhow::Result<Run> {
    let mut rec = RunRecorder::new(Some(policy.engine_str().to_string()));
    while let Some((chain, eval)) = policy.best_move(&board)? {
        rec.record(&board, &chain, &eval);
        debug!("move {}: {} (+{})", rec.steps(), chain, eval.gain);
        board = board.merge_chain(&chain)?.board.with_random_fill(max_exponent, rng);
        if let Some(limit) = steps {
            if rec.steps() as u64 >= limit { break; }
        }
    }
    Ok(rec.finish(board)?)
}

fn load_board(path: &Path) -> anyhow::Result<Board> {
    let text = fs::read_to_string(path).with_context(|| format!("reading board from {}", path.display()))?;
    let board: Board = text.parse()?;
    if board.is_degenerate() {
        bail!("board in {} has no cells", path.display());
    }
    Ok(board)
}
