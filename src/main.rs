use ai_2248::engine::Board;
use ai_2248::greedy::Greedy;

const MAX_EXPONENT: u32 = 3;
const MAX_MOVES: u64 = 200;

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let mut greedy = Greedy::new();
    let mut rng = rand::thread_rng();
    let mut board = Board::random(8, 5, MAX_EXPONENT, &mut rng);
    println!("{}", board);
    let mut move_count = 0;
    let mut score: u64 = 0;
    while move_count < MAX_MOVES {
        let Some(chain) = greedy.best_chain(&board)? else { break };
        move_count += 1;
        let outcome = board.merge_chain(&chain)?;
        score = score.saturating_add(outcome.gain);
        println!("{}  (+{})", chain, outcome.gain);
        board = outcome.board.with_random_fill(MAX_EXPONENT, &mut rng);
        println!("{}", board);
    }
    let stats = greedy.last_stats();
    println!(
        "Moves made: {}, Score: {}, Highest tile: {}, Max chains considered for a move: {}",
        move_count,
        score,
        board.highest_tile(),
        stats.peak_chains
    );
    Ok(())
}
