use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use learn_game::board::{Board, Mark, Move, Outcome};
use learn_game::config::{Config, NUM_EPISODES};
use learn_game::error::GameError;
use learn_game::players::{
    result_message, ComputerPlayerRL, FirstLegalPlayer, HumanPlayer, MoveSource, Player,
};
use learn_game::q_table::{QTable, SharedQTable};
use learn_game::{pretrain, Game};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Play tic-tac-toe against a self-taught computer player")]
struct Args {
    /// Self-play episodes before the first game.
    #[arg(long, default_value_t = NUM_EPISODES)]
    episodes: usize,
    /// JSON file with learning_rate, discount_rate and exploration_rate.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Opponent::Rl)]
    opponent: Opponent,
    /// Seed for reproducible training and play.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Opponent {
    /// Learns from self-play, then plays greedily.
    Rl,
    /// Takes the first empty cell.
    Simple,
}

/// Prints `message` and reads one line; `None` once stdin is closed.
fn prompt(message: &str) -> Option<String> {
    print!("{message}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_owned()),
    }
}

/// Parses moves like `B2`: row letter A-C, then column digit 1-3.
fn parse_move(raw: &str) -> Option<Move> {
    let (row, col) = raw.chars().collect_tuple()?;
    let row = match row.to_ascii_uppercase() {
        'A' => 0,
        'B' => 1,
        'C' => 2,
        _ => return None,
    };
    let col = match col {
        '1' => 0,
        '2' => 1,
        '3' => 2,
        _ => return None,
    };
    Some(Move::new(row, col))
}

fn draw(board: &Board) {
    println!("  1   2   3");
    for (label, row) in ['A', 'B', 'C'].iter().zip(board.cells().rows()) {
        let cells = row
            .iter()
            .map(|cell| if cell.is_empty() { ' ' } else { cell.as_char() })
            .join(" | ");
        println!("{label} {cells}");
        if *label != 'C' {
            println!("  --+---+--");
        }
    }
}

struct ConsoleMoves;

impl MoveSource for ConsoleMoves {
    fn next_move(&mut self, mark: Mark, board: &Board, _legal: &[Move]) -> Option<Move> {
        println!("You are {mark}.");
        println!("Current board:");
        draw(board);
        loop {
            let raw = prompt("Choose a move (e.g. B2): ")?;
            match parse_move(&raw) {
                Some(mv) => return Some(mv),
                None => println!("Invalid format."),
            }
        }
    }

    fn illegal_move(&mut self, _mv: Move) {
        println!("Illegal move.");
    }

    fn game_finished(&mut self, mark: Mark, outcome: Outcome) {
        println!("{}", result_message(mark, outcome));
    }
}

fn choose_mark() -> Option<Mark> {
    loop {
        match prompt("Choose your symbol (X/O): ")?.as_str() {
            "X" | "x" => return Some(Mark::Cross),
            "O" | "o" => return Some(Mark::Nought),
            _ => println!("Invalid symbol."),
        }
    }
}

fn opponent(kind: Opponent, q: &SharedQTable, config: Config, rng: &mut StdRng) -> Box<dyn Player> {
    match kind {
        Opponent::Rl => Box::new(ComputerPlayerRL::new(
            q.clone(),
            config,
            StdRng::seed_from_u64(rng.gen()),
        )),
        Opponent::Simple => Box::new(FirstLegalPlayer::default()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Config::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let q = QTable::shared();
    if args.opponent == Opponent::Rl && args.episodes > 0 {
        info!(episodes = args.episodes, ?config, "pretraining computer player");
        let stats = pretrain(&q, &config, args.episodes, &mut rng).context("pretraining failed")?;
        info!(
            x_wins = stats.x_wins,
            o_wins = stats.o_wins,
            draws = stats.draws,
            "ready to play"
        );
    }

    while let Some(human_mark) = choose_mark() {
        let human: Box<dyn Player> = Box::new(HumanPlayer::new("You", ConsoleMoves));
        let computer = opponent(args.opponent, &q, config, &mut rng);
        let (player_x, player_o) = match human_mark {
            Mark::Cross => (human, computer),
            Mark::Nought => (computer, human),
        };
        match Game::new(player_x, player_o).play() {
            Ok(summary) => info!(
                outcome = ?summary.outcome,
                moves = summary.history.len(),
                "game over"
            ),
            Err(GameError::InputClosed { .. }) => {
                warn!("input closed, leaving");
                break;
            }
            Err(err) => return Err(anyhow::Error::from(err).context("game aborted")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letter_digit_moves() {
        assert_eq!(parse_move("A1"), Some(Move::new(0, 0)));
        assert_eq!(parse_move("b3"), Some(Move::new(1, 2)));
        assert_eq!(parse_move("C2"), Some(Move::new(2, 1)));
    }

    #[test]
    fn rejects_malformed_moves() {
        assert_eq!(parse_move(""), None);
        assert_eq!(parse_move("D1"), None);
        assert_eq!(parse_move("A4"), None);
        assert_eq!(parse_move("A12"), None);
        assert_eq!(parse_move("2B"), None);
    }
}
