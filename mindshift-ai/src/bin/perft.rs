//! Count move-generation leaves from a position.
//!
//! Usage: perft [--depth N] [--player player1|player2] [--board FILE] [--divide]
//!
//! The board file uses the text notation: six rows of six cells, `.` for an
//! empty cell, upper case for player 1 and lower case for player 2.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use mindshift_ai::perft::{divide, perft};
use mindshift_core::{Board, Player};

#[derive(Parser, Debug)]
#[command(name = "perft", about = "Move-generation node counts")]
struct Args {
    /// Plies to count
    #[arg(short, long, default_value_t = 3)]
    depth: u8,

    /// Side to move first
    #[arg(short, long, default_value = "player1", value_parser = parse_player)]
    player: Player,

    /// Start from this board instead of the standard opening
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// Print the count below every root move
    #[arg(long)]
    divide: bool,
}

fn parse_player(s: &str) -> Result<Player, String> {
    match s {
        "player1" | "1" => Ok(Player::One),
        "player2" | "2" => Ok(Player::Two),
        _ => Err(format!("expected player1 or player2, got {s:?}")),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let board = match &args.board {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            text.parse::<Board>()
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => Board::standard(),
    };

    println!("{board}");
    println!("{} to move, depth {}", args.player, args.depth);
    println!();

    let start = Instant::now();
    let total = if args.divide {
        let split = divide(&board, args.player, args.depth);
        for ((from, to), count) in &split {
            println!("{from} -> {to}: {count}");
        }
        println!();
        split.iter().map(|(_, count)| count).sum()
    } else {
        perft(&board, args.player, args.depth)
    };
    let elapsed = start.elapsed();

    println!("Nodes: {total}");
    println!("Time: {:.3}s", elapsed.as_secs_f64());
    if elapsed.as_secs_f64() > 0.0 {
        println!("Rate: {:.0} nodes/sec", total as f64 / elapsed.as_secs_f64());
    }
    Ok(())
}
