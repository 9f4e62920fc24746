//! MindShift Self-Play
//!
//! Plays engine-vs-engine games through a full session, timers included, on
//! logical time. Player 2 is the session's own AI opponent; player 1 is a
//! second engine driven from this loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mindshift_ai::{Engine, SearchStats};
use mindshift_core::{Action, Difficulty, GameMode, Pacing, Phase, Player, Session};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "selfplay", about = "Engine-vs-engine MindShift games")]
struct Args {
    /// Number of games to play
    #[arg(short, long, default_value_t = 10)]
    games: u32,

    /// Seed of the first game; game `i` uses `seed + i`
    #[arg(long, env = "MINDSHIFT_SEED", default_value_t = 1)]
    seed: u64,

    /// Difficulty of player 1
    #[arg(long, default_value_t = Difficulty::Medium)]
    player1: Difficulty,

    /// Difficulty of player 2
    #[arg(long, default_value_t = Difficulty::Medium)]
    player2: Difficulty,

    /// Node budget per move; 0 searches every move to full depth
    #[arg(long, default_value_t = mindshift_ai::DEFAULT_NODE_BUDGET)]
    node_budget: u64,

    /// Stop a game after this many moves
    #[arg(long, default_value_t = 200)]
    max_plies: usize,
}

/// How one game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Won(Player),
    Unfinished,
}

struct GameRecord {
    outcome: Outcome,
    plies: usize,
    score: (u32, u32),
    clock_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let node_budget = (args.node_budget > 0).then_some(args.node_budget);

    println!("MindShift Self-Play");
    println!("===================");
    println!("Games: {}", args.games);
    println!("Player 1: {}  Player 2: {}", args.player1, args.player2);
    match node_budget {
        Some(budget) => println!("Node budget: {budget}"),
        None => println!("Node budget: unlimited"),
    }
    println!();

    // Stop between games on SIGINT
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\n\nInterrupt received, finishing current game...");
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl-C handler")?;

    let start = Instant::now();
    let mut records = Vec::new();
    let mut totals = SearchStats::default();

    for game in 0..args.games {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let seed = args.seed + u64::from(game);
        let (record, stats) = play_game(&args, seed, node_budget, &running)?;
        totals.absorb(&stats);

        let result = match record.outcome {
            Outcome::Won(player) => format!("{player} wins"),
            Outcome::Unfinished => "unfinished".to_string(),
        };
        println!(
            "Game {:>3} (seed {seed}): {result:<12} {:>3} moves  score {:>2}-{:<2}  {:.1} min on the clock",
            game + 1,
            record.plies,
            record.score.0,
            record.score.1,
            record.clock_ms as f64 / 60_000.0,
        );
        records.push(record);
    }

    let wins = |player| {
        records
            .iter()
            .filter(|r| r.outcome == Outcome::Won(player))
            .count()
    };
    let unfinished = records.iter().filter(|r| r.outcome == Outcome::Unfinished).count();
    let plies: usize = records.iter().map(|r| r.plies).sum();

    println!("\n===================");
    println!("Self-play complete");
    println!("===================");
    println!("Games played: {}", records.len());
    println!("Player 1 wins: {}", wins(Player::One));
    println!("Player 2 wins: {}", wins(Player::Two));
    println!("Unfinished: {unfinished}");
    if !records.is_empty() {
        println!("Average length: {:.1} moves", plies as f64 / records.len() as f64);
    }
    println!("Wall time: {:.2}s", start.elapsed().as_secs_f64());
    println!();
    println!("Player 1 search totals");
    totals.print_summary();

    Ok(())
}

/// Play one game to the end or the ply cap.
fn play_game(
    args: &Args,
    seed: u64,
    node_budget: Option<u64>,
    running: &AtomicBool,
) -> Result<(GameRecord, SearchStats)> {
    let opponent = Engine::new(Player::Two).with_node_budget(node_budget);
    let mut session = Session::new(seed, Pacing::default()).with_opponent(Box::new(opponent));
    let mut player1 = Engine::new(Player::One).with_node_budget(node_budget);

    session.dispatch(Action::InitGame {
        board: None,
        mode: GameMode::Ai,
        difficulty: args.player2,
    });

    loop {
        let state = session.state();
        if state.phase == Phase::Ended
            || state.move_history.len() >= args.max_plies
            || !running.load(Ordering::SeqCst)
        {
            break;
        }

        let player1_to_move =
            state.current_player == Player::One && state.accepts_input() && !session.awaiting_switch();
        if player1_to_move {
            let board = state.board;
            if let Some(best) = player1.best_move(&board, args.player1) {
                debug!(from = %best.from, to = %best.to, score = best.score, "player 1 move");
                session.dispatch(Action::SelectTile(best.from));
                session.dispatch(Action::MoveTile(best.to));
                continue;
            }
        }

        // Nothing to play right now: jump to the next timer.
        let Some(due) = session.next_due() else {
            bail!("game {seed} stalled with no pending timer");
        };
        let wait = due.saturating_sub(session.now());
        session.advance(wait);
    }

    let state = session.state();
    let outcome = match state.winner {
        Some(player) => Outcome::Won(player),
        None => Outcome::Unfinished,
    };
    info!(seed, ?outcome, moves = state.move_history.len(), "game finished");

    let record = GameRecord {
        outcome,
        plies: state.move_history.len(),
        score: (state.score.player1, state.score.player2),
        clock_ms: session.now(),
    };
    Ok((record, player1.totals().clone()))
}
