//! Move-generation node counts.
//!
//! Counts the leaf positions reachable in exactly `depth` plies with the
//! players strictly alternating. Timers, mutations and scoring are ignored,
//! so the numbers only exercise the move generator.

use mindshift_core::{Board, Player, Pos};

/// Leaf count `depth` plies below `board` with `player` to move.
pub fn perft(board: &Board, player: Player, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = board.all_moves(player);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .into_iter()
        .map(|(from, to)| {
            let mut child = *board;
            child.relocate(from, to);
            perft(&child, player.opponent(), depth - 1)
        })
        .sum()
}

/// Perft split by root move, in generation order.
pub fn divide(board: &Board, player: Player, depth: u8) -> Vec<((Pos, Pos), u64)> {
    board
        .all_moves(player)
        .into_iter()
        .map(|(from, to)| {
            let mut child = *board;
            child.relocate(from, to);
            let count = perft(&child, player.opponent(), depth.saturating_sub(1));
            ((from, to), count)
        })
        .collect()
}
