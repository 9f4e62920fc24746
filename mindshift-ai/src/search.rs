//! Depth-limited minimax with optional alpha-beta pruning.
//!
//! The searching player maximizes; the opponent minimizes. Leaves are scored
//! with the static evaluation from the searching player's point of view, and
//! a side with no legal move scores as a forced loss for that side.
//!
//! Without a node budget the search runs once at the requested depth. With a
//! budget it deepens from 1 and keeps the best move of the deepest iteration
//! that finished inside the budget.

use mindshift_core::score::evaluate_position;
use mindshift_core::{Board, Player, Pos};
use tracing::debug;

use crate::ordering::{ordered_moves, ScoredMove};
use crate::stats::SearchStats;

pub const NEG_INF: i32 = i32::MIN;
pub const POS_INF: i32 = i32::MAX;

/// How far and how hard to search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    /// Plies to look ahead
    pub depth: u8,
    /// Maximum nodes entered per search, across all iterations
    pub node_budget: Option<u64>,
    /// Alpha-beta cutoffs; disable only to verify results
    pub prune: bool,
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth,
            node_budget: None,
            prune: true,
        }
    }

    pub fn with_budget(mut self, node_budget: Option<u64>) -> Self {
        self.node_budget = node_budget;
        self
    }

    pub fn unpruned(mut self) -> Self {
        self.prune = false;
        self
    }
}

/// The chosen move and its minimax value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestMove {
    pub from: Pos,
    pub to: Pos,
    pub score: i32,
}

/// Node budget ran out mid-iteration.
#[derive(Debug)]
struct OutOfBudget;

/// Minimax searcher. Statistics of the last search are kept in `stats`.
#[derive(Debug, Default)]
pub struct Searcher {
    pub stats: SearchStats,
}

impl Searcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the best move for `player` on `board`, or `None` if it has no
    /// legal move.
    pub fn search(&mut self, board: &Board, player: Player, limits: SearchLimits) -> Option<BestMove> {
        self.stats = SearchStats::new();
        let root_moves = ordered_moves(board, player);
        let first = *root_moves.first()?;

        let first_depth = if limits.node_budget.is_some() {
            1
        } else {
            limits.depth
        };

        let mut best = None;
        for depth in first_depth..=limits.depth {
            match self.minimax(board, depth, NEG_INF, POS_INF, true, player, &limits) {
                Ok((score, mov)) => {
                    // Every root move scored -inf: play the best-ordered one.
                    let mov = mov.unwrap_or(first);
                    best = Some(BestMove {
                        from: mov.from,
                        to: mov.to,
                        score,
                    });
                    self.stats.completed_depth = depth;
                }
                Err(OutOfBudget) => {
                    debug!(depth, nodes = self.stats.nodes, "node budget exhausted");
                    break;
                }
            }
        }

        self.stats.finish();
        self.stats.log_summary();

        // Not even depth 1 fit in the budget.
        Some(best.unwrap_or(BestMove {
            from: first.from,
            to: first.to,
            score: first.score,
        }))
    }

    /// Returns the node value and, at nodes with moves, the move achieving it.
    #[allow(clippy::too_many_arguments)]
    fn minimax(
        &mut self,
        board: &Board,
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        player: Player,
        limits: &SearchLimits,
    ) -> Result<(i32, Option<ScoredMove>), OutOfBudget> {
        if limits.node_budget.is_some_and(|budget| self.stats.nodes >= budget) {
            return Err(OutOfBudget);
        }
        self.stats.nodes += 1;

        if depth == 0 {
            self.stats.leaves += 1;
            return Ok((evaluate_position(board, player), None));
        }

        let mover = if maximizing { player } else { player.opponent() };
        let moves = ordered_moves(board, mover);
        if moves.is_empty() {
            self.stats.dead_ends += 1;
            return Ok((if maximizing { NEG_INF } else { POS_INF }, None));
        }

        let mut best_score = if maximizing { NEG_INF } else { POS_INF };
        let mut best_move = None;

        for (i, mov) in moves.iter().enumerate() {
            let mut child = *board;
            child.relocate(mov.from, mov.to);
            let (score, _) = self.minimax(&child, depth - 1, alpha, beta, !maximizing, player, limits)?;

            if maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = Some(*mov);
                }
                alpha = alpha.max(best_score);
            } else {
                if score < best_score {
                    best_score = score;
                    best_move = Some(*mov);
                }
                beta = beta.min(best_score);
            }

            if limits.prune && beta <= alpha {
                self.stats.branches_pruned += (moves.len() - i - 1) as u64;
                break;
            }
        }

        Ok((best_score, best_move))
    }
}
