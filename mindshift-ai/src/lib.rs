//! MindShift AI opponent.
//!
//! [`Engine`] wraps the minimax [`Searcher`] and plugs into a
//! [`Session`](mindshift_core::Session) as its [`Opponent`].

pub mod ordering;
pub mod perft;
pub mod search;
pub mod stats;

use mindshift_core::session::Opponent;
use mindshift_core::state::{Difficulty, GameState, Phase};
use mindshift_core::{Board, Player, Pos};
use tracing::{debug, trace};

pub use crate::search::{BestMove, SearchLimits, Searcher};
pub use crate::stats::SearchStats;

/// Default cap on nodes per move. Keeps expert searches well under the
/// think delay.
pub const DEFAULT_NODE_BUDGET: u64 = 200_000;

/// Search depth in plies for a difficulty.
pub fn depth_for(difficulty: Difficulty) -> u8 {
    match difficulty {
        Difficulty::Easy => 2,
        Difficulty::Medium => 3,
        Difficulty::Hard => 4,
        Difficulty::Expert => 5,
    }
}

/// Minimax opponent playing one side.
#[derive(Debug)]
pub struct Engine {
    player: Player,
    node_budget: Option<u64>,
    searcher: Searcher,
    totals: SearchStats,
}

impl Engine {
    /// An engine for `player` with the default node budget.
    pub fn new(player: Player) -> Self {
        Self {
            player,
            node_budget: Some(DEFAULT_NODE_BUDGET),
            searcher: Searcher::new(),
            totals: SearchStats::default(),
        }
    }

    /// Replace the node budget; `None` searches to full depth.
    pub fn with_node_budget(mut self, node_budget: Option<u64>) -> Self {
        self.node_budget = node_budget;
        self
    }

    pub fn player(&self) -> Player {
        self.player
    }

    /// Best move for this engine's player at the difficulty's depth.
    pub fn best_move(&mut self, board: &Board, difficulty: Difficulty) -> Option<BestMove> {
        let limits = SearchLimits::depth(depth_for(difficulty)).with_budget(self.node_budget);
        let best = self.searcher.search(board, self.player, limits);
        self.totals.absorb(&self.searcher.stats);
        best
    }

    /// Statistics of the most recent search.
    pub fn last_stats(&self) -> &SearchStats {
        &self.searcher.stats
    }

    /// Statistics summed over every search this engine ran.
    pub fn totals(&self) -> &SearchStats {
        &self.totals
    }
}

impl Opponent for Engine {
    fn choose_move(&mut self, state: &GameState) -> Option<(Pos, Pos)> {
        if state.phase != Phase::Playing || state.current_player != self.player {
            trace!(player = %self.player, "not this engine's turn");
            return None;
        }
        let best = self.best_move(&state.board, state.difficulty)?;
        debug!(
            player = %self.player,
            from = %best.from,
            to = %best.to,
            score = best.score,
            depth = self.searcher.stats.completed_depth,
            "engine move"
        );
        Some((best.from, best.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindshift_core::session::{Pacing, Session};
    use mindshift_core::state::{Action, GameMode};

    #[test]
    fn test_depth_for_difficulty() {
        assert_eq!(depth_for(Difficulty::Easy), 2);
        assert_eq!(depth_for(Difficulty::Medium), 3);
        assert_eq!(depth_for(Difficulty::Hard), 4);
        assert_eq!(depth_for(Difficulty::Expert), 5);
    }

    #[test]
    fn test_engine_waits_for_its_turn() {
        let mut engine = Engine::new(Player::Two);
        let state = GameState::start(None, GameMode::Ai, Difficulty::Easy);
        assert_eq!(engine.choose_move(&state), None);
    }

    #[test]
    fn test_engine_plays_through_session() {
        let engine = Engine::new(Player::Two).with_node_budget(Some(5_000));
        let mut session = Session::new(21, Pacing::default()).with_opponent(Box::new(engine));
        session.dispatch(Action::InitGame {
            board: None,
            mode: GameMode::Ai,
            difficulty: Difficulty::Easy,
        });
        session.dispatch(Action::SelectTile(Pos::from_row_col(5, 1)));
        session.dispatch(Action::MoveTile(Pos::from_row_col(3, 2)));

        // presentation 1000 + switch 800 + think 1000 + commit 500
        session.advance(3_300);
        let state = session.state();
        assert_eq!(state.move_history.len(), 2);
        assert_eq!(state.move_history[1].player, Player::Two);
    }

    #[test]
    fn test_totals_accumulate() {
        let mut engine = Engine::new(Player::Two).with_node_budget(None);
        let board = Board::standard();
        engine.best_move(&board, Difficulty::Easy);
        engine.best_move(&board, Difficulty::Easy);
        assert_eq!(engine.totals().searches, 2);
        assert_eq!(engine.totals().nodes, 2 * engine.last_stats().nodes);
    }
}
