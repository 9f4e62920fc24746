//! Game state and the transition function.
//!
//! [`GameState::reduce`] is the only way a game changes. It never fails:
//! actions that break a rule (wrong player, illegal destination, acting while
//! animating or outside play) leave the state as it was.
//!
//! Some actions imply others (selecting a legal destination is a move, a
//! timer reaching zero switches the turn, an AI move is a select followed by
//! a move). These are chained through a queue inside one `reduce` call.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::combo::{detect_combos, Combo};
use crate::score::{check_winner, move_points, next_streak, streak_bonus, zone_control};
use crate::{Board, ParseNameError, PerPlayer, Player, Pos, Tile, TileKind};

/// Seconds on the clock at the start of every turn.
pub const TURN_SECONDS: u32 = 60;
/// Undos each player gets per round.
pub const UNDOS_PER_ROUND: u32 = 2;
/// A mutation wave is prepared at the start of every round divisible by this.
pub const MUTATION_ROUND_INTERVAL: u32 = 3;
/// One tile in this many is picked for a mutation wave (at least one).
const MUTATION_SHARE: usize = 10;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle phase.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Setup,
    Playing,
    Paused,
    Ended,
}

/// Who plays player2.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Ai,
    Local,
}

/// AI strength, mapped to search depth by the engine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseNameError {
                kind: "difficulty",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Ai => f.write_str("ai"),
            GameMode::Local => f.write_str("local"),
        }
    }
}

impl FromStr for GameMode {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ai" => Ok(GameMode::Ai),
            "local" => Ok(GameMode::Local),
            _ => Err(ParseNameError {
                kind: "game mode",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Moves and Actions
// ============================================================================

/// A completed move as kept in the history.
///
/// Besides the public record (`from`, `to`, `capturedTile`, `timestamp`,
/// `player`) it keeps what an undo needs to restore the game exactly.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub from: Pos,
    pub to: Pos,
    pub captured_tile: Option<Tile>,
    pub timestamp: u64,
    pub player: Player,
    /// The moving tile as it stood on `from`.
    pub moved_tile: Tile,
    /// Points credited for the move, streak bonus included.
    pub points: u32,
    pub prior_streak: u32,
}

/// Everything that can happen to a game.
///
/// JSON form: `{"type": "SELECT_TILE", "payload": {"row": 5, "col": 1}}`;
/// actions without data omit `payload`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    InitGame {
        #[serde(default)]
        board: Option<Board>,
        #[serde(default)]
        mode: GameMode,
        #[serde(default)]
        difficulty: Difficulty,
    },
    SelectTile(Pos),
    MoveTile(Pos),
    DeselectTile,
    SwitchTurn,
    UpdateTimer(i64),
    SetAnimation(bool),
    ClearCombos,
    UndoMove,
    MutateTiles(Vec<Pos>),
    EndGame(Player),
    ResetGame,
    AiMove { from: Pos, to: Pos },
    PauseGame,
    ResumeGame,
}

// ============================================================================
// Game State
// ============================================================================

/// Complete snapshot of one game.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: Board,
    pub current_player: Player,
    pub turn_time_left: u32,
    pub score: PerPlayer<u32>,
    pub phase: Phase,
    pub selected_tile: Option<Pos>,
    pub possible_moves: Vec<Pos>,
    pub round_number: u32,
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
    pub winner: Option<Player>,
    pub is_animating: bool,
    pub last_move: Option<Move>,
    pub combos: Vec<Combo>,
    pub move_history: Vec<Move>,
    pub undos_left: PerPlayer<u32>,
    pub mutations: Vec<Pos>,
    pub zone_control: PerPlayer<u32>,
    pub streak_count: u32,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            board: Board::new(),
            current_player: Player::One,
            turn_time_left: TURN_SECONDS,
            score: PerPlayer::default(),
            phase: Phase::Setup,
            selected_tile: None,
            possible_moves: Vec::new(),
            round_number: 1,
            game_mode: GameMode::default(),
            difficulty: Difficulty::default(),
            winner: None,
            is_animating: false,
            last_move: None,
            combos: Vec::new(),
            move_history: Vec::new(),
            undos_left: PerPlayer::new(UNDOS_PER_ROUND, UNDOS_PER_ROUND),
            mutations: Vec::new(),
            zone_control: PerPlayer::default(),
            streak_count: 0,
        }
    }
}

impl GameState {
    /// A game in the setup phase with an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh game in progress, on `board` or the standard layout.
    pub fn start(board: Option<Board>, mode: GameMode, difficulty: Difficulty) -> Self {
        let board = board.unwrap_or_else(Board::standard);
        GameState {
            zone_control: zone_control(&board),
            board,
            phase: Phase::Playing,
            game_mode: mode,
            difficulty,
            ..GameState::default()
        }
    }

    /// True while the current player may select and move tiles.
    #[inline]
    pub fn accepts_input(&self) -> bool {
        self.phase == Phase::Playing && !self.is_animating
    }

    /// Every legal `(from, to)` for the current player, empty outside play.
    pub fn legal_moves(&self) -> Vec<(Pos, Pos)> {
        if self.phase != Phase::Playing {
            return Vec::new();
        }
        self.board.all_moves(self.current_player)
    }

    /// Apply an action and everything it implies, returning the new state.
    ///
    /// `rng` feeds mutation waves; `now` (logical ms) stamps moved tiles and
    /// history records.
    pub fn reduce<R: Rng>(&self, action: Action, rng: &mut R, now: u64) -> GameState {
        let mut next = self.clone();
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            next.step(action, rng, now, &mut queue);
        }
        next
    }

    fn step<R: Rng>(&mut self, action: Action, rng: &mut R, now: u64, queue: &mut VecDeque<Action>) {
        trace!(?action, "step");
        match action {
            Action::InitGame {
                board,
                mode,
                difficulty,
            } => {
                *self = GameState::start(board, mode, difficulty);
                debug!(%mode, %difficulty, "game started");
            }
            Action::SelectTile(pos) => self.select_tile(pos, queue),
            Action::MoveTile(to) => self.move_tile(to, now),
            Action::DeselectTile => self.clear_selection(),
            Action::SwitchTurn => self.switch_turn(rng),
            Action::UpdateTimer(value) => {
                if self.phase != Phase::Playing {
                    return;
                }
                let value = value.clamp(0, u32::MAX as i64) as u32;
                self.turn_time_left = value;
                if value == 0 {
                    debug!(player = %self.current_player, "turn timer expired");
                    queue.push_back(Action::SwitchTurn);
                }
            }
            Action::SetAnimation(on) => self.is_animating = on,
            Action::ClearCombos => self.combos.clear(),
            Action::UndoMove => self.undo_move(),
            Action::MutateTiles(positions) => self.mutate_tiles(&positions, rng),
            Action::EndGame(winner) => {
                self.winner = Some(winner);
                self.phase = Phase::Ended;
            }
            Action::ResetGame => {
                *self = GameState::start(None, self.game_mode, self.difficulty);
            }
            Action::AiMove { from, to } => {
                queue.push_back(Action::SelectTile(from));
                queue.push_back(Action::MoveTile(to));
            }
            Action::PauseGame => {
                if self.phase == Phase::Playing {
                    self.phase = Phase::Paused;
                }
            }
            Action::ResumeGame => {
                if self.phase == Phase::Paused {
                    self.phase = Phase::Playing;
                }
            }
        }
    }

    // ========== Selection ==========

    fn select_tile(&mut self, pos: Pos, queue: &mut VecDeque<Action>) {
        if !self.accepts_input() {
            trace!(%pos, "select ignored");
            return;
        }
        if self.selected_tile.is_some() && self.possible_moves.contains(&pos) {
            queue.push_back(Action::MoveTile(pos));
            return;
        }
        match self.board.get(pos).copied() {
            Some(tile) if tile.owner == self.current_player => {
                self.selected_tile = Some(pos);
                self.possible_moves = self.board.legal_moves(pos, &tile);
            }
            _ => self.clear_selection(),
        }
    }

    fn clear_selection(&mut self) {
        self.selected_tile = None;
        self.possible_moves.clear();
    }

    // ========== Moves ==========

    fn move_tile(&mut self, to: Pos, now: u64) {
        let Some(from) = self.selected_tile else {
            trace!(%to, "move ignored, nothing selected");
            return;
        };
        if !self.accepts_input() || !self.possible_moves.contains(&to) {
            trace!(%from, %to, "move ignored");
            return;
        }
        let Some(moved_tile) = self.board.take(from) else {
            return;
        };

        let player = self.current_player;
        let mut tile = moved_tile;
        tile.move_count += 1;
        tile.last_moved = now;
        let captured_tile = self.board.put(to, tile);

        let combos = detect_combos(&self.board, to, player);
        let prior_streak = self.streak_count;
        self.streak_count = next_streak(prior_streak, &combos);
        let points = move_points(captured_tile.as_ref(), &combos) + streak_bonus(self.streak_count);
        self.score[player] += points;

        let record = Move {
            from,
            to,
            captured_tile,
            timestamp: now,
            player,
            moved_tile,
            points,
            prior_streak,
        };
        self.move_history.push(record);
        self.last_move = Some(record);
        self.combos = combos;
        self.clear_selection();

        self.zone_control = zone_control(&self.board);
        if let Some(winner) = check_winner(&self.score, &self.zone_control) {
            debug!(%winner, "game won");
            self.winner = Some(winner);
            self.phase = Phase::Ended;
        }
        self.is_animating = true;

        debug!(
            %player,
            %from,
            %to,
            points,
            combos = self.combos.len(),
            "move applied"
        );
    }

    fn undo_move(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        let player = self.current_player;
        if self.undos_left[player] == 0 {
            trace!(%player, "undo refused, no budget");
            return;
        }
        let Some(last) = self.move_history.last().copied() else {
            trace!("undo refused, empty history");
            return;
        };
        if last.player != player {
            trace!(%player, "undo refused, last move belongs to the opponent");
            return;
        }

        self.move_history.pop();
        // A mutation wave since the move keeps its kind; only the move's own
        // bookkeeping is rolled back.
        let mut restored = self
            .board
            .get(last.to)
            .copied()
            .filter(|tile| tile.id == last.moved_tile.id)
            .unwrap_or(last.moved_tile);
        restored.move_count = last.moved_tile.move_count;
        restored.last_moved = last.moved_tile.last_moved;
        self.board.set(last.from, Some(restored));
        self.board.set(last.to, last.captured_tile);
        self.score[player] = self.score[player].saturating_sub(last.points);
        self.streak_count = last.prior_streak;
        self.undos_left[player] -= 1;
        self.last_move = self.move_history.last().copied();
        self.combos.clear();
        self.clear_selection();
        self.is_animating = false;
        self.zone_control = zone_control(&self.board);

        debug!(%player, from = %last.from, to = %last.to, undos_left = self.undos_left[player], "move undone");
    }

    // ========== Turns ==========

    fn switch_turn<R: Rng>(&mut self, rng: &mut R) {
        if self.phase != Phase::Playing {
            return;
        }
        let next = self.current_player.opponent();
        self.current_player = next;
        self.turn_time_left = TURN_SECONDS;
        self.clear_selection();
        self.mutations.clear();

        if next == Player::One {
            self.round_number += 1;
            self.undos_left = PerPlayer::new(UNDOS_PER_ROUND, UNDOS_PER_ROUND);
            if self.round_number % MUTATION_ROUND_INTERVAL == 0 {
                self.mutations = mutation_sample(&self.board, rng);
                debug!(round = self.round_number, tiles = self.mutations.len(), "mutation wave prepared");
            }
        }
    }

    fn mutate_tiles<R: Rng>(&mut self, positions: &[Pos], rng: &mut R) {
        if self.phase != Phase::Playing {
            return;
        }
        for &pos in positions {
            if let Some(tile) = self.board.get_mut(pos) {
                let pool = &TileKind::MUTATION_POOL;
                tile.kind = pool[rng.random_range(0..pool.len())];
            }
        }
        self.mutations.clear();
        self.refresh_possible_moves();
        self.zone_control = zone_control(&self.board);
    }

    /// Recompute the destinations of the selected tile after the board changed.
    fn refresh_possible_moves(&mut self) {
        match self.selected_tile.and_then(|pos| self.board.get(pos).map(|tile| (pos, *tile))) {
            Some((pos, tile)) => self.possible_moves = self.board.legal_moves(pos, &tile),
            None => self.clear_selection(),
        }
    }
}

/// Pick `max(1, occupied / 10)` distinct occupied cells.
fn mutation_sample<R: Rng>(board: &Board, rng: &mut R) -> Vec<Pos> {
    let occupied = board.occupied();
    let amount = (occupied.len() / MUTATION_SHARE).max(1).min(occupied.len());
    index::sample(rng, occupied.len(), amount)
        .into_iter()
        .map(|i| occupied[i])
        .collect()
}
