//! MindShift game logic on a fixed 6x6 board.
//!
//! # Board Layout
//!
//! ```text
//!            col 0 1 2 3 4 5
//!   row 0        r n b q b r    player2 back row
//!   row 1        p p t t p p    player2 support row
//!   row 2        . . . . . .
//!   row 3        . . . . . .
//!   row 4        P P T T P P    player1 support row
//!   row 5        R N B Q B R    player1 back row
//! ```
//!
//! Uppercase letters are player1 tiles, lowercase player2:
//! `R`ook, `B`ishop, k`N`ight, `Q`ueen, `T`rap, `P`ower. The same notation is
//! accepted by [`Board::from_str`] and produced by `Display`.
//!
//! # Movement
//!
//! ```text
//!   rook    orthogonal slide          stops on the first occupied cell
//!   bishop  diagonal slide            stops on the first occupied cell
//!   queen   8 directions, 3 steps     stops on the first occupied cell
//!   knight  (1,2)/(2,1) jumps         ignores what lies between
//!   trap    1 step orthogonal
//!   power   1 step in 8 directions
//! ```
//!
//! A destination is legal when it is empty or holds an opponent tile
//! (a capture). There is no check: every legal destination is playable.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod clock;
pub mod combo;
pub mod score;
pub mod session;
pub mod state;

pub use crate::combo::{detect_combos, Combo, ComboKind};
pub use crate::session::{Opponent, Pacing, Session};
pub use crate::state::{Action, Difficulty, GameMode, GameState, Move, Phase};

/// Side length of the square board.
pub const BOARD_SIZE: usize = 6;

/// Errors raised for structurally invalid input: wrong dimensions,
/// coordinates off the board, unknown notation.
///
/// Illegal *moves* are never errors; the state machine ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("position ({row}, {col}) is outside the 6x6 board")]
    OutOfBounds { row: i64, col: i64 },

    #[error("expected 6 rows, found {0}")]
    RowCount(usize),

    #[error("row {row} has {found} cells, expected 6")]
    RowWidth { row: usize, found: usize },

    #[error("unknown tile character {0:?}")]
    UnknownTile(char),
}

/// Error for names that do not match any variant of a small enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}

// ============================================================================
// Players
// ============================================================================

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "player1")]
    One,
    #[serde(rename = "player2")]
    Two,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => f.write_str("player1"),
            Player::Two => f.write_str("player2"),
        }
    }
}

/// A value tracked separately for each player (scores, undo budgets, zones).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct PerPlayer<T> {
    pub player1: T,
    pub player2: T,
}

impl<T> PerPlayer<T> {
    pub fn new(player1: T, player2: T) -> Self {
        Self { player1, player2 }
    }
}

impl<T> Index<Player> for PerPlayer<T> {
    type Output = T;

    fn index(&self, player: Player) -> &T {
        match player {
            Player::One => &self.player1,
            Player::Two => &self.player2,
        }
    }
}

impl<T> IndexMut<Player> for PerPlayer<T> {
    fn index_mut(&mut self, player: Player) -> &mut T {
        match player {
            Player::One => &mut self.player1,
            Player::Two => &mut self.player2,
        }
    }
}

// ============================================================================
// Tiles
// ============================================================================

/// Tile type. Decides how a tile moves and what it is worth when captured.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Rook,
    Bishop,
    Knight,
    Queen,
    Trap,
    Power,
}

const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const ALL_DIRECTIONS: [(i8, i8); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Longest possible slide on the board.
const SLIDE_RANGE: u8 = BOARD_SIZE as u8 - 1;
/// Queens slide like rooks and bishops but at most this many cells.
const QUEEN_RANGE: u8 = 3;

impl TileKind {
    pub const ALL: [TileKind; 6] = [
        TileKind::Rook,
        TileKind::Bishop,
        TileKind::Knight,
        TileKind::Queen,
        TileKind::Trap,
        TileKind::Power,
    ];

    /// Kinds a mutation wave may assign. Traps are never produced.
    pub const MUTATION_POOL: [TileKind; 5] = [
        TileKind::Rook,
        TileKind::Bishop,
        TileKind::Knight,
        TileKind::Queen,
        TileKind::Power,
    ];

    /// Points for capturing a tile of this kind.
    #[inline]
    pub fn value(self) -> u32 {
        match self {
            TileKind::Rook => 5,
            TileKind::Bishop => 5,
            TileKind::Knight => 4,
            TileKind::Queen => 9,
            TileKind::Trap => 2,
            TileKind::Power => 3,
        }
    }

    /// Step directions and the maximum number of steps along each.
    #[inline]
    fn movement(self) -> (&'static [(i8, i8)], u8) {
        match self {
            TileKind::Rook => (&ORTHOGONAL, SLIDE_RANGE),
            TileKind::Bishop => (&DIAGONAL, SLIDE_RANGE),
            TileKind::Knight => (&KNIGHT_JUMPS, 1),
            TileKind::Queen => (&ALL_DIRECTIONS, QUEEN_RANGE),
            TileKind::Trap => (&ORTHOGONAL, 1),
            TileKind::Power => (&ALL_DIRECTIONS, 1),
        }
    }

    /// Notation letter (uppercase).
    pub fn letter(self) -> char {
        match self {
            TileKind::Rook => 'R',
            TileKind::Bishop => 'B',
            TileKind::Knight => 'N',
            TileKind::Queen => 'Q',
            TileKind::Trap => 'T',
            TileKind::Power => 'P',
        }
    }

    /// Parse a notation letter, either case.
    pub fn from_letter(c: char) -> Option<TileKind> {
        match c.to_ascii_uppercase() {
            'R' => Some(TileKind::Rook),
            'B' => Some(TileKind::Bishop),
            'N' => Some(TileKind::Knight),
            'Q' => Some(TileKind::Queen),
            'T' => Some(TileKind::Trap),
            'P' => Some(TileKind::Power),
            _ => None,
        }
    }
}

/// A tile on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub owner: Player,
    pub id: u32,
    pub move_count: u32,
    /// Logical clock time (ms) of the tile's last move, 0 if never moved.
    pub last_moved: u64,
}

impl Tile {
    /// Create a tile that has never moved.
    pub fn new(kind: TileKind, owner: Player, id: u32) -> Tile {
        Tile {
            kind,
            owner,
            id,
            move_count: 0,
            last_moved: 0,
        }
    }

    fn letter(&self) -> char {
        match self.owner {
            Player::One => self.kind.letter(),
            Player::Two => self.kind.letter().to_ascii_lowercase(),
        }
    }
}

// ============================================================================
// Positions
// ============================================================================

/// A cell on the board. Always in bounds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPos")]
pub struct Pos {
    row: u8,
    col: u8,
}

/// Unchecked wire form of a position.
#[derive(Deserialize)]
struct RawPos {
    row: i64,
    col: i64,
}

impl TryFrom<RawPos> for Pos {
    type Error = BoardError;

    fn try_from(raw: RawPos) -> Result<Self, Self::Error> {
        Pos::checked(raw.row, raw.col)
    }
}

impl Pos {
    /// Create a position, rejecting coordinates off the board.
    pub fn new(row: u8, col: u8) -> Result<Pos, BoardError> {
        Pos::checked(row as i64, col as i64)
    }

    /// Create a position from coordinates known to be valid.
    ///
    /// Panics if the coordinates are off the board.
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Pos {
        assert!(
            (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE,
            "position ({row}, {col}) is outside the 6x6 board"
        );
        Pos { row, col }
    }

    fn checked(row: i64, col: i64) -> Result<Pos, BoardError> {
        let size = BOARD_SIZE as i64;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Ok(Pos {
                row: row as u8,
                col: col as u8,
            })
        } else {
            Err(BoardError::OutOfBounds { row, col })
        }
    }

    #[inline]
    pub fn row(self) -> u8 {
        self.row
    }

    #[inline]
    pub fn col(self) -> u8 {
        self.col
    }

    /// The cell `(dr, dc)` away, if it is on the board.
    #[inline]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Pos> {
        let row = self.row as i64 + dr as i64;
        let col = self.col as i64 + dc as i64;
        Pos::checked(row, col).ok()
    }

    /// Manhattan distance to the board centre (2.5, 2.5), which is always
    /// a whole number on an even-sized board.
    #[inline]
    pub fn center_distance(self) -> i32 {
        let twice = (2 * self.row as i32 - 5).abs() + (2 * self.col as i32 - 5).abs();
        twice / 2
    }

    /// Iterate over all 36 positions in row-major order.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Pos { row, col }))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

// ============================================================================
// Board
// ============================================================================

type Rows = Vec<Vec<Option<Tile>>>;

/// The 6x6 grid. A plain value: every game snapshot owns its own board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "Rows", into = "Rows")]
pub struct Board {
    cells: [[Option<Tile>; BOARD_SIZE]; BOARD_SIZE],
}

const PLAYER1_BACK_ROW: u8 = 5;
const PLAYER1_SUPPORT_ROW: u8 = 4;
const PLAYER2_BACK_ROW: u8 = 0;
const PLAYER2_SUPPORT_ROW: u8 = 1;

const BACK_ROW: [TileKind; BOARD_SIZE] = [
    TileKind::Rook,
    TileKind::Knight,
    TileKind::Bishop,
    TileKind::Queen,
    TileKind::Bishop,
    TileKind::Rook,
];
const SUPPORT_ROW: [TileKind; BOARD_SIZE] = [
    TileKind::Power,
    TileKind::Power,
    TileKind::Trap,
    TileKind::Trap,
    TileKind::Power,
    TileKind::Power,
];

impl Board {
    /// Create an empty board.
    pub fn new() -> Board {
        Board {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// The standard starting layout: 12 tiles per side on two rows.
    pub fn standard() -> Board {
        let mut board = Board::new();
        let rows = [
            (PLAYER1_BACK_ROW, Player::One, &BACK_ROW),
            (PLAYER1_SUPPORT_ROW, Player::One, &SUPPORT_ROW),
            (PLAYER2_BACK_ROW, Player::Two, &BACK_ROW),
            (PLAYER2_SUPPORT_ROW, Player::Two, &SUPPORT_ROW),
        ];
        for (row, owner, kinds) in rows {
            for (col, &kind) in kinds.iter().enumerate() {
                let pos = Pos::from_row_col(row, col as u8);
                board.put(pos, Tile::new(kind, owner, board.next_id()));
            }
        }
        board
    }

    /// Get the tile at a position.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&Tile> {
        self.cells[pos.row as usize][pos.col as usize].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut Tile> {
        self.cells[pos.row as usize][pos.col as usize].as_mut()
    }

    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.get(pos).is_none()
    }

    /// Replace the contents of a cell, returning what was there.
    #[inline]
    pub fn set(&mut self, pos: Pos, tile: Option<Tile>) -> Option<Tile> {
        std::mem::replace(&mut self.cells[pos.row as usize][pos.col as usize], tile)
    }

    /// Put a tile on a cell, returning what was there.
    #[inline]
    pub fn put(&mut self, pos: Pos, tile: Tile) -> Option<Tile> {
        self.set(pos, Some(tile))
    }

    /// Remove and return the tile at a position.
    #[inline]
    pub fn take(&mut self, pos: Pos) -> Option<Tile> {
        self.set(pos, None)
    }

    /// Move whatever stands on `from` to `to`, returning the tile it replaced.
    ///
    /// Does not check legality or touch move counters; the search uses this
    /// for hypothetical positions.
    pub fn relocate(&mut self, from: Pos, to: Pos) -> Option<Tile> {
        match self.take(from) {
            Some(tile) => self.put(to, tile),
            None => None,
        }
    }

    /// Iterate over occupied cells in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Pos, &Tile)> + '_ {
        Pos::all().filter_map(move |pos| self.get(pos).map(|tile| (pos, tile)))
    }

    /// Positions of every tile on the board, row-major.
    pub fn occupied(&self) -> Vec<Pos> {
        self.tiles().map(|(pos, _)| pos).collect()
    }

    /// Number of tiles owned by a player.
    pub fn count(&self, player: Player) -> u32 {
        self.tiles().filter(|(_, tile)| tile.owner == player).count() as u32
    }

    /// An id not used by any tile on the board.
    pub fn next_id(&self) -> u32 {
        self.tiles().map(|(_, tile)| tile.id).max().unwrap_or(0) + 1
    }

    // ========== Move Generation ==========

    /// Legal destinations for `tile` standing on `from`.
    ///
    /// Each direction is walked up to the tile's range; the walk stops at the
    /// first occupied cell, which is included only if it holds an opponent.
    pub fn legal_moves(&self, from: Pos, tile: &Tile) -> Vec<Pos> {
        let (directions, range) = tile.kind.movement();
        let mut moves = Vec::with_capacity(16);

        for &(dr, dc) in directions {
            let mut cursor = from;
            for _ in 0..range {
                let Some(next) = cursor.offset(dr, dc) else {
                    break;
                };
                match self.get(next) {
                    None => moves.push(next),
                    Some(other) => {
                        if other.owner != tile.owner {
                            moves.push(next);
                        }
                        break;
                    }
                }
                cursor = next;
            }
        }

        moves
    }

    /// Legal destinations for whatever tile stands on `from`.
    pub fn moves_from(&self, from: Pos) -> Vec<Pos> {
        match self.get(from) {
            Some(tile) => self.legal_moves(from, tile),
            None => Vec::new(),
        }
    }

    /// Every legal `(from, to)` pair for a player, tiles in row-major order.
    pub fn all_moves(&self, player: Player) -> Vec<(Pos, Pos)> {
        let mut moves = Vec::with_capacity(48);
        for (from, tile) in self.tiles().filter(|(_, tile)| tile.owner == player) {
            moves.extend(self.legal_moves(from, tile).into_iter().map(|to| (from, to)));
        }
        moves
    }

    // ========== Conversion ==========

    /// Build a board from nested rows, validating the dimensions.
    pub fn from_rows(rows: Rows) -> Result<Board, BoardError> {
        if rows.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(rows.len()));
        }
        let mut board = Board::new();
        for (row, cells) in rows.into_iter().enumerate() {
            if cells.len() != BOARD_SIZE {
                return Err(BoardError::RowWidth {
                    row,
                    found: cells.len(),
                });
            }
            for (col, tile) in cells.into_iter().enumerate() {
                board.cells[row][col] = tile;
            }
        }
        Ok(board)
    }

    /// Nested rows, top row first.
    pub fn rows(&self) -> Rows {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Rows> for Board {
    type Error = BoardError;

    fn try_from(rows: Rows) -> Result<Self, Self::Error> {
        Board::from_rows(rows)
    }
}

impl From<Board> for Rows {
    fn from(board: Board) -> Self {
        board.rows()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                let c = cell.as_ref().map_or('.', Tile::letter);
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = BoardError;

    /// Parse six lines of six cells. Whitespace inside a line and blank lines
    /// are ignored. Tile ids are assigned in row-major order starting at 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<Vec<char>> = s
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|line| !line.is_empty())
            .collect();
        if lines.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(lines.len()));
        }

        let mut board = Board::new();
        let mut next_id = 1;
        for (row, line) in lines.iter().enumerate() {
            if line.len() != BOARD_SIZE {
                return Err(BoardError::RowWidth {
                    row,
                    found: line.len(),
                });
            }
            for (col, &c) in line.iter().enumerate() {
                if c == '.' {
                    continue;
                }
                let kind = TileKind::from_letter(c).ok_or(BoardError::UnknownTile(c))?;
                let owner = if c.is_ascii_uppercase() {
                    Player::One
                } else {
                    Player::Two
                };
                board.cells[row][col] = Some(Tile::new(kind, owner, next_id));
                next_id += 1;
            }
        }
        Ok(board)
    }
}
