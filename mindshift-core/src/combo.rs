//! Combo detection around the tile that just moved.
//!
//! A combo is a group of same-kind tiles of one owner that includes the moved
//! tile. Three families are checked independently and all that match are
//! reported:
//!
//! ```text
//!   line  3+ in a row through the moved tile, on any of the 4 axes
//!   L     moved tile + 2 along its row + 1 above or below it   (4 tiles)
//!   T     moved tile + 2 above or below + 1 on each side       (5 tiles)
//! ```
//!
//! For L and T only the first matching template is reported.

use serde::{Deserialize, Serialize};

use crate::{Board, Player, Pos};

/// Combo family.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum ComboKind {
    #[serde(rename = "line")]
    Line,
    L,
    T,
}

/// A detected combo. `tiles` starts with the moved tile.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Combo {
    pub tiles: Vec<Pos>,
    #[serde(rename = "type")]
    pub kind: ComboKind,
    pub score: u32,
    pub player: Player,
}

const MIN_LINE: usize = 3;
const LINE_MULTIPLIER: u32 = 2;
const MIN_L: usize = 4;
const L_MULTIPLIER: u32 = 3;
const MIN_T: usize = 5;
const T_MULTIPLIER: u32 = 4;

/// Axes walked in both directions: horizontal, vertical, both diagonals.
const LINE_AXES: [(i8, i8); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Offsets from the moved tile, in the order they are tried.
const L_TEMPLATES: [[(i8, i8); 3]; 4] = [
    [(0, 1), (0, 2), (1, 0)],
    [(0, -1), (0, -2), (1, 0)],
    [(0, 1), (0, 2), (-1, 0)],
    [(0, -1), (0, -2), (-1, 0)],
];

const T_TEMPLATES: [[(i8, i8); 4]; 2] = [
    [(-1, 0), (-2, 0), (0, -1), (0, 1)],
    [(1, 0), (2, 0), (0, -1), (0, 1)],
];

/// Find every combo that includes the tile on `at`.
///
/// Returns nothing when `at` is empty or holds a tile not owned by `player`.
pub fn detect_combos(board: &Board, at: Pos, player: Player) -> Vec<Combo> {
    let Some(moved) = board.get(at) else {
        return Vec::new();
    };
    if moved.owner != player {
        return Vec::new();
    }
    let kind = moved.kind;
    let matches = |pos: Pos| {
        board
            .get(pos)
            .is_some_and(|tile| tile.owner == player && tile.kind == kind)
    };

    let mut combos = Vec::new();

    for (dr, dc) in LINE_AXES {
        let mut tiles = vec![at];
        for (sr, sc) in [(dr, dc), (-dr, -dc)] {
            let mut cursor = at;
            while let Some(next) = cursor.offset(sr, sc).filter(|&p| matches(p)) {
                tiles.push(next);
                cursor = next;
            }
        }
        if tiles.len() >= MIN_LINE {
            let score = tiles.len() as u32 * LINE_MULTIPLIER;
            combos.push(Combo {
                tiles,
                kind: ComboKind::Line,
                score,
                player,
            });
        }
    }

    let l_shape = L_TEMPLATES
        .iter()
        .find_map(|offsets| match_template(at, offsets, &matches))
        .filter(|tiles| tiles.len() >= MIN_L);
    if let Some(tiles) = l_shape {
        combos.push(Combo {
            score: tiles.len() as u32 * L_MULTIPLIER,
            tiles,
            kind: ComboKind::L,
            player,
        });
    }

    let t_shape = T_TEMPLATES
        .iter()
        .find_map(|offsets| match_template(at, offsets, &matches))
        .filter(|tiles| tiles.len() >= MIN_T);
    if let Some(tiles) = t_shape {
        combos.push(Combo {
            score: tiles.len() as u32 * T_MULTIPLIER,
            tiles,
            kind: ComboKind::T,
            player,
        });
    }

    combos
}

/// All template cells must be on the board and hold a matching tile.
fn match_template(at: Pos, offsets: &[(i8, i8)], matches: &impl Fn(Pos) -> bool) -> Option<Vec<Pos>> {
    let mut tiles = Vec::with_capacity(offsets.len() + 1);
    tiles.push(at);
    for &(dr, dc) in offsets {
        let pos = at.offset(dr, dc).filter(|&p| matches(p))?;
        tiles.push(pos);
    }
    Some(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    fn board(text: &str) -> Board {
        text.parse().unwrap()
    }

    #[test]
    fn test_no_combo_for_lone_tile() {
        let b = board("......\n......\n..R...\n......\n......\n......");
        assert!(detect_combos(&b, pos(2, 2), Player::One).is_empty());
    }

    #[test]
    fn test_wrong_owner_or_empty_cell() {
        let b = board("......\n......\nRRR...\n......\n......\n......");
        assert!(detect_combos(&b, pos(2, 0), Player::Two).is_empty());
        assert!(detect_combos(&b, pos(3, 0), Player::One).is_empty());
    }

    #[test]
    fn test_horizontal_line_of_three() {
        let b = board("......\n......\nRRR...\n......\n......\n......");
        let combos = detect_combos(&b, pos(2, 0), Player::One);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].kind, ComboKind::Line);
        assert_eq!(combos[0].score, 6);
        assert_eq!(combos[0].tiles, vec![pos(2, 0), pos(2, 1), pos(2, 2)]);
    }

    #[test]
    fn test_line_walks_both_directions() {
        let b = board("......\n......\n......\nBBBB..\n......\n......");
        let combos = detect_combos(&b, pos(3, 1), Player::One);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].score, 8);
        assert_eq!(combos[0].tiles[0], pos(3, 1));
        assert_eq!(combos[0].tiles.len(), 4);
    }

    #[test]
    fn test_diagonal_line() {
        let b = board("n.....\n.n....\n..n...\n......\n......\n......");
        let combos = detect_combos(&b, pos(1, 1), Player::Two);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].player, Player::Two);
        assert_eq!(combos[0].score, 6);
    }

    #[test]
    fn test_mixed_kinds_or_owners_break_a_line() {
        let b = board("......\n......\nRRBR..\n......\n......\n......");
        assert!(detect_combos(&b, pos(2, 0), Player::One).is_empty());
        let b = board("......\n......\nRRrR..\n......\n......\n......");
        assert!(detect_combos(&b, pos(2, 0), Player::One).is_empty());
    }

    #[test]
    fn test_l_shape() {
        // Moved tile at (2,1), two to the right, one below it.
        let b = board("......\n......\n.PPP..\n.P....\n......\n......");
        let combos = detect_combos(&b, pos(2, 1), Player::One);
        let l = combos.iter().find(|c| c.kind == ComboKind::L).unwrap();
        assert_eq!(l.score, 12);
        assert_eq!(l.tiles, vec![pos(2, 1), pos(2, 2), pos(2, 3), pos(3, 1)]);
        // The row of three is also a line.
        assert!(combos.iter().any(|c| c.kind == ComboKind::Line && c.score == 6));
    }

    #[test]
    fn test_only_first_l_template_reported() {
        // Right-down and right-up templates both match from (2,2).
        let b = board("......\n..Q...\n..QQQ.\n..Q...\n......\n......");
        let combos = detect_combos(&b, pos(2, 2), Player::One);
        let ls: Vec<_> = combos.iter().filter(|c| c.kind == ComboKind::L).collect();
        assert_eq!(ls.len(), 1);
        assert_eq!(ls[0].tiles[3], pos(3, 2));
    }

    #[test]
    fn test_t_shape_with_lines() {
        // Stem of two above the moved tile, crossbar on either side.
        let b = board("......\n..T...\n..T...\n.TTT..\n......\n......");
        let combos = detect_combos(&b, pos(3, 2), Player::One);
        let kinds: Vec<ComboKind> = combos.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ComboKind::Line, ComboKind::Line, ComboKind::T]);
        let t = &combos[2];
        assert_eq!(t.score, 20);
        assert_eq!(t.tiles.len(), 5);
        let total: u32 = combos.iter().map(|c| c.score).sum();
        assert_eq!(total, 32);
    }

    #[test]
    fn test_templates_off_board_do_not_match() {
        let b = board("PP....\nP.....\n......\n......\n......\n......");
        assert!(detect_combos(&b, pos(0, 0), Player::One).is_empty());
    }

    #[test]
    fn test_combo_json_shape() {
        let b = board("......\n......\nRRR...\n......\n......\n......");
        let combos = detect_combos(&b, pos(2, 0), Player::One);
        let json = serde_json::to_value(&combos[0]).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["player"], "player1");
        assert_eq!(json["tiles"][1]["col"], 1);
    }
}
