//! Scoring, zone control and win conditions.

use crate::combo::Combo;
use crate::{Board, PerPlayer, Player, Tile};

/// Score at which a player wins.
pub const WIN_SCORE: u32 = 50;
/// Tile count at which a player wins (25 of 36 cells).
pub const WIN_ZONE: u32 = 25;
/// Points for a move onto an empty cell.
pub const EMPTY_MOVE_POINTS: u32 = 1;
/// A streak longer than this earns a bonus.
pub const STREAK_THRESHOLD: u32 = 2;
const STREAK_DIVISOR: u32 = 3;
/// Evaluation bonus peaks at this value minus the centre distance.
const CENTER_BONUS_REACH: i32 = 2;

/// Points for a move: the captured tile's value (or 1 for an empty
/// destination) plus every combo it produced.
pub fn move_points(captured: Option<&Tile>, combos: &[Combo]) -> u32 {
    let base = captured.map_or(EMPTY_MOVE_POINTS, |tile| tile.kind.value());
    base + combos.iter().map(|combo| combo.score).sum::<u32>()
}

/// Streak after a move: extended by a move with combos, reset otherwise.
#[inline]
pub fn next_streak(streak: u32, combos: &[Combo]) -> u32 {
    if combos.is_empty() {
        0
    } else {
        streak + 1
    }
}

/// Bonus earned by a move that brings the streak to `streak`.
#[inline]
pub fn streak_bonus(streak: u32) -> u32 {
    if streak > STREAK_THRESHOLD {
        streak / STREAK_DIVISOR
    } else {
        0
    }
}

/// Live tile count per player.
pub fn zone_control(board: &Board) -> PerPlayer<u32> {
    let mut zone = PerPlayer::default();
    for (_, tile) in board.tiles() {
        zone[tile.owner] += 1;
    }
    zone
}

/// Check the four win conditions in order. A later satisfied condition
/// replaces an earlier one, so a zone win beats a simultaneous score win.
pub fn check_winner(score: &PerPlayer<u32>, zone: &PerPlayer<u32>) -> Option<Player> {
    let conditions = [
        (score.player1 >= WIN_SCORE, Player::One),
        (score.player2 >= WIN_SCORE, Player::Two),
        (zone.player1 >= WIN_ZONE, Player::One),
        (zone.player2 >= WIN_ZONE, Player::Two),
    ];
    let mut winner = None;
    for (met, player) in conditions {
        if met {
            winner = Some(player);
        }
    }
    winner
}

/// Static material and centre evaluation from `player`'s point of view.
///
/// Every tile counts its value plus a bonus of 1 on the four centre cells,
/// positive for `player`'s tiles and negative for the opponent's.
pub fn evaluate_position(board: &Board, player: Player) -> i32 {
    board
        .tiles()
        .map(|(pos, tile)| {
            let center_bonus = (CENTER_BONUS_REACH - pos.center_distance()).max(0);
            let worth = tile.kind.value() as i32 + center_bonus;
            if tile.owner == player {
                worth
            } else {
                -worth
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combo::detect_combos;
    use crate::{Pos, TileKind};

    fn pos(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    #[test]
    fn test_move_points_empty_and_capture() {
        assert_eq!(move_points(None, &[]), 1);
        let queen = Tile::new(TileKind::Queen, Player::Two, 9);
        assert_eq!(move_points(Some(&queen), &[]), 9);
    }

    #[test]
    fn test_move_points_include_combos() {
        let board: Board = "......\n......\nRRR...\n......\n......\n......".parse().unwrap();
        let combos = detect_combos(&board, pos(2, 0), Player::One);
        assert_eq!(move_points(None, &combos), 7);
    }

    #[test]
    fn test_streak_bonus_threshold() {
        assert_eq!(streak_bonus(0), 0);
        assert_eq!(streak_bonus(2), 0);
        assert_eq!(streak_bonus(3), 1);
        assert_eq!(streak_bonus(5), 1);
        assert_eq!(streak_bonus(6), 2);
    }

    #[test]
    fn test_next_streak() {
        let board: Board = "......\n......\nRRR...\n......\n......\n......".parse().unwrap();
        let combos = detect_combos(&board, pos(2, 0), Player::One);
        assert_eq!(next_streak(2, &combos), 3);
        assert_eq!(next_streak(2, &[]), 0);
    }

    #[test]
    fn test_zone_control_counts_tiles() {
        let zone = zone_control(&Board::standard());
        assert_eq!(zone, PerPlayer::new(12, 12));
        assert_eq!(zone_control(&Board::new()), PerPlayer::new(0, 0));
    }

    #[test]
    fn test_winner_by_score() {
        let zone = PerPlayer::new(0, 0);
        assert_eq!(check_winner(&PerPlayer::new(50, 0), &zone), Some(Player::One));
        assert_eq!(check_winner(&PerPlayer::new(10, 51), &zone), Some(Player::Two));
        assert_eq!(check_winner(&PerPlayer::new(49, 49), &zone), None);
    }

    #[test]
    fn test_winner_by_zone() {
        let score = PerPlayer::new(0, 0);
        assert_eq!(check_winner(&score, &PerPlayer::new(25, 3)), Some(Player::One));
        assert_eq!(check_winner(&score, &PerPlayer::new(3, 25)), Some(Player::Two));
    }

    #[test]
    fn test_later_condition_overwrites_earlier() {
        // player1 reaches the score threshold while player2 holds the zone.
        let winner = check_winner(&PerPlayer::new(50, 0), &PerPlayer::new(2, 25));
        assert_eq!(winner, Some(Player::Two));
        // Both scores over the threshold: player2's condition is checked later.
        let winner = check_winner(&PerPlayer::new(60, 55), &PerPlayer::new(0, 0));
        assert_eq!(winner, Some(Player::Two));
    }

    #[test]
    fn test_evaluate_standard_board_is_balanced() {
        let board = Board::standard();
        assert_eq!(evaluate_position(&board, Player::One), 0);
        assert_eq!(evaluate_position(&board, Player::Two), 0);
    }

    #[test]
    fn test_evaluate_material_and_center() {
        let board: Board = "......\n......\n..Q...\n......\n.....p\n......".parse().unwrap();
        // Queen on a centre cell: 9 + 1. Power on the edge: 3.
        assert_eq!(evaluate_position(&board, Player::One), 7);
        assert_eq!(evaluate_position(&board, Player::Two), -7);
    }
}
