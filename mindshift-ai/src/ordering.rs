//! Candidate moves with their static ordering score.
//!
//! Every move of the side to play is scored before the search recurses, and
//! moves are tried best-first so alpha-beta can cut early:
//!
//! ```text
//!   score = 10 * captured value
//!         + (5 - centre distance) * 2
//!         + 15 * sum of combo scores the move would make
//!         - 5 * opponent tiles that can already reach the destination
//! ```

use mindshift_core::combo::detect_combos;
use mindshift_core::{Board, Player, Pos};

const CAPTURE_WEIGHT: i32 = 10;
const CENTER_REACH: i32 = 5;
const CENTER_WEIGHT: i32 = 2;
const COMBO_WEIGHT: i32 = 15;
const THREAT_WEIGHT: i32 = 5;

/// A legal move and its ordering score.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScoredMove {
    pub from: Pos,
    pub to: Pos,
    pub score: i32,
}

/// All legal moves for `player`, best ordering score first.
///
/// The sort is stable, so equal scores keep generation order (tiles
/// row-major, then each tile's direction order).
pub fn ordered_moves(board: &Board, player: Player) -> Vec<ScoredMove> {
    let mut moves: Vec<ScoredMove> = board
        .all_moves(player)
        .into_iter()
        .map(|(from, to)| ScoredMove {
            from,
            to,
            score: static_score(board, player, from, to),
        })
        .collect();
    moves.sort_by(|a, b| b.score.cmp(&a.score));
    moves
}

/// Ordering score of one move. Threats are counted on the board before the
/// move is made.
pub fn static_score(board: &Board, player: Player, from: Pos, to: Pos) -> i32 {
    let mut score = 0;

    if let Some(target) = board.get(to).filter(|t| t.owner != player) {
        score += target.kind.value() as i32 * CAPTURE_WEIGHT;
    }

    score += (CENTER_REACH - to.center_distance()) * CENTER_WEIGHT;

    let mut after = *board;
    after.relocate(from, to);
    let combo_points: u32 = detect_combos(&after, to, player).iter().map(|c| c.score).sum();
    score += combo_points as i32 * COMBO_WEIGHT;

    score -= threats_to(board, to, player.opponent()) * THREAT_WEIGHT;

    score
}

/// Number of `attacker` tiles with a legal move onto `target`.
pub fn threats_to(board: &Board, target: Pos, attacker: Player) -> i32 {
    board
        .tiles()
        .filter(|&(pos, tile)| tile.owner == attacker && board.legal_moves(pos, tile).contains(&target))
        .count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    #[test]
    fn test_orders_every_legal_move() {
        let board = Board::standard();
        let moves = ordered_moves(&board, Player::One);
        assert_eq!(moves.len(), board.all_moves(Player::One).len());
        for pair in moves.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_capture_ranks_first() {
        let board: Board = "
            ......
            ......
            ......
            ..q...
            ......
            ..R...
        "
        .parse()
        .unwrap();
        let moves = ordered_moves(&board, Player::One);
        assert_eq!((moves[0].from, moves[0].to), (pos(5, 2), pos(3, 2)));
        // 90 for the queen, centre distance 1 gives 8, the queen does not
        // threaten its own cell.
        assert_eq!(moves[0].score, 98);
    }

    #[test]
    fn test_center_term() {
        let board: Board = "......\n......\n......\n......\n......\nP.....".parse().unwrap();
        let score = static_score(&board, Player::One, pos(5, 0), pos(4, 1));
        // centre distance of (4,1) is 3
        assert_eq!(score, 4);
    }

    #[test]
    fn test_combo_term() {
        let board: Board = "......\n......\n......\nRR....\n......\n..R...".parse().unwrap();
        let score = static_score(&board, Player::One, pos(5, 2), pos(3, 2));
        // line of three scores 6, weighted 90; centre distance 1 gives 8
        assert_eq!(score, 98);
    }

    #[test]
    fn test_threat_term() {
        let board: Board = "
            ......
            ......
            r.....
            ......
            ......
            .P....
        "
        .parse()
        .unwrap();
        // The rook on (2,0) reaches (4,0) down the file.
        assert_eq!(threats_to(&board, pos(4, 0), Player::Two), 1);
        assert_eq!(threats_to(&board, pos(4, 1), Player::Two), 0);
        let threatened = static_score(&board, Player::One, pos(5, 1), pos(4, 0));
        let safe = static_score(&board, Player::One, pos(5, 1), pos(4, 1));
        assert_eq!(threatened, 2 - 5);
        assert_eq!(safe, 4);
    }
}
