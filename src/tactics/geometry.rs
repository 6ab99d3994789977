//! T-shaped shot geometry
//!
//! A shot enters the cell next to the shooter, then sweeps both ways along
//! the perpendicular axis from there. A sweep ends at the first living
//! opponent, the first wall, or the board edge.

use serde::Serialize;

use crate::core::types::{Direction, Position};
use crate::game::snapshot::{Board, Player};

/// An opponent reached by a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    pub target_name: String,
    pub target_id: String,
    pub position: Position,
    pub sweep: Direction,
    pub target_shield: Direction,
    pub blocked_by_shield: bool,
}

/// All hits produced by firing in one direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShotOption {
    pub direction: Direction,
    pub laser_cell: Position,
    pub hits: Vec<Hit>,
}

impl ShotOption {
    pub fn unblocked_hits(&self) -> usize {
        self.hits.iter().filter(|h| !h.blocked_by_shield).count()
    }

    pub fn is_effective(&self) -> bool {
        self.unblocked_hits() > 0
    }
}

/// A shield stops a sweep only when it faces straight back at it
#[inline]
pub fn shield_blocks(shield: Direction, sweep: Direction) -> bool {
    shield == sweep.opposite()
}

/// Living opponent standing on `pos`, if any
pub fn opponent_at<'a>(opponents: &[&'a Player], pos: Position) -> Option<&'a Player> {
    opponents.iter().copied().find(|p| p.position == pos)
}

/// Scan from `start` (exclusive) toward `direction`
pub fn sweep(board: &Board, start: Position, direction: Direction, opponents: &[&Player]) -> Option<Hit> {
    let mut pos = start.step(direction);
    while board.in_bounds(pos) {
        if let Some(target) = opponent_at(opponents, pos) {
            return Some(Hit {
                target_name: target.name.clone(),
                target_id: target.id.clone(),
                position: pos,
                sweep: direction,
                target_shield: target.shield,
                blocked_by_shield: shield_blocks(target.shield, direction),
            });
        }
        if !board.is_open(pos) {
            return None;
        }
        pos = pos.step(direction);
    }
    None
}

/// Every direction that produces at least one hit, in `Direction::ALL` order.
///
/// The direction the shooter's shield covers is never fired through.
pub fn find_shots(
    board: &Board,
    shooter: Position,
    shield: Direction,
    opponents: &[&Player],
) -> Vec<ShotOption> {
    let mut shots = Vec::new();
    for direction in Direction::ALL {
        if direction == shield {
            continue;
        }
        let laser_cell = shooter.step(direction);
        if !board.is_open(laser_cell) || opponent_at(opponents, laser_cell).is_some() {
            continue;
        }

        let hits: Vec<Hit> = direction
            .perpendicular()
            .into_iter()
            .filter_map(|s| sweep(board, laser_cell, s, opponents))
            .collect();

        if !hits.is_empty() {
            shots.push(ShotOption {
                direction,
                laser_cell,
                hits,
            });
        }
    }
    shots
}

/// Effective shot with the most unblocked hits; the earliest wins ties
pub fn best_effective(shots: &[ShotOption]) -> Option<&ShotOption> {
    let mut best: Option<&ShotOption> = None;
    for shot in shots.iter().filter(|s| s.is_effective()) {
        match best {
            Some(current) if shot.unblocked_hits() <= current.unblocked_hits() => {}
            _ => best = Some(shot),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, row: i64, col: i64, shield: Direction) -> Player {
        Player::new(id.to_uppercase(), id, Position::new(row, col), shield)
    }

    #[test]
    fn test_concrete_three_by_three_hit() {
        let board = Board::open(3, 3).unwrap();
        let enemy = player("b", 0, 1, Direction::Up);
        let shots = find_shots(&board, Position::new(1, 0), Direction::Left, &[&enemy]);

        let right = shots
            .iter()
            .find(|s| s.direction == Direction::Right)
            .expect("shooting right reaches the enemy");
        assert_eq!(right.laser_cell, Position::new(1, 1));
        assert_eq!(right.hits.len(), 1);
        assert_eq!(right.hits[0].sweep, Direction::Up);
        assert!(!right.hits[0].blocked_by_shield);
        assert!(right.is_effective());
    }

    #[test]
    fn test_opposing_shield_blocks() {
        let board = Board::open(3, 3).unwrap();
        let enemy = player("b", 0, 1, Direction::Down);
        let shots = find_shots(&board, Position::new(1, 0), Direction::Left, &[&enemy]);
        let right = shots.iter().find(|s| s.direction == Direction::Right).unwrap();
        assert!(right.hits[0].blocked_by_shield);
        assert!(best_effective(&shots).is_none());
    }

    #[test]
    fn test_only_opposite_shield_blocks() {
        for sweep_dir in Direction::ALL {
            for shield in Direction::ALL {
                assert_eq!(shield_blocks(shield, sweep_dir), shield == sweep_dir.opposite());
            }
        }
    }

    #[test]
    fn test_no_shot_through_own_shield() {
        let board = Board::open(3, 3).unwrap();
        let enemy = player("b", 0, 1, Direction::Up);
        let shots = find_shots(&board, Position::new(1, 0), Direction::Right, &[&enemy]);
        assert!(shots.iter().all(|s| s.direction != Direction::Right));
    }

    #[test]
    fn test_blocked_adjacent_cell_yields_nothing() {
        let mut cells = vec![vec![0; 3]; 3];
        cells[1][1] = 2;
        let board = Board::new(3, 3, cells).unwrap();
        let enemy = player("b", 0, 1, Direction::Up);
        let shots = find_shots(&board, Position::new(1, 0), Direction::Left, &[&enemy]);
        assert!(shots.iter().all(|s| s.direction != Direction::Right));
    }

    #[test]
    fn test_adjacent_opponent_blocks_laser_cell() {
        let board = Board::open(3, 3).unwrap();
        let enemy = player("b", 1, 1, Direction::Up);
        let shots = find_shots(&board, Position::new(1, 0), Direction::Left, &[&enemy]);
        assert!(shots.iter().all(|s| s.direction != Direction::Right));
    }

    #[test]
    fn test_wall_stops_sweep() {
        // Shooter at (2,0) fires right into (2,1); sweep up passes (1,1) wall before enemy at (0,1)
        let mut cells = vec![vec![0; 3]; 3];
        cells[1][1] = 1;
        let board = Board::new(3, 3, cells).unwrap();
        let enemy = player("b", 0, 1, Direction::Left);
        let hit = sweep(&board, Position::new(2, 1), Direction::Up, &[&enemy]);
        assert!(hit.is_none());
    }

    #[test]
    fn test_sweep_stops_at_first_target() {
        let board = Board::open(5, 1).unwrap();
        let near = player("near", 1, 0, Direction::Down);
        let far = player("far", 0, 0, Direction::Left);
        let hit = sweep(&board, Position::new(3, 0), Direction::Up, &[&far, &near]).unwrap();
        assert_eq!(hit.target_id, "near");
        assert!(hit.blocked_by_shield);
    }

    #[test]
    fn test_best_effective_prefers_more_hits_then_order() {
        // Shooter in the middle of an open 5x5; enemies reachable by two directions
        let board = Board::open(5, 5).unwrap();
        let a = player("a", 1, 0, Direction::Up);
        let b = player("b", 1, 4, Direction::Up);
        let c = player("c", 3, 0, Direction::Up);
        let shots = find_shots(&board, Position::new(2, 2), Direction::Down, &[&a, &b, &c]);
        // Up: laser at (1,2), sweeps hit a and b. Left: laser at (2,1), sweep down hits nothing.
        let best = best_effective(&shots).unwrap();
        assert_eq!(best.direction, Direction::Up);
        assert_eq!(best.unblocked_hits(), 2);
    }
}
