//! Tactical decision cascade
//!
//! Tiers, first applicable wins:
//! 1. shoot now
//! 2. turn the shield so a shot opens up next turn
//! 3. step somewhere that opens a shot
//! 4. step closer to the nearest opponent
//! 5. shield toward the nearest opponent
//!
//! Pure and deterministic: the same snapshot always yields the same decision.

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::types::{CommandType, Direction, Position};
use crate::game::snapshot::{Battlefield, Board, MissingData, Player, Snapshot};
use crate::tactics::decision::{Decision, ReasonCode};
use crate::tactics::geometry::{best_effective, find_shots, opponent_at, ShotOption};

const DEFAULT_SHIELD: Direction = Direction::Up;

/// One evaluated step in tiers 3 and 4
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCandidate {
    pub direction: Direction,
    pub next_position: Position,
    pub passable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_after_move: Option<i64>,
    pub creates_shot: bool,
    pub shot_count: usize,
}

/// Choose an action for `player_id` from a snapshot
pub fn choose_action(snapshot: &Snapshot, player_id: &str) -> Decision {
    match &snapshot.field {
        Ok(field) => decide(field, player_id),
        Err(missing) => fallback_default(&missing.to_string(), Some(*missing)),
    }
}

/// Choose an action for `player_id` on a validated battlefield
pub fn decide(field: &Battlefield, player_id: &str) -> Decision {
    let mut me: Option<&Player> = None;
    let mut opponents: Vec<&Player> = Vec::new();
    for player in field.players.iter().filter(|p| p.alive) {
        if player.id == player_id {
            me = Some(player);
        } else {
            opponents.push(player);
        }
    }

    let me = match me {
        Some(me) if !opponents.is_empty() => me,
        _ => {
            return fallback_default(
                "Could not locate controlled player or any alive enemies.",
                None,
            )
        }
    };

    let board = &field.board;
    let pos = me.position;
    let shield = me.shield;

    // Tier 1
    let shots = find_shots(board, pos, shield, &opponents);
    if let Some(best) = best_effective(&shots) {
        let hit_details = best
            .hits
            .iter()
            .filter(|h| !h.blocked_by_shield)
            .map(|h| format!("{} at {} via {} sweep", h.target_name, h.position, h.sweep))
            .collect::<Vec<_>>()
            .join(", ");
        return Decision::new(
            CommandType::Shoot,
            Some(best.direction),
            ReasonCode::TShapedShot,
            vec![
                format!("My position is {}, shield facing {}.", pos, shield),
                format!(
                    "T-shaped shot: shoot {} → laser at {}, sweep hits: {}.",
                    best.direction, best.laser_cell, hit_details
                ),
            ],
            json!({
                "my_position": pos,
                "my_shield": shield,
                "shot_details": best,
                "all_shots_evaluated": shots,
            }),
        );
    }

    // Tier 2
    for alt in Direction::ALL.into_iter().filter(|d| *d != shield) {
        let alt_shots = find_shots(board, pos, alt, &opponents);
        if let Some(enabled) = best_effective(&alt_shots) {
            return Decision::new(
                CommandType::Shield,
                Some(alt),
                ReasonCode::ShieldChangeForShot,
                vec![
                    format!("My position is {}, shield facing {}.", pos, shield),
                    format!(
                        "Current shield blocks shooting {}. Changing to {} to enable shoot {} next turn.",
                        shield, alt, enabled.direction
                    ),
                ],
                json!({
                    "my_position": pos,
                    "current_shield": shield,
                    "new_shield": alt,
                    "enabled_shot": enabled,
                }),
            );
        }
    }

    let nearest = nearest_opponent(pos, &opponents);
    let current_distance = pos.manhattan(nearest.position);
    let candidates = evaluate_moves(board, pos, shield, nearest.position, &opponents);

    // Tier 3
    let mut best_positioning: Option<&MoveCandidate> = None;
    for candidate in candidates.iter().filter(|c| c.creates_shot) {
        match best_positioning {
            Some(current) if candidate.distance_after_move >= current.distance_after_move => {}
            _ => best_positioning = Some(candidate),
        }
    }
    if let Some(chosen) = best_positioning {
        return Decision::new(
            CommandType::Move,
            Some(chosen.direction),
            ReasonCode::PositioningForShot,
            vec![
                format!("My position is {}, no T-shaped shot available.", pos),
                format!(
                    "Moving {} to {} creates T-shaped shot opportunity next turn.",
                    chosen.direction, chosen.next_position
                ),
            ],
            json!({
                "my_position": pos,
                "my_shield": shield,
                "nearest_enemy": nearest.position,
                "move_candidates": candidates,
                "positioning_moves": candidates
                    .iter()
                    .filter(|c| c.creates_shot)
                    .map(|c| c.direction)
                    .collect::<Vec<_>>(),
            }),
        );
    }

    // Tier 4
    let mut best_close: Option<(&MoveCandidate, i64)> = None;
    for candidate in &candidates {
        let Some(distance) = candidate.distance_after_move else {
            continue;
        };
        match best_close {
            Some((_, best)) if distance >= best => {}
            _ => best_close = Some((candidate, distance)),
        }
    }
    if let Some((chosen, distance)) = best_close.filter(|(_, d)| *d <= current_distance) {
        return Decision::new(
            CommandType::Move,
            Some(chosen.direction),
            ReasonCode::CloseDistance,
            vec![
                "No T-shaped shot or positioning move available.".to_string(),
                format!(
                    "Nearest enemy at {}, distance {}.",
                    nearest.position, current_distance
                ),
                format!(
                    "Moving {} to close distance to {}.",
                    chosen.direction, distance
                ),
            ],
            json!({
                "my_position": pos,
                "my_shield": shield,
                "nearest_enemy": nearest.position,
                "move_candidates": candidates,
                "current_distance": current_distance,
                "best_distance": distance,
            }),
        );
    }

    // Tier 5
    let facing = shield_toward(pos, nearest.position);
    Decision::new(
        CommandType::Shield,
        Some(facing),
        ReasonCode::DefensiveFallback,
        vec![
            "No shot, positioning move, or distance-closing move available.".to_string(),
            format!(
                "Shielding {} toward nearest enemy at {}.",
                facing, nearest.position
            ),
        ],
        json!({
            "my_position": pos,
            "my_shield": shield,
            "nearest_enemy": nearest.position,
            "move_candidates": candidates,
            "current_distance": current_distance,
        }),
    )
}

/// Safe default used whenever the snapshot cannot support a real decision
pub fn fallback_default(reason: &str, missing: Option<MissingData>) -> Decision {
    let meta = match missing {
        Some(missing) => json!({ "missing": missing }),
        None => Value::Null,
    };
    Decision::new(
        CommandType::Shield,
        Some(DEFAULT_SHIELD),
        ReasonCode::FallbackDefault,
        vec![
            reason.to_string(),
            "Fallback selected because required snapshot data was missing.".to_string(),
            format!("Using shield {} as a safe default action.", DEFAULT_SHIELD),
        ],
        meta,
    )
}

/// First opponent at minimal Manhattan distance; `opponents` must be non-empty
fn nearest_opponent<'a>(pos: Position, opponents: &[&'a Player]) -> &'a Player {
    let mut nearest = opponents[0];
    for candidate in &opponents[1..] {
        if pos.manhattan(candidate.position) < pos.manhattan(nearest.position) {
            nearest = *candidate;
        }
    }
    nearest
}

/// Face the dominant axis of the offset; ties go vertical
pub fn shield_toward(from: Position, to: Position) -> Direction {
    let (dr, dc) = from.offset_to(to);
    if dr.saturating_abs() >= dc.saturating_abs() {
        if dr > 0 {
            Direction::Down
        } else {
            Direction::Up
        }
    } else if dc > 0 {
        Direction::Right
    } else {
        Direction::Left
    }
}

/// Order untried moves are appended in, after the moves toward the target
const MOVE_TAIL_ORDER: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

/// Moves toward `target` first (dominant axis, then secondary), then the rest
pub fn preferred_directions(from: Position, target: Position) -> Vec<Direction> {
    let (dr, dc) = from.offset_to(target);
    let vertical = (dr != 0).then(|| if dr > 0 { Direction::Down } else { Direction::Up });
    let horizontal = (dc != 0).then(|| if dc > 0 { Direction::Right } else { Direction::Left });

    let toward = if dr.saturating_abs() >= dc.saturating_abs() {
        [vertical, horizontal]
    } else {
        [horizontal, vertical]
    };

    let mut order: Vec<Direction> = toward.into_iter().flatten().collect();
    for d in MOVE_TAIL_ORDER {
        if !order.contains(&d) {
            order.push(d);
        }
    }
    order
}

fn passability(board: &Board, pos: Position, opponents: &[&Player]) -> Result<(), String> {
    if !board.in_bounds(pos) {
        return Err("out_of_bounds".to_string());
    }
    if opponent_at(opponents, pos).is_some() {
        return Err("occupied_by_enemy".to_string());
    }
    match board.cell(pos) {
        Some(0) => Ok(()),
        Some(value) => Err(format!("blocked_cell_value_{}", value)),
        None => Err("out_of_bounds".to_string()),
    }
}

fn evaluate_moves(
    board: &Board,
    pos: Position,
    shield: Direction,
    target: Position,
    opponents: &[&Player],
) -> Vec<MoveCandidate> {
    preferred_directions(pos, target)
        .into_iter()
        .map(|direction| {
            let next = pos.step(direction);
            match passability(board, next, opponents) {
                Err(reason) => MoveCandidate {
                    direction,
                    next_position: next,
                    passable: false,
                    blocked_reason: Some(reason),
                    distance_after_move: None,
                    creates_shot: false,
                    shot_count: 0,
                },
                Ok(()) => {
                    let distance = opponents
                        .iter()
                        .map(|o| next.manhattan(o.position))
                        .min()
                        .unwrap_or(0);
                    let future: Vec<ShotOption> = find_shots(board, next, shield, opponents)
                        .into_iter()
                        .filter(ShotOption::is_effective)
                        .collect();
                    MoveCandidate {
                        direction,
                        next_position: next,
                        passable: true,
                        blocked_reason: None,
                        distance_after_move: Some(distance),
                        creates_shot: !future.is_empty(),
                        shot_count: future.len(),
                    }
                }
            }
        })
        .collect()
}
