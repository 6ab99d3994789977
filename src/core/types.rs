//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::ControllerError;

/// Player identifier assigned by the game manager
pub type PlayerId = String;

/// Turn counter as reported by the server
pub type TurnNo = u64;

/// Compass direction on the grid; rows grow downward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed evaluation order used wherever ties must resolve deterministically.
    /// Horizontal first.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// (row, col) step
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The two sweep directions of a shot fired this way
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ControllerError::InvalidCommand(format!(
                "Invalid direction '{}'. Must be one of: up, down, left, right",
                other
            ))),
        }
    }
}

/// Action kinds a player may submit on its turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Move,
    Shield,
    Shoot,
    Speak,
}

impl CommandType {
    pub fn requires_direction(self) -> bool {
        !matches!(self, CommandType::Speak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Move => "move",
            CommandType::Shield => "shield",
            CommandType::Shoot => "shoot",
            CommandType::Speak => "speak",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(CommandType::Move),
            "shield" => Ok(CommandType::Shield),
            "shoot" => Ok(CommandType::Shoot),
            "speak" => Ok(CommandType::Speak),
            other => Err(ControllerError::InvalidCommand(format!(
                "Invalid command_type '{}'. Must be one of: move, shield, shoot, speak",
                other
            ))),
        }
    }
}

/// Seat names a controller can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerName {
    A,
    B,
    C,
    D,
}

impl PlayerName {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerName::A => "A",
            PlayerName::B => "B",
            PlayerName::C => "C",
            PlayerName::D => "D",
        }
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerName {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "A" => Ok(PlayerName::A),
            "B" => Ok(PlayerName::B),
            "C" => Ok(PlayerName::C),
            "D" => Ok(PlayerName::D),
            _ => Err(ControllerError::InvalidPlayerName(normalized)),
        }
    }
}

/// Grid cell address; signed so neighbours of edge cells are representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub row: i64,
    pub col: i64,
}

impl Position {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self::new(self.row.saturating_add(dr), self.col.saturating_add(dc))
    }

    /// Saturates instead of overflowing on far-off coordinates
    pub fn manhattan(self, other: Position) -> i64 {
        let (dr, dc) = self.offset_to(other);
        dr.saturating_abs().saturating_add(dc.saturating_abs())
    }

    /// Signed (row, col) offset from `self` to `other`, saturating
    pub fn offset_to(self, other: Position) -> (i64, i64) {
        (other.row.saturating_sub(self.row), other.col.saturating_sub(self.col))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
