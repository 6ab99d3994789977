//! Validated game snapshot model
//!
//! The server pushes loosely shaped JSON. `Snapshot::from_value` is the one
//! place that shape is inspected: everything downstream works on `Board`,
//! `Player` and `Battlefield`, or on the `MissingData` reason explaining why
//! no battlefield could be built.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::types::{Direction, PlayerId, Position, TurnNo};

/// Lifecycle status of a game instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Created,
    Running,
    Finished,
    #[default]
    #[serde(other)]
    Unknown,
}

impl GameStatus {
    fn from_str_lossy(raw: &str) -> Self {
        match raw {
            "CREATED" => GameStatus::Created,
            "RUNNING" => GameStatus::Running,
            "FINISHED" => GameStatus::Finished,
            _ => GameStatus::Unknown,
        }
    }
}

/// Immutable grid; 0 is passable, anything else is a wall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: i64,
    cols: i64,
    cells: Vec<Vec<i64>>,
}

impl Board {
    /// Build a board, rejecting non-positive dimensions
    pub fn new(rows: i64, cols: i64, cells: Vec<Vec<i64>>) -> Option<Self> {
        if rows <= 0 || cols <= 0 {
            return None;
        }
        Some(Self { rows, cols, cells })
    }

    /// Open board of the given size
    pub fn open(rows: i64, cols: i64) -> Option<Self> {
        let cells = vec![vec![0; cols.max(0) as usize]; rows.max(0) as usize];
        Self::new(rows, cols, cells)
    }

    pub fn rows(&self) -> i64 {
        self.rows
    }

    pub fn cols(&self) -> i64 {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    /// Cell value; a cell missing from a ragged matrix reads as a wall
    pub fn cell(&self, pos: Position) -> Option<i64> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(
            self.cells
                .get(pos.row as usize)
                .and_then(|row| row.get(pos.col as usize))
                .copied()
                .unwrap_or(1),
        )
    }

    /// In bounds and passable
    #[inline]
    pub fn is_open(&self, pos: Position) -> bool {
        self.cell(pos) == Some(0)
    }
}

/// One participant as seen in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub name: String,
    pub id: PlayerId,
    pub hp: i64,
    pub position: Position,
    /// Side currently protected
    pub shield: Direction,
    pub alive: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, id: impl Into<PlayerId>, position: Position, shield: Direction) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            hp: 10,
            position,
            shield,
            alive: true,
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let int = |key: &str| obj.get(key).and_then(Value::as_i64).unwrap_or(0);
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            name: text("player_name"),
            id: text("player_id"),
            hp: int("hp"),
            position: Position::new(int("row"), int("col")),
            shield: obj
                .get("shield")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(Direction::Up),
            alive: obj.get("alive").and_then(Value::as_bool).unwrap_or(true),
        }
    }
}

/// Board plus players: everything the tactics engine reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battlefield {
    pub board: Board,
    pub players: Vec<Player>,
}

impl Battlefield {
    pub fn new(board: Board, players: Vec<Player>) -> Self {
        Self { board, players }
    }
}

/// Why a snapshot could not produce a battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingData {
    NoState,
    NoPlayers,
    NoMap,
    NoCells,
    InvalidDimensions,
}

impl fmt::Display for MissingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MissingData::NoState => "Snapshot has no valid `state` object.",
            MissingData::NoPlayers => "State has no valid `players` list.",
            MissingData::NoMap => "State has no valid `map` object.",
            MissingData::NoCells => "Map has no valid `cells` matrix.",
            MissingData::InvalidDimensions => "Map dimensions are invalid for decision making.",
        };
        f.write_str(text)
    }
}

/// Point-in-time view of a game; replaced wholesale, never mutated
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// `None` when the payload carried no recognizable status
    pub status: Option<GameStatus>,
    pub turn_no: Option<TurnNo>,
    pub round_no: Option<u64>,
    pub current_player_id: Option<PlayerId>,
    pub field: Result<Battlefield, MissingData>,
    raw: Value,
}

impl Snapshot {
    /// Validate a raw payload. Never fails: structural problems end up in `field`.
    pub fn from_value(raw: Value) -> Self {
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(GameStatus::from_str_lossy);
        let turn_no = raw.get("turn_no").and_then(Value::as_u64);
        let round_no = raw.get("round_no").and_then(Value::as_u64);
        let current_player_id = raw
            .get("current_player_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let field = parse_battlefield(raw.get("state"));

        Self {
            status,
            turn_no,
            round_no,
            current_player_id,
            field,
            raw,
        }
    }

    /// Build a snapshot directly from validated parts
    pub fn from_parts(
        status: GameStatus,
        turn_no: TurnNo,
        current_player_id: Option<PlayerId>,
        field: Battlefield,
    ) -> Self {
        let raw = serde_json::json!({
            "status": status,
            "turn_no": turn_no,
            "current_player_id": current_player_id,
            "state": battlefield_to_value(&field),
        });
        Self {
            status: Some(status),
            turn_no: Some(turn_no),
            round_no: None,
            current_player_id,
            field: Ok(field),
            raw,
        }
    }

    /// The payload exactly as received, for reporting
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn battlefield(&self) -> Option<&Battlefield> {
        self.field.as_ref().ok()
    }
}

fn parse_battlefield(state: Option<&Value>) -> Result<Battlefield, MissingData> {
    let state = state.and_then(Value::as_object).ok_or(MissingData::NoState)?;

    let players = state
        .get("players")
        .and_then(Value::as_array)
        .ok_or(MissingData::NoPlayers)?
        .iter()
        .filter_map(Value::as_object)
        .map(Player::from_object)
        .collect();

    let map = state
        .get("map")
        .and_then(Value::as_object)
        .ok_or(MissingData::NoMap)?;
    let cells: Vec<Vec<i64>> = map
        .get("cells")
        .and_then(Value::as_array)
        .ok_or(MissingData::NoCells)?
        .iter()
        .map(|row| {
            row.as_array()
                .map(|values| values.iter().map(|v| v.as_i64().unwrap_or(1)).collect())
                .unwrap_or_default()
        })
        .collect();

    let dim = |key: &str, fallback: usize| {
        map.get(key)
            .and_then(Value::as_i64)
            .filter(|n| *n != 0)
            .unwrap_or(fallback as i64)
    };
    let rows = dim("rows", cells.len());
    let cols = dim("cols", cells.first().map_or(0, Vec::len));

    let board = Board::new(rows, cols, cells).ok_or(MissingData::InvalidDimensions)?;
    Ok(Battlefield::new(board, players))
}

fn battlefield_to_value(field: &Battlefield) -> Value {
    let players: Vec<Value> = field
        .players
        .iter()
        .map(|p| {
            serde_json::json!({
                "player_name": p.name,
                "player_id": p.id,
                "hp": p.hp,
                "row": p.position.row,
                "col": p.position.col,
                "shield": p.shield,
                "alive": p.alive,
            })
        })
        .collect();
    serde_json::json!({
        "map": {
            "rows": field.board.rows,
            "cols": field.board.cols,
            "cells": field.board.cells,
        },
        "players": players,
    })
}
