//! Request and response shapes exchanged with the game services

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{ControllerError, Result};
use crate::core::types::{CommandType, Direction, PlayerId, TurnNo};
use crate::tactics::Decision;

/// Seat name to id mapping published by the game manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub player_name: String,
    pub player_id: PlayerId,
}

/// Game metadata; only the player roster is interpreted
#[derive(Debug, Clone)]
pub struct GameInfo {
    pub game_id: Option<String>,
    pub status: Option<String>,
    players: Vec<PlayerIdentity>,
    raw: Value,
}

impl GameInfo {
    /// Read the roster from `state.players`, falling back to a top-level `players`
    pub fn from_value(raw: Value) -> Self {
        let roster = raw
            .get("state")
            .and_then(|s| s.get("players"))
            .and_then(Value::as_array)
            .or_else(|| raw.get("players").and_then(Value::as_array));

        let players = roster
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|p| serde_json::from_value::<PlayerIdentity>(p.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            game_id: raw.get("game_id").and_then(Value::as_str).map(str::to_string),
            status: raw.get("status").and_then(Value::as_str).map(str::to_string),
            players,
            raw,
        }
    }

    pub fn players(&self) -> &[PlayerIdentity] {
        &self.players
    }

    pub fn player_id_for(&self, player_name: &str) -> Option<&PlayerId> {
        self.players
            .iter()
            .find(|p| p.player_name == player_name)
            .map(|p| &p.player_id)
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.player_name.clone()).collect()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// What to do this turn, already validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub command_type: CommandType,
    pub direction: Option<Direction>,
    pub speak_text: Option<String>,
}

impl Action {
    /// Validate loosely typed caller input.
    ///
    /// Move, shield and shoot need a direction; speak needs non-blank text.
    pub fn parse(command_type: &str, direction: Option<&str>, speak_text: Option<&str>) -> Result<Self> {
        let command_type: CommandType = command_type.parse()?;

        let direction = if command_type.requires_direction() {
            let raw = direction.filter(|d| !d.trim().is_empty()).ok_or_else(|| {
                ControllerError::InvalidCommand(format!(
                    "direction is required for '{}' command.",
                    command_type
                ))
            })?;
            Some(raw.parse::<Direction>()?)
        } else {
            None
        };

        let speak_text = if command_type == CommandType::Speak {
            let text = speak_text.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
                ControllerError::InvalidCommand("speak_text is required for 'speak' command.".into())
            })?;
            Some(text.to_string())
        } else {
            speak_text.map(str::to_string)
        };

        Ok(Self {
            command_type,
            direction,
            speak_text,
        })
    }
}

impl From<&Decision> for Action {
    fn from(decision: &Decision) -> Self {
        Self {
            command_type: decision.command_type,
            direction: decision.direction,
            speak_text: decision.speak_text.clone(),
        }
    }
}

/// An action addressed to one player and one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    pub player_id: PlayerId,
    pub turn_no: TurnNo,
    #[serde(flatten)]
    pub action: Action,
}

impl CommandRequest {
    pub fn new(player_id: impl Into<PlayerId>, turn_no: TurnNo, action: Action) -> Self {
        Self {
            player_id: player_id.into(),
            turn_no,
            action,
        }
    }
}

/// Acknowledgement returned by the command endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub command_id: String,
    #[serde(default)]
    pub queued_at: Option<String>,
}
