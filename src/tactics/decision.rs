//! Decision output of the tactics engine

use serde::Serialize;
use serde_json::Value;

use crate::core::types::{CommandType, Direction};

pub const STRATEGY: &str = "heuristic_v2_t_shaped";

/// Which cascade tier produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    TShapedShot,
    ShieldChangeForShot,
    PositioningForShot,
    CloseDistance,
    DefensiveFallback,
    FallbackDefault,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::TShapedShot => "t_shaped_shot",
            ReasonCode::ShieldChangeForShot => "shield_change_for_shot",
            ReasonCode::PositioningForShot => "positioning_for_shot",
            ReasonCode::CloseDistance => "close_distance",
            ReasonCode::DefensiveFallback => "defensive_fallback",
            ReasonCode::FallbackDefault => "fallback_default",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            ReasonCode::TShapedShot => "T-shaped sweep hits enemy",
            ReasonCode::ShieldChangeForShot => "changing shield to enable T-shaped shot next turn",
            ReasonCode::PositioningForShot => "moving to create T-shaped shot opportunity",
            ReasonCode::CloseDistance => "no shot available, closing distance to enemy",
            ReasonCode::DefensiveFallback => {
                "no strong move available, so protect against nearest threat"
            }
            ReasonCode::FallbackDefault => "snapshot data missing, so use a safe default",
        }
    }
}

/// Human-readable steps plus the data the firing tier looked at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionTrace {
    pub strategy: &'static str,
    pub summary: String,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

/// One action for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub command_type: CommandType,
    pub direction: Option<Direction>,
    pub speak_text: Option<String>,
    pub reason: ReasonCode,
    pub trace: DecisionTrace,
}

impl Decision {
    pub fn new(
        command_type: CommandType,
        direction: Option<Direction>,
        reason: ReasonCode,
        steps: Vec<String>,
        meta: Value,
    ) -> Self {
        let label = match direction {
            Some(d) => format!("{} {}", command_type, d),
            None => command_type.to_string(),
        };
        let summary = format!("Selected `{}` because {}.", label, reason.explanation());
        Self {
            command_type,
            direction,
            speak_text: None,
            reason,
            trace: DecisionTrace {
                strategy: STRATEGY,
                summary,
                steps,
                meta,
            },
        }
    }

    /// "shoot right", "shield up", ...
    pub fn label(&self) -> String {
        match self.direction {
            Some(d) => format!("{} {}", self.command_type, d),
            None => self.command_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_names_action_and_reason() {
        let decision = Decision::new(
            CommandType::Shoot,
            Some(Direction::Right),
            ReasonCode::TShapedShot,
            vec![],
            Value::Null,
        );
        assert_eq!(
            decision.trace.summary,
            "Selected `shoot right` because T-shaped sweep hits enemy."
        );
        assert_eq!(decision.label(), "shoot right");
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let value = serde_json::to_value(ReasonCode::ShieldChangeForShot).unwrap();
        assert_eq!(value, ReasonCode::ShieldChangeForShot.as_str());
    }
}
