pub mod config;
pub mod error;
pub mod types;

pub use config::ControllerConfig;
pub use error::{ControllerError, Result};
pub use types::{CommandType, Direction, PlayerId, PlayerName, Position, TurnNo};
