use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("No active session. Bind a player first.")]
    NoSession,

    #[error("Invalid player_name '{0}'. Must be one of: A, B, C, D")]
    InvalidPlayerName(String),

    #[error("Player '{name}' not found in game {game_id}. Available players: {available:?}")]
    PlayerNotFound {
        name: String,
        game_id: String,
        available: Vec<String>,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Cannot determine current turn number. Fetch the game state first.")]
    UnknownTurn,

    #[error("Game {0} is already finished")]
    GameFinished(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
