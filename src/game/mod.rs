//! Game state model shared by the session and tactics layers

pub mod snapshot;

pub use snapshot::{Battlefield, Board, GameStatus, MissingData, Player, Snapshot};
