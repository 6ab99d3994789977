//! Game services collaborator
//!
//! `GameApi` is the seam between the controller and the backend, so the
//! control loop can run against an in-memory fake in tests.

pub mod client;
pub mod wire;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::types::TurnNo;
use crate::game::Snapshot;

pub use client::{stream_url, HttpGameClient, FROM_TURN_START};
pub use wire::{Action, CommandRequest, GameInfo, PlayerIdentity, SubmitReceipt};

#[async_trait]
pub trait GameApi: Send + Sync {
    /// Game metadata, used at bind time to resolve a seat name
    async fn fetch_game(&self, game_id: &str) -> Result<GameInfo>;

    /// Latest snapshot, replaying from `from_turn_no`
    async fn fetch_snapshot(&self, game_id: &str, from_turn_no: TurnNo) -> Result<Snapshot>;

    /// The only mutating call
    async fn submit_command(&self, game_id: &str, command: &CommandRequest) -> Result<SubmitReceipt>;
}
