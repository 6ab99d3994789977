//! One controller's binding to a (game, player) pair
//!
//! - store: latest snapshot plus the turn wait
//! - events: recent game events for status reporting
//! - listener: background push-stream task feeding the store

pub mod events;
pub mod listener;
pub mod store;

use std::sync::Arc;

use serde::Serialize;

use crate::core::types::{PlayerId, PlayerName};

pub use events::{EventRecord, RecentEvents};
pub use listener::{classify, Backoff, StreamEvent, StreamListener};
pub use store::SnapshotStore;

/// Who a session controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub game_id: String,
    pub player_name: PlayerName,
    pub player_id: PlayerId,
}

/// Live session state; dropped only after `shutdown`
pub struct Session {
    binding: Binding,
    store: Arc<SnapshotStore>,
    events: Arc<RecentEvents>,
    listener: StreamListener,
}

impl Session {
    pub fn new(
        binding: Binding,
        store: Arc<SnapshotStore>,
        events: Arc<RecentEvents>,
        listener: StreamListener,
    ) -> Self {
        Self {
            binding,
            store,
            events,
            listener,
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn game_id(&self) -> &str {
        &self.binding.game_id
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn events(&self) -> &RecentEvents {
        &self.events
    }

    pub fn start(&mut self) {
        self.listener.start();
    }

    /// Stop the listener and wait for it; no store writes happen afterwards
    pub async fn shutdown(mut self) {
        self.listener.stop().await;
        tracing::info!(
            game_id = %self.binding.game_id,
            player = %self.binding.player_name,
            "session closed"
        );
    }
}
