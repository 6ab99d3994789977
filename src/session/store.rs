//! Snapshot store with a pulse-style turn wait
//!
//! One writer (the stream listener) replaces the snapshot wholesale; any
//! number of readers look at it or wait for the bound player's turn.
//! Waking is edge-triggered through `Notify::notify_waiters`, which does
//! not latch, so waiters also re-check on a bounded interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::core::types::{PlayerId, TurnNo};
use crate::game::{GameStatus, Snapshot};

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Option<Arc<Snapshot>>,
    status: GameStatus,
}

/// Latest known state for one (game, player) binding
#[derive(Debug)]
pub struct SnapshotStore {
    player_id: PlayerId,
    state: RwLock<StoreState>,
    pulse: Notify,
    recheck_interval: Duration,
    connected: AtomicBool,
}

impl SnapshotStore {
    pub fn new(player_id: impl Into<PlayerId>, recheck_interval: Duration) -> Self {
        Self {
            player_id: player_id.into(),
            state: RwLock::new(StoreState::default()),
            pulse: Notify::new(),
            recheck_interval,
            connected: AtomicBool::new(false),
        }
    }

    /// Store seeded with the snapshot fetched at bind time
    pub fn with_snapshot(player_id: impl Into<PlayerId>, snapshot: Snapshot, recheck_interval: Duration) -> Self {
        let store = Self::new(player_id, recheck_interval);
        store.replace(Some(snapshot), None);
        store
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Replace the snapshot and wake current waiters.
    ///
    /// A snapshot without a status keeps the previous one.
    pub fn update(&self, snapshot: Snapshot) {
        self.replace(Some(snapshot), None);
        self.pulse.notify_waiters();
    }

    /// Force FINISHED, optionally together with a final snapshot, in one step
    pub fn finish(&self, snapshot: Option<Snapshot>) {
        self.replace(snapshot, Some(GameStatus::Finished));
        self.pulse.notify_waiters();
    }

    fn replace(&self, snapshot: Option<Snapshot>, forced: Option<GameStatus>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = snapshot {
            if let Some(status) = snapshot.status {
                state.status = status;
            }
            state.snapshot = Some(Arc::new(snapshot));
        }
        if let Some(status) = forced {
            state.status = status;
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.read(|s| s.snapshot.clone())
    }

    pub fn status(&self) -> GameStatus {
        self.read(|s| s.status)
    }

    pub fn turn_no(&self) -> Option<TurnNo> {
        self.read(|s| s.snapshot.as_ref().and_then(|snap| snap.turn_no))
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.read(|s| s.snapshot.as_ref().and_then(|snap| snap.current_player_id.clone()))
    }

    /// RUNNING and the snapshot names this player as current
    pub fn is_my_turn(&self) -> bool {
        self.read(|s| {
            s.status == GameStatus::Running
                && s.snapshot
                    .as_ref()
                    .and_then(|snap| snap.current_player_id.as_deref())
                    == Some(self.player_id.as_str())
        })
    }

    pub fn is_finished(&self) -> bool {
        self.status() == GameStatus::Finished
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Wait until it is this player's turn.
    ///
    /// Returns `true` on our turn, `false` once the game is finished or the
    /// timeout elapses. The notification is registered before each check so
    /// an update landing between the check and the wait still wakes us.
    pub async fn wait_for_turn(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.pulse.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_my_turn() {
                return true;
            }
            if self.is_finished() {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = (deadline - now).min(self.recheck_interval);
            let _ = tokio::time::timeout(slice, notified).await;
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}
