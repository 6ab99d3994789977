//! Controller: bind a player, then query, wait, submit or autoplay
//!
//! Holds at most one session. Rebinding tears the previous one down
//! (autoplay first, then the listener) and joins both tasks before the
//! new binding starts.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::api::{stream_url, Action, CommandRequest, GameApi, HttpGameClient, SubmitReceipt, FROM_TURN_START};
use crate::control::autoplay::{Autoplay, AutoplayStatus, LoopContext};
use crate::core::config::ControllerConfig;
use crate::core::error::{ControllerError, Result};
use crate::core::types::{PlayerId, PlayerName, TurnNo};
use crate::game::GameStatus;
use crate::session::{Binding, EventRecord, RecentEvents, Session, SnapshotStore, StreamListener};
use crate::tactics::{choose_action, Decision};
use crate::tactics::engine::fallback_default;

/// Result of a successful bind
#[derive(Debug, Clone, Serialize)]
pub struct BindReport {
    pub bound: bool,
    #[serde(flatten)]
    pub binding: Binding,
    pub game_status: GameStatus,
    pub autoplay: AutoplayReport,
    pub snapshot: Value,
}

/// Cached state for the bound player
#[derive(Debug, Clone, Serialize)]
pub struct GameStateReport {
    #[serde(flatten)]
    pub binding: Binding,
    pub game_status: GameStatus,
    pub is_my_turn: bool,
    pub snapshot: Option<Value>,
}

/// How a turn wait ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WaitOutcome {
    YourTurn { turn_no: Option<TurnNo> },
    Timeout { current_player_id: Option<PlayerId> },
    GameFinished,
}

/// Autoplay status plus the binding it applies to
#[derive(Debug, Clone, Serialize)]
pub struct AutoplayReport {
    #[serde(flatten)]
    pub status: AutoplayStatus,
    pub default_on_bind: bool,
    pub bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<PlayerName>,
}

/// Engine output for the cached snapshot, not submitted
#[derive(Debug, Clone, Serialize)]
pub struct MovePreview {
    #[serde(flatten)]
    pub binding: Binding,
    pub game_status: GameStatus,
    pub is_my_turn: bool,
    pub turn_no: Option<TurnNo>,
    pub decision_preview: Decision,
}

/// Connection health and binding
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub bound: bool,
    #[serde(flatten)]
    pub binding: Option<Binding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_status: Option<GameStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_no: Option<TurnNo>,
    pub is_my_turn: bool,
    pub connected: bool,
    pub recent_events: Vec<EventRecord>,
    pub autoplay: AutoplayReport,
}

pub struct Controller {
    api: Arc<dyn GameApi>,
    config: ControllerConfig,
    session: Option<Session>,
    autoplay: Autoplay,
}

impl Controller {
    pub fn new(api: Arc<dyn GameApi>, config: ControllerConfig) -> Self {
        let autoplay = Autoplay::new(config.autoplay_wait_timeout());
        Self {
            api,
            config,
            session: None,
            autoplay,
        }
    }

    /// Controller backed by the HTTP client
    pub fn from_config(config: ControllerConfig) -> Result<Self> {
        let api = HttpGameClient::from_config(&config)?;
        Ok(Self::new(Arc::new(api), config))
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(ControllerError::NoSession)
    }

    /// Bind to `player_name` in `game_id`; `autoplay` defaults to the config
    pub async fn bind(&mut self, game_id: &str, player_name: &str, autoplay: Option<bool>) -> Result<BindReport> {
        let player_name: PlayerName = player_name.parse()?;

        self.unbind().await;

        let info = self.api.fetch_game(game_id).await?;
        let player_id = info
            .player_id_for(player_name.as_str())
            .cloned()
            .ok_or_else(|| ControllerError::PlayerNotFound {
                name: player_name.to_string(),
                game_id: game_id.to_string(),
                available: info.player_names(),
            })?;

        let snapshot = self.api.fetch_snapshot(game_id, FROM_TURN_START).await?;
        let raw_snapshot = snapshot.raw().clone();

        let binding = Binding {
            game_id: game_id.to_string(),
            player_name,
            player_id: player_id.clone(),
        };
        let store = Arc::new(SnapshotStore::with_snapshot(
            player_id,
            snapshot,
            self.config.turn_recheck_interval(),
        ));
        let events = Arc::new(RecentEvents::new(self.config.recent_event_capacity));
        let poller = self.config.poll_fallback.then(|| Arc::clone(&self.api));
        let listener = StreamListener::new(
            stream_url(&self.config.base_url, game_id),
            game_id,
            Arc::clone(&store),
            Arc::clone(&events),
            poller,
            &self.config,
        );

        let mut session = Session::new(binding.clone(), store, events, listener);
        session.start();
        self.session = Some(session);
        tracing::info!(game_id, player = %player_name, "bound player");

        if autoplay.unwrap_or(self.config.autoplay_on_bind) {
            if let Err(e) = self.start_autoplay() {
                tracing::warn!(game_id, error = %e, "autoplay not started");
            }
        }

        let game_status = self.require_session()?.store().status();
        Ok(BindReport {
            bound: true,
            binding,
            game_status,
            autoplay: self.autoplay_status(),
            snapshot: raw_snapshot,
        })
    }

    /// Stop autoplay and the listener, joining both; no-op when unbound
    pub async fn unbind(&mut self) {
        self.autoplay.stop().await;
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    pub fn game_state(&self) -> Result<GameStateReport> {
        let session = self.require_session()?;
        let store = session.store();
        Ok(GameStateReport {
            binding: session.binding().clone(),
            game_status: store.status(),
            is_my_turn: store.is_my_turn(),
            snapshot: store.snapshot().map(|s| s.raw().clone()),
        })
    }

    pub async fn wait_for_my_turn(&self, timeout: Duration) -> Result<WaitOutcome> {
        let store = Arc::clone(self.require_session()?.store());
        if store.is_finished() {
            return Ok(WaitOutcome::GameFinished);
        }

        let got_turn = store.wait_for_turn(timeout).await;
        if store.is_finished() {
            return Ok(WaitOutcome::GameFinished);
        }
        if !got_turn {
            return Ok(WaitOutcome::Timeout {
                current_player_id: store.current_player_id(),
            });
        }
        Ok(WaitOutcome::YourTurn {
            turn_no: store.turn_no(),
        })
    }

    /// Submit an explicit action for the cached turn, bypassing autoplay
    pub async fn submit_action(
        &self,
        command_type: &str,
        direction: Option<&str>,
        speak_text: Option<&str>,
    ) -> Result<SubmitReceipt> {
        let session = self.require_session()?;
        let action = Action::parse(command_type, direction, speak_text)?;
        let turn_no = session.store().turn_no().ok_or(ControllerError::UnknownTurn)?;

        let command = CommandRequest::new(session.binding().player_id.clone(), turn_no, action);
        let receipt = self.api.submit_command(session.game_id(), &command).await?;
        tracing::info!(game_id = session.game_id(), turn_no, accepted = receipt.accepted, "manual command submitted");
        Ok(receipt)
    }

    pub async fn set_autoplay(&mut self, enabled: bool) -> Result<AutoplayReport> {
        if enabled {
            self.start_autoplay()?;
        } else {
            self.autoplay.stop().await;
        }
        Ok(self.autoplay_status())
    }

    fn start_autoplay(&mut self) -> Result<()> {
        let session = self.require_session()?;
        if session.store().is_finished() {
            return Err(ControllerError::GameFinished(session.game_id().to_string()));
        }
        let ctx = LoopContext::new(
            Arc::clone(&self.api),
            session.binding().clone(),
            Arc::clone(session.store()),
            &self.config,
        );
        self.autoplay.start(ctx);
        Ok(())
    }

    pub fn autoplay_status(&self) -> AutoplayReport {
        let binding = self.session.as_ref().map(Session::binding);
        AutoplayReport {
            status: self.autoplay.status(),
            default_on_bind: self.config.autoplay_on_bind,
            bound: binding.is_some(),
            game_id: binding.map(|b| b.game_id.clone()),
            player_name: binding.map(|b| b.player_name),
        }
    }

    /// What autoplay would do right now
    pub fn explain_next_move(&self) -> Result<MovePreview> {
        let session = self.require_session()?;
        let store = session.store();
        let decision = match store.snapshot() {
            Some(snapshot) => choose_action(&snapshot, store.player_id()),
            None => fallback_default("No snapshot available yet.", None),
        };
        Ok(MovePreview {
            binding: session.binding().clone(),
            game_status: store.status(),
            is_my_turn: store.is_my_turn(),
            turn_no: store.turn_no(),
            decision_preview: decision,
        })
    }

    pub fn session_info(&self) -> SessionInfo {
        let autoplay = self.autoplay_status();
        match &self.session {
            None => SessionInfo {
                bound: false,
                binding: None,
                game_status: None,
                turn_no: None,
                is_my_turn: false,
                connected: false,
                recent_events: Vec::new(),
                autoplay,
            },
            Some(session) => {
                let store = session.store();
                SessionInfo {
                    bound: true,
                    binding: Some(session.binding().clone()),
                    game_status: Some(store.status()),
                    turn_no: store.turn_no(),
                    is_my_turn: store.is_my_turn(),
                    connected: store.is_connected(),
                    recent_events: session.events().to_vec(),
                    autoplay,
                }
            }
        }
    }
}
