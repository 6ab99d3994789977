//! Async HTTP client for the game services
//!
//! Three endpoints behind one reverse proxy: game metadata (game manager),
//! snapshots (game watcher) and command submission (web service).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::wire::{CommandRequest, GameInfo, SubmitReceipt};
use crate::api::GameApi;
use crate::core::config::ControllerConfig;
use crate::core::error::{ControllerError, Result};
use crate::core::types::{CommandType, Direction, PlayerId, TurnNo};
use crate::game::Snapshot;

/// First turn the stream and snapshot endpoints replay from
pub const FROM_TURN_START: TurnNo = 1;

/// reqwest-backed `GameApi`
#[derive(Debug, Clone)]
pub struct HttpGameClient {
    client: Client,
    base_url: String,
}

impl HttpGameClient {
    /// Create a client with an explicit request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Push stream URL for a game: scheme swapped to ws/wss
pub fn stream_url(base_url: &str, game_id: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!(
        "{}/v2/games/{}/stream?from_turn_no={}",
        ws_base, game_id, FROM_TURN_START
    )
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ControllerError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl GameApi for HttpGameClient {
    async fn fetch_game(&self, game_id: &str) -> Result<GameInfo> {
        let raw = self.get_json(&format!("/v2/games/{}", game_id), &[]).await?;
        Ok(GameInfo::from_value(raw))
    }

    async fn fetch_snapshot(&self, game_id: &str, from_turn_no: TurnNo) -> Result<Snapshot> {
        let raw = self
            .get_json(
                &format!("/v2/games/{}/snapshot", game_id),
                &[("from_turn_no", from_turn_no.to_string())],
            )
            .await?;
        Ok(Snapshot::from_value(raw))
    }

    async fn submit_command(&self, game_id: &str, command: &CommandRequest) -> Result<SubmitReceipt> {
        let body = CommandBody::new(command);
        let response = self
            .client
            .post(format!("{}/v2/games/{}/commands", self.base_url, game_id))
            .json(&body)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

// Wire body for POST /commands; command_id and client_sent_at are minted per attempt
#[derive(Serialize)]
struct CommandBody<'a> {
    command_id: String,
    player_id: &'a PlayerId,
    command_type: CommandType,
    direction: Option<Direction>,
    speak_text: Option<&'a str>,
    turn_no: TurnNo,
    client_sent_at: String,
}

impl<'a> CommandBody<'a> {
    fn new(command: &'a CommandRequest) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            player_id: &command.player_id,
            command_type: command.action.command_type,
            direction: command.action.direction,
            speak_text: command.action.speak_text.as_deref(),
            turn_no: command.turn_no,
            client_sent_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
