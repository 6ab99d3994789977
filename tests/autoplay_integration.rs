//! Controller and autoplay loop against an in-memory game API

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cowboy_autoplay::api::{CommandRequest, GameApi, GameInfo, SubmitReceipt};
use cowboy_autoplay::control::{AutoplayPhase, Controller, WaitOutcome};
use cowboy_autoplay::core::config::ControllerConfig;
use cowboy_autoplay::core::error::{ControllerError, Result};
use cowboy_autoplay::core::types::{CommandType, Direction, TurnNo};
use cowboy_autoplay::game::Snapshot;
use cowboy_autoplay::tactics::ReasonCode;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio::time::Instant;

struct FakeApi {
    snapshot: Mutex<Value>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    game_fetches: AtomicUsize,
    accepted: Mutex<Vec<CommandRequest>>,
    /// When set, every attempt after the first waits for `release_retry`
    hold_retries: AtomicBool,
    release_retry: Notify,
}

impl FakeApi {
    fn new(snapshot: Value) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(snapshot),
            failures_left: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            game_fetches: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
            hold_retries: AtomicBool::new(false),
            release_retry: Notify::new(),
        })
    }

    fn accepted(&self) -> Vec<CommandRequest> {
        self.accepted.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn fetch_game(&self, _game_id: &str) -> Result<GameInfo> {
        self.game_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(GameInfo::from_value(json!({
            "game_id": "g-1",
            "status": "RUNNING",
            "state": {"players": [
                {"player_name": "A", "player_id": "p-a"},
                {"player_name": "B", "player_id": "p-b"}
            ]}
        })))
    }

    async fn fetch_snapshot(&self, _game_id: &str, _from_turn_no: TurnNo) -> Result<Snapshot> {
        Ok(Snapshot::from_value(self.snapshot.lock().unwrap().clone()))
    }

    async fn submit_command(&self, _game_id: &str, command: &CommandRequest) -> Result<SubmitReceipt> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt > 0 && self.hold_retries.load(Ordering::SeqCst) {
            self.release_retry.notified().await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ControllerError::Api {
                status: 503,
                body: "web service unavailable".into(),
            });
        }
        self.accepted.lock().unwrap().push(command.clone());
        Ok(SubmitReceipt {
            accepted: true,
            command_id: format!("cmd-{}", attempt),
            queued_at: Some("2026-01-01T00:00:00Z".into()),
        })
    }
}

fn game_snapshot(turn_no: u64, current: &str, status: &str) -> Value {
    json!({
        "game_id": "g-1",
        "status": status,
        "turn_no": turn_no,
        "round_no": 1,
        "current_player_id": current,
        "state": {
            "map": {"rows": 3, "cols": 3, "cells": [[0, 0, 0], [0, 0, 0], [0, 0, 0]]},
            "players": [
                {"player_name": "A", "player_id": "p-a", "hp": 10, "row": 1, "col": 0, "shield": "left", "alive": true},
                {"player_name": "B", "player_id": "p-b", "hp": 10, "row": 0, "col": 1, "shield": "up", "alive": true}
            ]
        }
    })
}

fn test_config() -> ControllerConfig {
    ControllerConfig {
        base_url: "http://127.0.0.1:9".into(),
        autoplay_on_bind: false,
        autoplay_wait_timeout_secs: 1,
        turn_recheck_interval_ms: 50,
        duplicate_turn_delay_ms: 20,
        submit_retry_delay_ms: 50,
        reconnect_base_delay_ms: 60_000,
        reconnect_max_delay_ms: 60_000,
        poll_fallback: false,
        ..ControllerConfig::default()
    }
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn push(controller: &Controller, snapshot: Value) {
    controller
        .session()
        .expect("bound")
        .store()
        .update(Snapshot::from_value(snapshot));
}

#[tokio::test]
async fn test_autoplay_submits_once_per_turn() {
    let api = FakeApi::new(game_snapshot(3, "p-a", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());

    let report = controller.bind("g-1", " a ", Some(true)).await.unwrap();
    assert_eq!(report.binding.player_id, "p-a");
    assert!(report.autoplay.status.enabled);

    eventually("first submission", || api.accepted().len() == 1).await;

    // Redundant pulses for the same turn must not resubmit
    for _ in 0..5 {
        push(&controller, game_snapshot(3, "p-a", "RUNNING"));
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(api.accepted().len(), 1);

    let first = &api.accepted()[0];
    assert_eq!(first.turn_no, 3);
    assert_eq!(first.player_id, "p-a");
    assert_eq!(first.action.command_type, CommandType::Shoot);
    assert_eq!(first.action.direction, Some(Direction::Right));

    let record = controller.autoplay_status().status.last_decision.unwrap();
    assert_eq!(record.turn_no, 3);
    assert_eq!(record.decision.reason, ReasonCode::TShapedShot);
    assert!(record.result.unwrap().accepted);
    assert!(record.error.is_none());

    // Opponent's turn, then ours again
    push(&controller, game_snapshot(4, "p-b", "RUNNING"));
    push(&controller, game_snapshot(5, "p-a", "RUNNING"));
    eventually("second submission", || api.accepted().len() == 2).await;
    assert_eq!(api.accepted()[1].turn_no, 5);

    controller.unbind().await;
    assert!(!controller.autoplay_status().status.running);
}

#[tokio::test]
async fn test_failed_submission_is_retried() {
    let api = FakeApi::new(game_snapshot(7, "p-a", "RUNNING"));
    api.failures_left.store(1, Ordering::SeqCst);
    api.hold_retries.store(true, Ordering::SeqCst);
    let mut controller = Controller::new(api.clone(), test_config());

    controller.bind("g-1", "A", Some(true)).await.unwrap();
    eventually("failure recorded", || {
        controller
            .autoplay_status()
            .status
            .last_decision
            .map_or(false, |r| r.error.is_some())
    })
    .await;

    let failed = controller.autoplay_status().status.last_decision.unwrap();
    assert_eq!(failed.turn_no, 7);
    assert!(failed.result.is_none());
    assert!(failed.error.unwrap().contains("503"));
    assert!(api.accepted().is_empty());

    api.release_retry.notify_one();
    eventually("retried submission", || api.accepted().len() == 1).await;

    assert_eq!(api.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(api.accepted()[0].turn_no, 7);
    let record = controller.autoplay_status().status.last_decision.unwrap();
    assert!(record.error.is_none());
    assert!(record.result.is_some());

    controller.unbind().await;
}

#[tokio::test]
async fn test_finish_stops_autoplay() {
    let api = FakeApi::new(game_snapshot(2, "p-b", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());
    controller.bind("g-1", "A", Some(true)).await.unwrap();

    eventually("loop waiting", || {
        controller.autoplay_status().status.phase == AutoplayPhase::Waiting
    })
    .await;

    push(&controller, game_snapshot(2, "p-b", "FINISHED"));
    eventually("loop exit", || !controller.autoplay_status().status.running).await;

    let status = controller.autoplay_status().status;
    assert!(!status.enabled);
    assert_eq!(status.phase, AutoplayPhase::Idle);
    assert!(api.accepted().is_empty());

    let err = controller.set_autoplay(true).await.unwrap_err();
    assert!(matches!(err, ControllerError::GameFinished(id) if id == "g-1"));

    controller.unbind().await;
}

#[tokio::test]
async fn test_disable_autoplay_joins_loop() {
    let api = FakeApi::new(game_snapshot(2, "p-b", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());
    controller.bind("g-1", "A", Some(true)).await.unwrap();
    assert!(controller.autoplay_status().status.enabled);

    let report = controller.set_autoplay(false).await.unwrap();
    assert!(!report.status.enabled);
    assert!(!report.status.running);

    // Our turn arrives while disabled: nothing is submitted
    push(&controller, game_snapshot(3, "p-a", "RUNNING"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(api.accepted().is_empty());

    controller.unbind().await;
}

#[tokio::test]
async fn test_bind_rejects_bad_players() {
    let api = FakeApi::new(game_snapshot(1, "p-a", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());

    let err = controller.bind("g-1", "E", None).await.unwrap_err();
    assert!(matches!(err, ControllerError::InvalidPlayerName(ref n) if n == "E"));
    assert_eq!(api.game_fetches.load(Ordering::SeqCst), 0);

    let err = controller.bind("g-1", "C", None).await.unwrap_err();
    match err {
        ControllerError::PlayerNotFound { name, available, .. } => {
            assert_eq!(name, "C");
            assert_eq!(available, vec!["A".to_string(), "B".to_string()]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(controller.session().is_none());
    assert!(!controller.session_info().bound);
}

#[tokio::test]
async fn test_manual_submit_validates_first() {
    let api = FakeApi::new(game_snapshot(4, "p-a", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());

    let err = controller.submit_action("move", Some("up"), None).await.unwrap_err();
    assert!(matches!(err, ControllerError::NoSession));

    controller.bind("g-1", "A", Some(false)).await.unwrap();

    let err = controller.submit_action("move", Some("sideways"), None).await.unwrap_err();
    assert!(matches!(err, ControllerError::InvalidCommand(_)));
    let err = controller.submit_action("speak", None, Some("  ")).await.unwrap_err();
    assert!(matches!(err, ControllerError::InvalidCommand(_)));
    assert_eq!(api.attempts.load(Ordering::SeqCst), 0);

    let receipt = controller.submit_action("SHIELD", Some("Down"), None).await.unwrap();
    assert!(receipt.accepted);
    let sent = api.accepted();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].turn_no, 4);
    assert_eq!(sent[0].action.command_type, CommandType::Shield);
    assert_eq!(sent[0].action.direction, Some(Direction::Down));

    controller.unbind().await;
}

#[tokio::test]
async fn test_manual_submit_needs_turn_number() {
    let mut snapshot = game_snapshot(4, "p-a", "RUNNING");
    snapshot.as_object_mut().unwrap().remove("turn_no");
    let api = FakeApi::new(snapshot);
    let mut controller = Controller::new(api.clone(), test_config());
    controller.bind("g-1", "A", Some(false)).await.unwrap();

    let err = controller.submit_action("shoot", Some("right"), None).await.unwrap_err();
    assert!(matches!(err, ControllerError::UnknownTurn));
    assert_eq!(api.attempts.load(Ordering::SeqCst), 0);

    controller.unbind().await;
}

#[tokio::test]
async fn test_wait_for_my_turn_outcomes() {
    let api = FakeApi::new(game_snapshot(1, "p-b", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());
    controller.bind("g-1", "A", Some(false)).await.unwrap();

    let outcome = controller.wait_for_my_turn(Duration::from_millis(100)).await.unwrap();
    assert_eq!(
        outcome,
        WaitOutcome::Timeout {
            current_player_id: Some("p-b".into())
        }
    );

    push(&controller, game_snapshot(2, "p-a", "RUNNING"));
    let outcome = controller.wait_for_my_turn(Duration::from_secs(1)).await.unwrap();
    assert_eq!(outcome, WaitOutcome::YourTurn { turn_no: Some(2) });

    push(&controller, game_snapshot(3, "p-a", "FINISHED"));
    let outcome = controller.wait_for_my_turn(Duration::from_secs(1)).await.unwrap();
    assert_eq!(outcome, WaitOutcome::GameFinished);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["status"], "game_finished");

    controller.unbind().await;
}

#[tokio::test]
async fn test_preview_does_not_submit() {
    let api = FakeApi::new(game_snapshot(6, "p-a", "RUNNING"));
    let mut controller = Controller::new(api.clone(), test_config());
    controller.bind("g-1", "A", Some(false)).await.unwrap();

    let preview = controller.explain_next_move().unwrap();
    assert_eq!(preview.decision_preview.label(), "shoot right");
    assert_eq!(preview.turn_no, Some(6));
    assert!(preview.is_my_turn);
    assert_eq!(api.attempts.load(Ordering::SeqCst), 0);

    let info = controller.session_info();
    assert!(info.bound);
    assert_eq!(info.turn_no, Some(6));
    assert!(info.recent_events.is_empty());

    controller.unbind().await;
    assert!(controller.session().is_none());
    assert!(matches!(controller.game_state(), Err(ControllerError::NoSession)));
}
