//! Autoplay control loop
//!
//! wait for turn -> skip a turn already submitted -> decide -> submit ->
//! record, until the game finishes or the loop is stopped. A failed
//! submission leaves the turn unmarked so the next cycle retries it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{Action, CommandRequest, GameApi, SubmitReceipt};
use crate::core::config::ControllerConfig;
use crate::core::types::TurnNo;
use crate::session::{Binding, SnapshotStore};
use crate::tactics::engine::fallback_default;
use crate::tactics::{choose_action, Decision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayPhase {
    #[default]
    Idle,
    Waiting,
    Deciding,
    Submitting,
}

/// Outcome of the latest submission attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub turn_no: TurnNo,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmitReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot of the loop for status queries
#[derive(Debug, Clone, Serialize)]
pub struct AutoplayStatus {
    pub enabled: bool,
    pub running: bool,
    pub phase: AutoplayPhase,
    pub wait_timeout_seconds: u64,
    pub last_decision: Option<DecisionRecord>,
}

/// Everything one loop run needs
#[derive(Clone)]
pub struct LoopContext {
    pub api: Arc<dyn GameApi>,
    pub binding: Binding,
    pub store: Arc<SnapshotStore>,
    pub wait_timeout: Duration,
    pub duplicate_turn_delay: Duration,
    pub submit_retry_delay: Duration,
}

impl LoopContext {
    pub fn new(
        api: Arc<dyn GameApi>,
        binding: Binding,
        store: Arc<SnapshotStore>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            api,
            binding,
            store,
            wait_timeout: config.autoplay_wait_timeout(),
            duplicate_turn_delay: config.duplicate_turn_delay(),
            submit_retry_delay: config.submit_retry_delay(),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    enabled: AtomicBool,
    phase: Mutex<AutoplayPhase>,
    last_decision: Mutex<Option<DecisionRecord>>,
}

impl Shared {
    fn set_phase(&self, phase: AutoplayPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn phase(&self) -> AutoplayPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, record: Option<DecisionRecord>) {
        *self.last_decision.lock().unwrap_or_else(PoisonError::into_inner) = record;
    }

    fn last_decision(&self) -> Option<DecisionRecord> {
        self.last_decision
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Handle to the background control loop
pub struct Autoplay {
    shared: Arc<Shared>,
    wait_timeout: Duration,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Autoplay {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            wait_timeout,
            stop_tx: None,
            task: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Enable and spawn the loop unless one is already running
    pub fn start(&mut self, ctx: LoopContext) {
        self.shared.enabled.store(true, Ordering::SeqCst);
        if self.is_running() {
            return;
        }
        self.shared.record(None);
        self.wait_timeout = ctx.wait_timeout;

        let (stop_tx, stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);
        self.task = Some(tokio::spawn(run_loop(ctx, Arc::clone(&self.shared), stop_rx)));
    }

    /// Disable, cancel and join the loop
    pub async fn stop(&mut self) {
        self.shared.enabled.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "autoplay task ended abnormally");
            }
        }
        self.shared.set_phase(AutoplayPhase::Idle);
    }

    pub fn last_decision(&self) -> Option<DecisionRecord> {
        self.shared.last_decision()
    }

    pub fn status(&self) -> AutoplayStatus {
        AutoplayStatus {
            enabled: self.is_enabled(),
            running: self.is_running(),
            phase: self.shared.phase(),
            wait_timeout_seconds: self.wait_timeout.as_secs(),
            last_decision: self.last_decision(),
        }
    }
}

/// Sleep unless stopped first; `true` means stop
async fn pause(stop_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = stop_rx.changed() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

fn decide_for(store: &SnapshotStore) -> Decision {
    match store.snapshot() {
        Some(snapshot) => choose_action(&snapshot, store.player_id()),
        None => fallback_default("No snapshot available yet.", None),
    }
}

async fn run_loop(ctx: LoopContext, shared: Arc<Shared>, mut stop_rx: watch::Receiver<bool>) {
    let store = &ctx.store;
    let game_id = ctx.binding.game_id.as_str();
    let mut last_submitted_turn: Option<TurnNo> = None;

    tracing::info!(game_id, player = %ctx.binding.player_name, "autoplay loop started");

    loop {
        if *stop_rx.borrow() || !shared.enabled.load(Ordering::SeqCst) {
            break;
        }
        if store.is_finished() {
            break;
        }

        shared.set_phase(AutoplayPhase::Waiting);
        let got_turn = tokio::select! {
            _ = stop_rx.changed() => break,
            got = store.wait_for_turn(ctx.wait_timeout) => got,
        };
        if store.is_finished() {
            break;
        }
        if !got_turn || !store.is_my_turn() {
            continue;
        }

        let turn_no = match store.turn_no() {
            Some(turn_no) if last_submitted_turn != Some(turn_no) => turn_no,
            _ => {
                if pause(&mut stop_rx, ctx.duplicate_turn_delay).await {
                    break;
                }
                continue;
            }
        };

        shared.set_phase(AutoplayPhase::Deciding);
        let decision = decide_for(store);
        tracing::info!(game_id, turn_no, action = %decision.label(), reason = decision.reason.as_str(), "autoplay decision");

        shared.set_phase(AutoplayPhase::Submitting);
        let command = CommandRequest::new(ctx.binding.player_id.clone(), turn_no, Action::from(&decision));
        let submitted = tokio::select! {
            _ = stop_rx.changed() => break,
            result = ctx.api.submit_command(game_id, &command) => result,
        };

        match submitted {
            Ok(receipt) => {
                last_submitted_turn = Some(turn_no);
                shared.record(Some(DecisionRecord {
                    turn_no,
                    decision,
                    result: Some(receipt),
                    error: None,
                }));
            }
            Err(e) => {
                tracing::warn!(game_id, turn_no, error = %e, "autoplay submission failed");
                shared.record(Some(DecisionRecord {
                    turn_no,
                    decision,
                    result: None,
                    error: Some(e.to_string()),
                }));
                if pause(&mut stop_rx, ctx.submit_retry_delay).await {
                    break;
                }
            }
        }
    }

    shared.set_phase(AutoplayPhase::Idle);
    if store.is_finished() {
        shared.enabled.store(false, Ordering::SeqCst);
    }
    tracing::info!(game_id, player = %ctx.binding.player_name, "autoplay loop stopped");
}
