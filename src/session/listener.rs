//! Push stream listener
//!
//! A background task holds a WebSocket subscription to one game and feeds
//! every snapshot it carries into the `SnapshotStore`. Connection problems
//! never leave this module: they show up only as the store's connectivity
//! flag while the task reconnects with capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api::{GameApi, FROM_TURN_START};
use crate::core::config::ControllerConfig;
use crate::game::Snapshot;
use crate::session::events::{EventRecord, RecentEvents};
use crate::session::store::SnapshotStore;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const GAME_FINISHED: &str = "GAME_FINISHED";

/// What an inbound message means for the store
#[derive(Debug)]
pub enum StreamEvent {
    /// Terminal event; status is forced to FINISHED
    GameFinished(Option<Snapshot>),
    SnapshotUpdate(Snapshot),
    /// Nothing usable for the store
    Ignored,
}

/// A parsed and classified stream message
#[derive(Debug)]
pub struct Inbound {
    pub event_type: String,
    pub event: StreamEvent,
    pub record: Option<EventRecord>,
}

/// Parse one text frame. Only invalid JSON is an error.
pub fn classify(raw: &str) -> Result<Inbound, serde_json::Error> {
    let message: Value = serde_json::from_str(raw)?;
    let event_type = message
        .get("event_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let snapshot = message
        .get("snapshot")
        .filter(|s| s.as_object().map_or(false, |o| !o.is_empty()))
        .cloned()
        .map(Snapshot::from_value);

    let event = if event_type == GAME_FINISHED {
        StreamEvent::GameFinished(snapshot)
    } else if let Some(snapshot) = snapshot {
        StreamEvent::SnapshotUpdate(snapshot)
    } else {
        StreamEvent::Ignored
    };
    let record = EventRecord::from_message(&event_type, &message);

    Ok(Inbound {
        event_type,
        event,
        record,
    })
}

/// Push a classified event into the store
pub fn apply(store: &SnapshotStore, event: StreamEvent) {
    match event {
        StreamEvent::GameFinished(snapshot) => {
            tracing::info!("game finished");
            store.finish(snapshot);
        }
        StreamEvent::SnapshotUpdate(snapshot) => {
            tracing::debug!(turn_no = ?snapshot.turn_no, "snapshot updated");
            store.update(snapshot);
        }
        StreamEvent::Ignored => {}
    }
}

/// Exponential reconnect delay
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// Delay to use now; the following one doubles, up to the cap
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

struct ListenerContext {
    url: String,
    game_id: String,
    store: Arc<SnapshotStore>,
    events: Arc<RecentEvents>,
    poller: Option<Arc<dyn GameApi>>,
    backoff: Backoff,
}

enum StreamExit {
    Stopped,
    Disconnected(String),
}

/// Owns the background stream task for one session
pub struct StreamListener {
    context: Option<ListenerContext>,
    store: Arc<SnapshotStore>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl StreamListener {
    /// `poller` enables one HTTP snapshot fetch per failed reconnect cycle
    pub fn new(
        url: impl Into<String>,
        game_id: impl Into<String>,
        store: Arc<SnapshotStore>,
        events: Arc<RecentEvents>,
        poller: Option<Arc<dyn GameApi>>,
        config: &ControllerConfig,
    ) -> Self {
        let context = ListenerContext {
            url: url.into(),
            game_id: game_id.into(),
            store: Arc::clone(&store),
            events,
            poller,
            backoff: Backoff::new(config.reconnect_base_delay(), config.reconnect_max_delay()),
        };
        Self {
            context: Some(context),
            store,
            stop_tx: None,
            task: None,
        }
    }

    /// Spawn the background task. A listener runs at most once.
    pub fn start(&mut self) {
        let Some(context) = self.context.take() else {
            tracing::warn!("stream listener already started");
            return;
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);
        self.task = Some(tokio::spawn(listen_loop(context, stop_rx)));
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Request cancellation and wait for the task to exit
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "stream listener task ended abnormally");
            }
        }
        self.store.set_connected(false);
    }
}

async fn listen_loop(mut ctx: ListenerContext, mut stop_rx: watch::Receiver<bool>) {
    tracing::info!(game_id = %ctx.game_id, url = %ctx.url, "stream listener started");

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let connected = tokio::select! {
            _ = stop_rx.changed() => break,
            result = connect_async(ctx.url.as_str()) => result,
        };

        match connected {
            Ok((stream, _)) => {
                ctx.store.set_connected(true);
                ctx.backoff.reset();
                tracing::info!(game_id = %ctx.game_id, "stream connected");

                let exit = read_stream(&ctx, stream, &mut stop_rx).await;
                ctx.store.set_connected(false);
                match exit {
                    StreamExit::Stopped => break,
                    StreamExit::Disconnected(reason) => {
                        tracing::warn!(game_id = %ctx.game_id, %reason, "stream disconnected");
                    }
                }
            }
            Err(e) => {
                ctx.store.set_connected(false);
                tracing::warn!(game_id = %ctx.game_id, error = %e, "stream connect failed");
            }
        }

        if let Some(api) = ctx.poller.clone() {
            let polled = tokio::select! {
                _ = stop_rx.changed() => break,
                result = api.fetch_snapshot(&ctx.game_id, FROM_TURN_START) => result,
            };
            match polled {
                Ok(snapshot) => {
                    tracing::debug!(turn_no = ?snapshot.turn_no, "polled snapshot");
                    ctx.store.update(snapshot);
                }
                Err(e) => tracing::warn!(game_id = %ctx.game_id, error = %e, "snapshot poll failed"),
            }
        }

        let delay = ctx.backoff.next_delay();
        tracing::info!(game_id = %ctx.game_id, backoff_ms = delay.as_millis() as u64, "reconnecting");
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    ctx.store.set_connected(false);
    tracing::info!(game_id = %ctx.game_id, "stream listener stopped");
}

async fn read_stream(
    ctx: &ListenerContext,
    mut stream: WsStream,
    stop_rx: &mut watch::Receiver<bool>,
) -> StreamExit {
    loop {
        let frame = tokio::select! {
            _ = stop_rx.changed() => {
                let _ = stream.close(None).await;
                return StreamExit::Stopped;
            }
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => handle_text(ctx, &text),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(ctx, text),
                Err(_) => tracing::warn!(len = bytes.len(), "non-UTF-8 stream frame dropped"),
            },
            Some(Ok(Message::Close(frame))) => {
                return StreamExit::Disconnected(format!("closed by server: {:?}", frame));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return StreamExit::Disconnected(e.to_string()),
            None => return StreamExit::Disconnected("stream ended".into()),
        }
    }
}

fn handle_text(ctx: &ListenerContext, text: &str) {
    let inbound = match classify(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            tracing::warn!(error = %e, message = %preview, "non-JSON stream message dropped");
            return;
        }
    };

    if let Some(record) = inbound.record {
        tracing::info!(event_type = %inbound.event_type, details = ?record.details, "game event");
        ctx.events.push(record);
    }
    apply(&ctx.store, inbound.event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameStatus;
    use serde_json::json;

    fn store() -> SnapshotStore {
        SnapshotStore::new("me", Duration::from_secs(1))
    }

    #[test]
    fn test_classify_snapshot_event() {
        let raw = json!({
            "event_type": "STEP_APPLIED",
            "player_id": "p-b",
            "snapshot": {"status": "RUNNING", "turn_no": 3, "current_player_id": "me"}
        })
        .to_string();
        let inbound = classify(&raw).unwrap();
        assert!(matches!(inbound.event, StreamEvent::SnapshotUpdate(ref s) if s.turn_no == Some(3)));
        assert!(inbound.record.is_some());
    }

    #[test]
    fn test_classify_finished_without_snapshot() {
        let inbound = classify(r#"{"event_type":"GAME_FINISHED"}"#).unwrap();
        assert!(matches!(inbound.event, StreamEvent::GameFinished(None)));

        let inbound = classify(r#"{"event_type":"GAME_FINISHED","snapshot":{}}"#).unwrap();
        assert!(matches!(inbound.event, StreamEvent::GameFinished(None)));
    }

    #[test]
    fn test_classify_ignores_plain_events() {
        let inbound = classify(r#"{"event_type":"CONNECTED"}"#).unwrap();
        assert!(matches!(inbound.event, StreamEvent::Ignored));
        assert!(inbound.record.is_none());

        let inbound = classify(r#"{"event_type":"SPEAK","speak_text":"hi"}"#).unwrap();
        assert!(matches!(inbound.event, StreamEvent::Ignored));
        assert_eq!(inbound.record.unwrap().details["speak_text"], "hi");
    }

    #[test]
    fn test_classify_rejects_non_json() {
        assert!(classify("not json").is_err());
    }

    #[test]
    fn test_apply_finished_forces_status() {
        let store = store();
        let inbound = classify(
            &json!({
                "event_type": "GAME_FINISHED",
                "snapshot": {"status": "RUNNING", "turn_no": 12, "current_player_id": "me"}
            })
            .to_string(),
        )
        .unwrap();
        apply(&store, inbound.event);
        assert_eq!(store.status(), GameStatus::Finished);
        assert_eq!(store.turn_no(), Some(12));
        assert!(!store.is_my_turn());
    }

    #[test]
    fn test_backoff_doubles_to_cap_and_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}
