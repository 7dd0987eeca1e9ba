//! Websocket API.
//!
//! Clients send JSON messages carrying an `id` and a `type`. `ping` and
//! `subscribe_events` are answered here; every other type is dispatched to
//! the host's command registry, which is where the observer's
//! `view_event/request_routes` command lives.

use crate::server::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use view_event::{LocalHost, ViewEventError};

const OUTBOUND_CAPACITY: usize = 256;

pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    info!("Websocket connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Value>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(Message::Text(message.to_string())).await.is_err() {
                break;
            }
        }
    });

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Websocket {} receive error: {}", connection_id, e);
                break;
            }
        };

        let message: Value = match serde_json::from_str(&text) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                let reply = error_reply(Value::Null, "invalid_format", "Message must be a JSON object");
                if tx.send(reply).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let reply = if message.get("type").and_then(Value::as_str) == Some("subscribe_events") {
            let filter = message
                .get("event_type")
                .and_then(Value::as_str)
                .map(str::to_string);
            forwarders.push(spawn_forwarder(
                state.host.subscribe(),
                id.clone(),
                filter,
                tx.clone(),
            ));
            success_reply(id, Value::Null)
        } else {
            command_reply(&state.host, &message)
        };

        if tx.send(reply).await.is_err() {
            break;
        }
    }

    for forwarder in forwarders {
        forwarder.abort();
    }
    drop(tx);
    let _ = writer.await;

    info!("Websocket disconnected: {}", connection_id);
}

/// Answer a single non-subscription message.
pub(crate) fn command_reply(host: &LocalHost, message: &Value) -> Value {
    let id = message.get("id").cloned().unwrap_or(Value::Null);

    if message.get("type").and_then(Value::as_str) == Some("ping") {
        return json!({ "id": id, "type": "pong" });
    }

    match host.dispatch_command(message) {
        Ok(result) => success_reply(id, result),
        Err(e) => {
            let code = match &e {
                ViewEventError::UnknownCommand { .. } => "unknown_command",
                ViewEventError::Validation { .. } | ViewEventError::Json { .. } => "invalid_format",
                _ => "command_failed",
            };
            warn!("Websocket command failed: {}", e);
            error_reply(id, code, &e.to_string())
        }
    }
}

fn spawn_forwarder(
    mut events: broadcast::Receiver<view_event::Event>,
    id: Value,
    filter: Option<String>,
    tx: mpsc::Sender<Value>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if filter.as_deref().is_some_and(|f| f != event.event_type) {
                        continue;
                    }
                    let message = json!({ "id": id, "type": "event", "event": event });
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscription {} lagged, skipped {} events", id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn success_reply(id: Value, result: Value) -> Value {
    json!({ "id": id, "type": "result", "success": true, "result": result })
}

fn error_reply(id: Value, code: &str, message: &str) -> Value {
    json!({
        "id": id,
        "type": "result",
        "success": false,
        "error": { "code": code, "message": message },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use view_event::{EventBus, EventData, ObserverConfig, RouteObserver};

    fn host() -> Arc<LocalHost> {
        let host = Arc::new(LocalHost::new());
        RouteObserver::install(&host, ObserverConfig::default()).unwrap();
        host
    }

    #[test]
    fn test_ping() {
        let reply = command_reply(&host(), &json!({"id": 1, "type": "ping"}));
        assert_eq!(reply, json!({"id": 1, "type": "pong"}));
    }

    #[test]
    fn test_request_routes_command() {
        let reply = command_reply(&host(), &json!({"id": 2, "type": "view_event/request_routes"}));
        assert_eq!(reply["success"], json!(true));
        assert_eq!(reply["result"], json!({"replayed": 0}));
    }

    #[test]
    fn test_command_errors() {
        let host = host();

        let reply = command_reply(&host, &json!({"id": 3, "type": "no/such"}));
        assert_eq!(reply["success"], json!(false));
        assert_eq!(reply["error"]["code"], json!("unknown_command"));

        let reply = command_reply(&host, &json!({"type": "view_event/request_routes"}));
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], json!("invalid_format"));
    }

    #[tokio::test]
    async fn test_forwarder_filters_by_event_type() {
        let host = host();
        let (tx, mut rx) = mpsc::channel(8);
        let forwarder = spawn_forwarder(
            host.subscribe(),
            json!(7),
            Some("wanted".to_string()),
            tx,
        );

        host.fire("ignored", EventData::new());
        host.fire("wanted", EventData::new());

        let message = rx.recv().await.unwrap();
        assert_eq!(message["id"], json!(7));
        assert_eq!(message["type"], json!("event"));
        assert_eq!(message["event"]["event_type"], json!("wanted"));

        forwarder.abort();
    }
}
