//! WebSocket handler for real-time rule updates

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use rule_engine::RuleEvent;
use serde::Serialize;

use crate::AppState;

/// WebSocket events sent to clients
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    Connected,
    RulesLoaded { count: usize },
    RuleCreated { rule_id: String, index: usize },
    RuleUpdated { rule_id: String, index: usize },
    RuleDeleted { rule_id: String, index: usize },
}

impl From<RuleEvent> for WsEvent {
    fn from(event: RuleEvent) -> Self {
        match event {
            RuleEvent::Loaded { count } => WsEvent::RulesLoaded { count },
            RuleEvent::Created { rule_id, index } => WsEvent::RuleCreated { rule_id, index },
            RuleEvent::Updated { rule_id, index } => WsEvent::RuleUpdated { rule_id, index },
            RuleEvent::Deleted { rule_id, index } => WsEvent::RuleDeleted { rule_id, index },
        }
    }
}

fn to_message(event: &WsEvent) -> Option<Message> {
    serde_json::to_string(event).ok().map(Message::Text)
}

/// Handle a WebSocket connection
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Send connected message
    let Some(connected_msg) = to_message(&WsEvent::Connected) else {
        return;
    };
    if sender.send(connected_msg).await.is_err() {
        return;
    }

    // Forward store events to the client
    let mut event_rx = state.store.subscribe();
    let send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let Some(msg) = to_message(&WsEvent::from(event)) else {
                        continue;
                    };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    // Skip missed messages
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Drain incoming messages until the client goes away
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = WsEvent::from(RuleEvent::Deleted {
            rule_id: "abc".to_string(),
            index: 2,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "rule_deleted", "rule_id": "abc", "index": 2 })
        );
    }
}
