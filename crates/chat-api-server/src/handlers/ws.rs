use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::Extension,
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::chat::{ChatRequest, StreamEvent};
use crate::services::ChatService;

/// `GET /api/v1/ws/chat` — bidirectional transport. Each inbound text frame
/// is one complete turn payload; the reply is the same event vocabulary as
/// SSE (`{"content"}` tokens, terminal `{"metadata"}`, `{"error"}` on
/// failure). After a turn the session awaits a fresh request or close — this
/// is not a multi-turn protocol channel, state still travels in the payloads.
pub async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    Extension(chat_service): Extension<Arc<ChatService>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, chat_service))
}

async fn handle_socket(mut socket: WebSocket, chat_service: Arc<ChatService>) {
    info!("WebSocket chat session opened");

    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let request = match parse_request(&text) {
            Ok(request) => request,
            Err(frame) => {
                if send_event(&mut socket, &frame).await.is_err() {
                    return;
                }
                continue;
            }
        };

        let mut events = match chat_service.respond_stream(&request).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Turn failed before streaming started: {}", e);
                let frame = StreamEvent::Error(e.to_string());
                if send_event(&mut socket, &frame).await.is_err() {
                    return;
                }
                continue;
            }
        };

        while let Some(event) = events.next().await {
            if send_event(&mut socket, &event).await.is_err() {
                // Client vanished mid-stream: dropping `events` drops the
                // completion stream, so generation stops here.
                debug!("Client disconnected mid-stream, discarding turn");
                return;
            }
        }
    }

    info!("WebSocket chat session closed");
}

/// Malformed payloads do not kill the session; they come back as an error
/// frame and the connection stays open for the next attempt.
fn parse_request(text: &str) -> Result<ChatRequest, StreamEvent> {
    serde_json::from_str(text)
        .map_err(|e| StreamEvent::Error(format!("Invalid request payload: {}", e)))
}

/// `Done` carries no frame on this transport — the terminal metadata message
/// already ends the turn.
async fn send_event(socket: &mut WebSocket, event: &StreamEvent) -> Result<(), axum::Error> {
    let Some(json) = event.to_json() else {
        return Ok(());
    };
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_becomes_error_frame() {
        let frame = parse_request("{not json").unwrap_err();
        let json = frame.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let error = value["error"].as_str().unwrap();
        assert!(error.starts_with("Invalid request payload:"));
    }

    #[test]
    fn payload_with_wrong_types_becomes_error_frame() {
        let frame = parse_request(r#"{"message": 42}"#).unwrap_err();
        assert!(matches!(frame, StreamEvent::Error(_)));
    }

    #[test]
    fn valid_payload_parses() {
        let request =
            parse_request(r#"{"message": "hello", "messages": [], "stream": true}"#).unwrap();
        assert_eq!(request.message, "hello");
        assert!(request.stream);
        assert!(request.messages.is_empty());
    }
}
