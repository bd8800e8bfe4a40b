use futures::StreamExt;
use tracing::{debug, warn};

use crate::models::chat::{ChatMessage, StreamEvent, TurnMetadata};
use crate::services::chat_service::{EventStream, TokenStream};

/// Drives one streaming turn: relays tokens from the completion service and
/// closes with the terminal metadata handoff.
///
/// Event contract, identical over both transports:
/// - every non-empty token is forwarded immediately and accumulated;
/// - on normal exhaustion, exactly one `Metadata` (updated summary + history
///   ending with the new assistant message) is emitted, then `Done`;
/// - a mid-stream failure emits a single `Error` and ends the stream with no
///   `Metadata` — the caller retries from its last known-good state.
///
/// Cancellation is drop-driven: the transport dropping this stream drops the
/// token stream with it, so no further tokens are requested and the partial
/// response is discarded.
pub fn stream_turn(
    mut tokens: TokenStream,
    updated_summary: Option<String>,
    active_history: Vec<ChatMessage>,
) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut full_response = String::new();

        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) => {
                    if token.is_empty() {
                        continue;
                    }
                    full_response.push_str(&token);
                    yield StreamEvent::Token(token);
                }
                Err(e) => {
                    warn!("Token stream failed mid-turn: {}", e);
                    yield StreamEvent::Error(e.to_string());
                    return;
                }
            }
        }

        debug!("Stream complete, {} chars accumulated", full_response.len());

        let mut updated_history = active_history;
        updated_history.push(ChatMessage::assistant(full_response));

        yield StreamEvent::Metadata(TurnMetadata {
            updated_summary,
            updated_history,
        });
        yield StreamEvent::Done;
    })
}
