use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

use crate::models::chat::{ChatRequest, StreamEvent};
use crate::services::ChatService;
use crate::utils::error::ApiError;

/// `POST /api/v1/chat` — one conversation turn. `stream: false` returns the
/// reply and updated state as one JSON body; `stream: true` returns an SSE
/// stream with `data: <json>` frames and a literal `data: [DONE]` sentinel.
pub async fn chat_handler(
    Extension(chat_service): Extension<Arc<ChatService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if !request.stream {
        let response = chat_service.respond(&request).await?;
        return Ok(Json(response).into_response());
    }

    let events = chat_service.respond_stream(&request).await?;

    let sse_stream = events.map(|event| {
        let frame = match &event {
            StreamEvent::Done => Event::default().data("[DONE]"),
            other => Event::default().data(other.to_json().unwrap_or_default()),
        };
        Ok::<_, Infallible>(frame)
    });

    Ok(Sse::new(sse_stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}
