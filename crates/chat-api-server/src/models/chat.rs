use serde::{Deserialize, Serialize};

// ===== CONVERSATION MODEL =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn entry. Ordering within a history is chronological and is the
/// literal prompt order sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

// ===== REQUEST MODELS =====

/// Inbound turn payload. Both transports (HTTP POST body and one WebSocket
/// text frame) carry exactly this shape. The client owns the conversation
/// state: `messages` + `summary` come in with every request and the updated
/// pair goes back out at the end of the turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn retrieval_selector(&self) -> RetrievalSelector {
        match self.domain.as_deref() {
            None => RetrievalSelector::None,
            Some(d) if d.eq_ignore_ascii_case("all") => RetrievalSelector::All,
            Some(d) => RetrievalSelector::Domain(d.to_string()),
        }
    }
}

/// Which partition of the retrieval index to query, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalSelector {
    /// Skip retrieval entirely (the index service is never called).
    None,
    /// Query across every domain.
    All,
    /// Query filtered to one named domain.
    Domain(String),
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub updated_summary: Option<String>,
    pub updated_history: Vec<ChatMessage>,
}

/// Terminal payload of a successful streaming turn: the new client-carried
/// conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub updated_summary: Option<String>,
    pub updated_history: Vec<ChatMessage>,
}

/// Wire-level streaming event vocabulary, identical over both transports.
/// Exactly one `Metadata` per successful stream, always last before `Done`;
/// `Error` terminates the stream and suppresses `Metadata`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Metadata(TurnMetadata),
    Error(String),
    Done,
}

impl StreamEvent {
    /// JSON body for the event, shared by the SSE and WebSocket framings.
    /// `Done` has no body: SSE sends the literal `[DONE]` sentinel and the
    /// socket transport simply ends the turn after metadata.
    pub fn to_json(&self) -> Option<String> {
        let value = match self {
            StreamEvent::Token(content) => serde_json::json!({ "content": content }),
            StreamEvent::Metadata(meta) => serde_json::json!({ "metadata": meta }),
            StreamEvent::Error(message) => serde_json::json!({ "error": message }),
            StreamEvent::Done => return None,
        };
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let parsed: ChatMessage = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(parsed.role, Role::Assistant);
    }

    #[test]
    fn request_defaults_apply() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"Hello"}"#).unwrap();
        assert_eq!(req.message, "Hello");
        assert!(req.messages.is_empty());
        assert!(req.summary.is_none());
        assert!(!req.stream);
        assert!(req.temperature.is_none());
    }

    #[test]
    fn selector_parsing() {
        let mut req: ChatRequest = serde_json::from_str(r#"{"message":"q"}"#).unwrap();
        assert_eq!(req.retrieval_selector(), RetrievalSelector::None);

        req.domain = Some("all".to_string());
        assert_eq!(req.retrieval_selector(), RetrievalSelector::All);

        req.domain = Some("ALL".to_string());
        assert_eq!(req.retrieval_selector(), RetrievalSelector::All);

        req.domain = Some("finance".to_string());
        assert_eq!(
            req.retrieval_selector(),
            RetrievalSelector::Domain("finance".to_string())
        );
    }

    #[test]
    fn stream_event_json_shapes() {
        let token = StreamEvent::Token("Hel".to_string());
        assert_eq!(token.to_json().unwrap(), r#"{"content":"Hel"}"#);

        let err = StreamEvent::Error("boom".to_string());
        assert_eq!(err.to_json().unwrap(), r#"{"error":"boom"}"#);

        let meta = StreamEvent::Metadata(TurnMetadata {
            updated_summary: None,
            updated_history: vec![ChatMessage::user("hi")],
        });
        let json = meta.to_json().unwrap();
        assert!(json.starts_with(r#"{"metadata":"#));
        assert!(json.contains(r#""updated_summary":null"#));

        assert!(StreamEvent::Done.to_json().is_none());
    }
}
