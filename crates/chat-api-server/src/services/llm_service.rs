use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::models::chat::ChatMessage;
use crate::services::chat_service::{LlmProvider, TokenStream};
use crate::services::conversation::params::CompletionOptions;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(flatten)]
    options: &'a CompletionOptions,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Deserialize)]
struct ChoiceChunk {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible chat completion service.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    async fn post_completion(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        stream: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let request = ChatCompletionRequest {
            messages,
            stream,
            options,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to call LLM API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::LlmError(format!(
                "LLM API error: {} - {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for LlmService {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ApiError> {
        debug!(
            "Chat completion: {} messages, model={}",
            messages.len(),
            options.model
        );

        let response = self.post_completion(messages, options, false).await?;

        #[derive(Deserialize)]
        struct ChatCompletionResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            content: String,
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::LlmError(format!("Failed to parse LLM response: {}", e)))?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ApiError::LlmError("No choices returned from LLM".to_string()))
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<TokenStream, ApiError> {
        debug!(
            "Chat stream: {} messages, model={}",
            messages.len(),
            options.model
        );

        let response = self.post_completion(messages, options, true).await?;
        let mut byte_stream = Box::pin(response.bytes_stream());

        // Parse the upstream SSE framing. Lines (and multi-byte UTF-8
        // sequences) can be split across network chunks, so the buffer holds
        // raw bytes and only complete lines are decoded.
        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = byte_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        let (tokens, done) = drain_sse_lines(&mut buffer);
                        for token in tokens {
                            yield Ok(token);
                        }
                        if done {
                            return;
                        }
                    }
                    Err(e) => {
                        yield Err(ApiError::LlmError(format!("Stream error: {}", e)));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Consume complete `data: {...}` lines from the buffer, returning extracted
/// token fragments and whether the `[DONE]` sentinel was seen. Any trailing
/// partial line stays in the buffer as raw bytes, so a UTF-8 sequence split
/// across chunks is reassembled before decoding.
fn drain_sse_lines(buffer: &mut Vec<u8>) -> (Vec<String>, bool) {
    let mut tokens = Vec::new();

    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();

        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };

        if payload == "[DONE]" {
            return (tokens, true);
        }

        if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(payload) {
            if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.clone()) {
                if !content.is_empty() {
                    tokens.push(content);
                }
            }
        }
    }

    (tokens, false)
}
