use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::chat::{
    ChatMessage, ChatRequest, ChatResponse, RetrievalSelector, StreamEvent,
};
use crate::utils::error::ApiError;

use super::conversation::params::{CompletionOptions, ParameterResolver};
use super::conversation::prompt::PromptAssembler;
use super::conversation::stream::stream_turn;
use super::conversation::summarizer::Summarizer;

/// Lazy token fragments from the completion service. Finite, not restartable.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Transport-agnostic event sequence for one streaming turn.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Trait for the completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ApiError>;

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<TokenStream, ApiError>;
}

/// Trait for the vector index query service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// `domain = None` queries across every domain.
    async fn query(
        &self,
        domain: Option<String>,
        text: &str,
        limit: usize,
    ) -> Result<Vec<String>, ApiError>;
}

/// Per-turn pipeline: compaction, retrieval, prompt assembly, parameter
/// resolution, generation. Holds no mutable state between requests — the
/// conversation travels inside the request and response payloads.
pub struct ChatService {
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<dyn RetrievalProvider>,
    summarizer: Summarizer,
    assembler: PromptAssembler,
    resolver: ParameterResolver,
    retrieval_top_k: usize,
}

struct PreparedTurn {
    updated_summary: Option<String>,
    active_history: Vec<ChatMessage>,
    llm_messages: Vec<ChatMessage>,
    options: CompletionOptions,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<dyn RetrievalProvider>,
        settings: &Settings,
    ) -> Self {
        let resolver = ParameterResolver::new(
            settings.llm.default_model.clone(),
            settings.llm.default_temperature,
        );
        let summarizer = Summarizer::new(
            llm.clone(),
            resolver.defaults(),
            settings.summarization.threshold,
            settings.summarization.retention,
        );

        Self {
            llm,
            retriever,
            summarizer,
            assembler: PromptAssembler::new(settings.prompts.system_prompt.clone()),
            resolver,
            retrieval_top_k: settings.retrieval.top_k,
        }
    }

    /// Non-streaming turn: one completion call, state returned inline.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let turn = self.prepare_turn(request).await?;

        let content = self.llm.complete(&turn.llm_messages, &turn.options).await?;

        let mut updated_history = turn.active_history;
        updated_history.push(ChatMessage::assistant(&content));

        Ok(ChatResponse {
            response: content,
            updated_summary: turn.updated_summary,
            updated_history,
        })
    }

    /// Streaming turn: returns the coordinator's event sequence. Dropping the
    /// returned stream (client disconnect) drops the underlying completion
    /// stream, so no further tokens are requested.
    pub async fn respond_stream(&self, request: &ChatRequest) -> Result<EventStream, ApiError> {
        let turn = self.prepare_turn(request).await?;

        let tokens = self
            .llm
            .complete_stream(&turn.llm_messages, &turn.options)
            .await?;

        Ok(stream_turn(tokens, turn.updated_summary, turn.active_history))
    }

    /// Shared pipeline prefix. Phases run strictly in sequence: compaction
    /// fully completes before retrieval, retrieval before assembly.
    async fn prepare_turn(&self, request: &ChatRequest) -> Result<PreparedTurn, ApiError> {
        if request.message.trim().is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }

        info!(
            "Chat turn: history_len={}, has_summary={}, domain={:?}, stream={}",
            request.messages.len(),
            request.summary.is_some(),
            request.domain,
            request.stream,
        );

        let (updated_summary, active_history) = self
            .summarizer
            .compact(
                request.summary.clone(),
                request.messages.clone(),
                ChatMessage::user(&request.message),
            )
            .await?;

        let snippets = self
            .retrieve_snippets(request.retrieval_selector(), &request.message)
            .await;

        let llm_messages = self.assembler.assemble(
            updated_summary.as_deref(),
            &snippets,
            &active_history,
            request.system_prompt.as_deref(),
        );

        let options = self.resolver.resolve(request);

        Ok(PreparedTurn {
            updated_summary,
            active_history,
            llm_messages,
            options,
        })
    }

    /// Retrieval is never fatal to the turn: any collaborator failure
    /// degrades to an empty snippet list.
    async fn retrieve_snippets(&self, selector: RetrievalSelector, query: &str) -> Vec<String> {
        let domain = match selector {
            RetrievalSelector::None => return Vec::new(),
            RetrievalSelector::All => None,
            RetrievalSelector::Domain(d) => Some(d),
        };

        match self
            .retriever
            .query(domain, query, self.retrieval_top_k)
            .await
        {
            Ok(snippets) => {
                debug!("Retrieved {} snippets", snippets.len());
                snippets
            }
            Err(e) => {
                warn!("Retrieval failed, continuing without context: {}", e);
                Vec::new()
            }
        }
    }
}
