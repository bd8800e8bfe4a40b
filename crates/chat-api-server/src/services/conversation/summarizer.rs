use std::sync::Arc;
use tracing::{debug, info};

use crate::models::chat::ChatMessage;
use crate::services::chat_service::LlmProvider;
use crate::utils::error::ApiError;

use super::params::CompletionOptions;

const SUMMARIZATION_INSTRUCTION: &str =
    "Summarize the following conversation concisely to retain key context for future interactions:";

/// Decides when accumulated history must be folded into the running summary
/// and produces the replacement summary via the completion service.
///
/// Policy: the current turn's user message is appended first and counts
/// toward the retained suffix, so a trigger turn keeps `retention - 1` prior
/// messages plus the new user message verbatim.
pub struct Summarizer {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    threshold: usize,
    retention: usize,
}

impl Summarizer {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        options: CompletionOptions,
        threshold: usize,
        retention: usize,
    ) -> Self {
        Self {
            llm,
            options,
            threshold,
            retention,
        }
    }

    /// Append the new user message, then compact if the resulting length
    /// strictly exceeds the threshold. Returns the (possibly replaced)
    /// summary and the active history to prompt with.
    pub async fn compact(
        &self,
        current_summary: Option<String>,
        mut history: Vec<ChatMessage>,
        new_user_message: ChatMessage,
    ) -> Result<(Option<String>, Vec<ChatMessage>), ApiError> {
        history.push(new_user_message);

        if history.len() <= self.threshold {
            return Ok((current_summary, history));
        }

        // Degenerate split: nothing would be retired, skip the call.
        if self.retention >= history.len() {
            return Ok((current_summary, history));
        }

        let split_at = history.len() - self.retention;
        let retained = history.split_off(split_at);
        let retired = history;

        info!(
            "Compacting history: {} messages retired, {} retained",
            retired.len(),
            retained.len()
        );

        let mut transcript = String::new();
        if let Some(summary) = &current_summary {
            transcript.push_str(summary);
            transcript.push('\n');
        }
        for message in &retired {
            transcript.push_str(message.role.as_str());
            transcript.push_str(": ");
            transcript.push_str(&message.content);
            transcript.push('\n');
        }

        let prompt = format!("{}\n\n{}", SUMMARIZATION_INSTRUCTION, transcript);
        debug!("Summarization prompt is {} chars", prompt.len());

        // Synchronous on the critical path: the turn does not proceed to
        // prompt assembly until the replacement summary is available. A
        // failure here fails the whole turn.
        let summary = self
            .llm
            .complete(&[ChatMessage::user(prompt)], &self.options)
            .await?;

        Ok((Some(summary), retained))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use crate::services::chat_service::MockLlmProvider;

    fn summarizer(llm: MockLlmProvider, threshold: usize, retention: usize) -> Summarizer {
        let options = CompletionOptions {
            model: "test-model".to_string(),
            temperature: 0.7,
            top_p: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
        };
        Summarizer::new(Arc::new(llm), options, threshold, retention)
    }

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n).map(|i| ChatMessage::user(format!("msg {}", i))).collect()
    }

    #[tokio::test]
    async fn at_threshold_no_compaction() {
        // 14 prior + 1 new = 15 == threshold: strict `>` must not fire.
        let mut llm = MockLlmProvider::new();
        llm.expect_complete().times(0);

        let (summary, active) = summarizer(llm, 15, 6)
            .compact(Some("prior".to_string()), history(14), ChatMessage::user("new"))
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("prior"));
        assert_eq!(active.len(), 15);
    }

    #[tokio::test]
    async fn one_past_threshold_triggers_compaction() {
        // 15 prior + 1 new = 16 > 15.
        let mut llm = MockLlmProvider::new();
        llm.expect_complete()
            .times(1)
            .returning(|_, _| Ok("new summary".to_string()));

        let (summary, active) = summarizer(llm, 15, 6)
            .compact(None, history(15), ChatMessage::user("new"))
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("new summary"));
        assert_eq!(active.len(), 6);
    }

    #[tokio::test]
    async fn compaction_retains_current_turn_message() {
        let mut llm = MockLlmProvider::new();
        llm.expect_complete().returning(|_, _| Ok("s".to_string()));

        let (_, active) = summarizer(llm, 15, 6)
            .compact(None, history(20), ChatMessage::user("current turn"))
            .await
            .unwrap();

        assert_eq!(active.len(), 6);
        assert_eq!(active.last().unwrap().content, "current turn");
        // The 5 retained prior messages are the most recent ones.
        assert_eq!(active[0].content, "msg 15");
    }

    #[tokio::test]
    async fn prior_summary_and_retired_lines_feed_the_prompt() {
        let mut llm = MockLlmProvider::new();
        llm.expect_complete()
            .withf(|messages, _| {
                let prompt = &messages[0].content;
                messages.len() == 1
                    && messages[0].role == Role::User
                    && prompt.starts_with("Summarize the following conversation")
                    && prompt.contains("Old Summary")
                    && prompt.contains("user: msg 0")
                    // Retained messages never appear in the prompt.
                    && !prompt.contains("msg 15")
            })
            .times(1)
            .returning(|_, _| Ok("fresh".to_string()));

        let (summary, _) = summarizer(llm, 15, 6)
            .compact(Some("Old Summary".to_string()), history(20), ChatMessage::user("go"))
            .await
            .unwrap();

        // Replaced outright, not appended.
        assert_eq!(summary.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn retention_at_least_history_length_skips_the_call() {
        // threshold 2, retention 10: trigger condition met (3 > 2) but the
        // compacted prefix would be empty.
        let mut llm = MockLlmProvider::new();
        llm.expect_complete().times(0);

        let (summary, active) = summarizer(llm, 2, 10)
            .compact(Some("prior".to_string()), history(2), ChatMessage::user("new"))
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("prior"));
        assert_eq!(active.len(), 3);
    }

    #[tokio::test]
    async fn summarization_failure_fails_the_turn() {
        let mut llm = MockLlmProvider::new();
        llm.expect_complete()
            .returning(|_, _| Err(ApiError::LlmError("down".to_string())));

        let err = summarizer(llm, 15, 6)
            .compact(None, history(20), ChatMessage::user("go"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::LlmError(_)));
    }
}
