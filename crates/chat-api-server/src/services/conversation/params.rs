use serde::Serialize;

use crate::models::chat::ChatRequest;

/// Resolved sampling arguments for one completion call. Optional fields are
/// serde-skipped when absent so the completion service applies its own
/// defaults instead of ours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

/// Normalizes per-request sampling parameters into the generator call
/// contract. Only `model` and `temperature` fall back to process-wide
/// defaults; every other absent field stays absent, so identical explicit
/// request parameters always resolve to identical call arguments.
pub struct ParameterResolver {
    default_model: String,
    default_temperature: f32,
}

impl ParameterResolver {
    pub fn new(default_model: String, default_temperature: f32) -> Self {
        Self {
            default_model,
            default_temperature,
        }
    }

    pub fn resolve(&self, request: &ChatRequest) -> CompletionOptions {
        CompletionOptions {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            temperature: request.temperature.unwrap_or(self.default_temperature),
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
        }
    }

    /// Options for internal generator calls (summarization): defaults only.
    pub fn defaults(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.default_model.clone(),
            temperature: self.default_temperature,
            top_p: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}
