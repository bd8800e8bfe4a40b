//! Context-window management for the stateless conversation model
//!
//! The client carries the conversation (history + running summary) in every
//! request; these modules decide when history is compacted, assemble the
//! prompt, resolve sampling parameters, and coordinate token streaming.

pub mod params;
pub mod prompt;
pub mod stream;
pub mod summarizer;

pub use params::{CompletionOptions, ParameterResolver};
pub use prompt::PromptAssembler;
pub use summarizer::Summarizer;
