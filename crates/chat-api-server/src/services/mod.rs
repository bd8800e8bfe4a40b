pub mod chat_service;
pub mod conversation;
pub mod llm_service;
pub mod retrieval_service;

pub use chat_service::ChatService;
pub use llm_service::LlmService;
pub use retrieval_service::RetrievalService;
