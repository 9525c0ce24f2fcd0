pub mod agents;
pub mod chat;
pub mod llm_providers;
