pub mod agents;
pub mod llm;
