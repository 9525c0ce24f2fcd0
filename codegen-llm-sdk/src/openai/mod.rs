//! OpenAI Chat Completions client

pub mod client;
pub mod tools;
pub mod types;

pub use client::OpenAIClient;
pub use tools::OpenAIToolFormat;
pub use types::*;
