//! Google Gemini API client and types

pub mod client;
pub mod tools;
pub mod types;

pub use client::GeminiClient;
pub use tools::GeminiToolFormat;
pub use types::*;

// Re-export model constants
pub use crate::models::gemini::*;
