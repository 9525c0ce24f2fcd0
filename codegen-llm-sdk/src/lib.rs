//! # Codegen LLM SDK
//!
//! Vendor clients for the completion endpoints the agents talk to, behind
//! one [`client::LlmClient`] trait. Each client normalizes its own wire
//! format, buffered or streamed, into the shared [`types`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use codegen_llm_sdk::{
//!     client::LlmClient,
//!     openai::OpenAIClient,
//!     types::{CompletionRequest, Fragment, Message},
//! };
//! use futures_util::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAIClient::new("your-api-key")?;
//!     let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hello!")]);
//!
//!     let mut stream = client.stream_complete(request).await?;
//!     while let Some(fragment) = stream.next().await {
//!         if let Fragment::ContentDelta(text) = fragment? {
//!             print!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod claude;
pub mod client;
pub mod error;
pub mod gemini;
pub mod models;
pub mod openai;
pub mod providers;
pub mod sse;
pub mod tools;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use types::{CompletionRequest, CompletionResponse, Fragment, FragmentStream, Message, Role};
