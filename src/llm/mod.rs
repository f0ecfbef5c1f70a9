//! LLM module - Language Model integrations
//!
//! Ollama is the only backend; the locate and transform capabilities are
//! built on top of the [`LLMProvider`] trait.

pub mod json;
pub mod locate;
pub mod ollama;
pub mod traits;
pub mod transform;

pub use locate::LlmLocator;
pub use ollama::OllamaClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, Message, TokenUsage};
pub use transform::LlmTransformer;
