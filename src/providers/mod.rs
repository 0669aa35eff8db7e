pub mod gemini;
pub mod openai;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub mod mock;

pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
pub use traits::{ChatMessage, CompletionProvider, EmbeddingProvider, Role};
