pub mod chat;
pub mod memory;
pub mod semantic_search;

pub use chat::{ChatAnswer, ConversationalRetrievalChain};
pub use memory::{build_chat_history, ConversationSession, SessionStore, Turn};
pub use semantic_search::SemanticSearch;
