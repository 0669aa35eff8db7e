use crate::database::vector_db::SearchResult;
use crate::llm::memory::{build_chat_history, Turn};
use crate::llm::semantic_search::SemanticSearch;
use crate::providers::traits::{ChatMessage, CompletionProvider};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

pub const CONDENSE_QUESTION_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, \
formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

pub const HR_QA_PROMPT: &str = "You are an assistant for question-answering tasks on HR Policy. \
Use the following pieces of retrieved context to answer \
the question. If you don't know the answer, say that you \
don't know. Use three sentences maximum and keep the \
answer concise.";

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// The question actually used for retrieval.
    pub standalone_question: String,
    pub context: Vec<SearchResult>,
}

/// History-aware retrieval QA over the HR policy index.
pub struct ConversationalRetrievalChain {
    llm: Arc<dyn CompletionProvider>,
    retriever: SemanticSearch,
}

impl ConversationalRetrievalChain {
    pub fn new(llm: Arc<dyn CompletionProvider>, retriever: SemanticSearch) -> Self {
        Self { llm, retriever }
    }

    /// Restates `question` so it stands without `history`. With no history
    /// the question is already standalone and the model is not consulted.
    pub async fn rewrite_question(&self, question: &str, history: &[Turn]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(CONDENSE_QUESTION_PROMPT));
        messages.extend(build_chat_history(history));
        messages.push(ChatMessage::user(question));

        let standalone = self
            .llm
            .chat(&messages)
            .await
            .context("Failed to rewrite question")?;
        let standalone = standalone.trim();

        Ok(if standalone.is_empty() {
            question.to_string()
        } else {
            standalone.to_string()
        })
    }

    pub async fn ask(&self, question: &str, history: &[Turn]) -> Result<ChatAnswer> {
        let standalone_question = self.rewrite_question(question, history).await?;
        let context = self.retriever.search(&standalone_question).await?;

        let system = format!(
            "{}\n\n{}",
            HR_QA_PROMPT,
            SemanticSearch::format_context(&context)
        );
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(build_chat_history(history));
        messages.push(ChatMessage::user(question));

        let answer = self
            .llm
            .chat(&messages)
            .await
            .context("Failed to generate answer")?;

        log::info!(
            "Answered {:?} from {} passages",
            standalone_question,
            context.len()
        );
        Ok(ChatAnswer {
            answer: answer.trim().to_string(),
            standalone_question,
            context,
        })
    }
}
