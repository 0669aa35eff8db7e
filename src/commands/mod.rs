use crate::config::AppConfig;
use crate::database::{LocalIndex, QdrantStore, VectorStore};
use crate::employees::EmployeeDataGenerator;
use crate::invoice::InvoiceExtractor;
use crate::llm::{ConversationalRetrievalChain, SemanticSearch};
use crate::providers::{GeminiProvider, OpenAIProvider};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub mod chat;
pub mod employees;
pub mod index;
pub mod invoice;
pub mod system;

pub fn openai_provider(config: &AppConfig) -> Result<Arc<OpenAIProvider>> {
    let provider = OpenAIProvider::new(&config.openai, &config.embedding_model)
        .context("Failed to initialize OpenAI provider")?;
    Ok(Arc::new(provider))
}

/// Opens the persisted HR index: Qdrant when `QDRANT_URL` is set, the local
/// index directory otherwise.
pub async fn open_hr_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    match &config.qdrant_url {
        Some(url) => {
            let store = QdrantStore::connect(url, &config.hr_collection).await?;
            Ok(Arc::new(store))
        }
        None => {
            let index = LocalIndex::load(&config.hr_index_path).with_context(|| {
                format!(
                    "Failed to load HR index from {} (build it with the `index` command)",
                    config.hr_index_path.display()
                )
            })?;
            if index.embedding_model() != config.embedding_model {
                log::warn!(
                    "HR index was built with {} but queries use {}",
                    index.embedding_model(),
                    config.embedding_model
                );
            }
            Ok(Arc::new(index))
        }
    }
}

pub async fn build_chatbot(config: &AppConfig) -> Result<ConversationalRetrievalChain> {
    let openai = openai_provider(config)?;
    let store = open_hr_store(config).await?;
    let retriever = SemanticSearch::new(openai.clone(), store, config.retrieval_top_k);
    Ok(ConversationalRetrievalChain::new(openai, retriever))
}

pub fn build_invoice_extractor(config: &AppConfig) -> Result<InvoiceExtractor> {
    let openai = openai_provider(config)?;
    Ok(InvoiceExtractor::new(openai.clone(), openai, config.retrieval_top_k))
}

pub fn build_employee_generator(config: &AppConfig) -> Result<EmployeeDataGenerator> {
    let gemini =
        GeminiProvider::new(&config.gemini).context("Failed to initialize Gemini provider")?;
    Ok(EmployeeDataGenerator::new(Arc::new(gemini)))
}

pub(crate) fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
