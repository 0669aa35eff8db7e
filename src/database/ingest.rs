use crate::database::VectorStore;
use crate::document::Passage;
use crate::providers::traits::EmbeddingProvider;
use anyhow::{Context, Result};

pub const EMBEDDING_BATCH_SIZE: usize = 64;

/// Embeds `passages` in batches and adds them to `store`. Returns the number
/// of passages written.
pub async fn ingest_passages(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    passages: Vec<Passage>,
) -> Result<usize> {
    let total = passages.len();
    let mut remaining = passages.into_iter().peekable();
    let mut batch_no = 0;

    while remaining.peek().is_some() {
        let batch: Vec<Passage> = remaining.by_ref().take(EMBEDDING_BATCH_SIZE).collect();
        batch_no += 1;

        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        let embeddings = embedder
            .generate_batch_embeddings(&texts)
            .await
            .with_context(|| format!("Failed to embed batch {}", batch_no))?;
        log::debug!("Embedded batch {} ({} passages)", batch_no, batch.len());

        store.add(batch, embeddings).await?;
    }

    log::info!("Indexed {} passages with {}", total, embedder.embedding_model());
    Ok(total)
}
