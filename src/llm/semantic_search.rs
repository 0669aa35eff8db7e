use crate::database::vector_db::{SearchResult, VectorStore};
use crate::providers::traits::EmbeddingProvider;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Embeds a query and looks up the closest passages in a store.
#[derive(Clone)]
pub struct SemanticSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl SemanticSearch {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self
            .embedder
            .generate_embedding(query)
            .await
            .context("Failed to embed query")?;

        let results = self
            .store
            .search(&query_embedding, self.top_k)
            .await
            .context("Failed to search index")?;

        log::debug!("Retrieved {} passages for {:?}", results.len(), query);
        Ok(results)
    }

    /// Joins passage texts with blank lines, the way they are stuffed into a prompt.
    pub fn format_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.passage.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::LocalIndex;
    use crate::document::Passage;
    use crate::providers::mock::{FailingEmbedder, HashEmbedder};

    async fn hr_index(embedder: &HashEmbedder) -> Arc<LocalIndex> {
        let index = Arc::new(LocalIndex::new("hash"));
        let passages = vec![
            Passage::new("Annual leave entitlement is twenty days", "leave.md", None),
            Passage::new("Expense claims need receipts", "expenses.md", None),
            Passage::new("Remote work requires manager approval", "remote.md", None),
        ];
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let embeddings = embedder.generate_batch_embeddings(&texts).await.unwrap();
        index.add(passages, embeddings).await.unwrap();
        index
    }

    #[tokio::test]
    async fn finds_the_relevant_passage() {
        let embedder = HashEmbedder::default();
        let index = hr_index(&embedder).await;
        let search = SemanticSearch::new(Arc::new(embedder), index, 1);

        let results = search.search("how many days of annual leave").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].passage.source, "leave.md");
    }

    #[tokio::test]
    async fn embedding_failures_propagate() {
        let index = hr_index(&HashEmbedder::default()).await;
        let search = SemanticSearch::new(Arc::new(FailingEmbedder), index, 4);

        assert!(search.search("anything").await.is_err());
    }

    #[test]
    fn context_is_blank_line_separated() {
        let results = vec![
            SearchResult {
                passage: Passage::new("one", "a", None),
                score: 0.9,
            },
            SearchResult {
                passage: Passage::new("two", "b", Some(2)),
                score: 0.5,
            },
        ];
        assert_eq!(SemanticSearch::format_context(&results), "one\n\ntwo");
    }
}
