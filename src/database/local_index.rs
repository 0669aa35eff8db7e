use crate::database::vector_db::{SearchResult, VectorDBError, VectorStore};
use crate::document::Passage;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    #[serde(flatten)]
    passage: Passage,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    embedding_model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Flat in-memory index scanned with cosine similarity.
///
/// Serves both the persisted HR index (loaded from a directory) and the
/// throwaway per-invoice index.
#[derive(Debug, Default)]
pub struct LocalIndex {
    embedding_model: String,
    entries: RwLock<Vec<IndexEntry>>,
}

impl LocalIndex {
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.read().first().map(|e| e.embedding.len())
    }

    /// Loads `<dir>/index.json`.
    pub fn load(dir: &Path) -> Result<Self, VectorDBError> {
        let path = dir.join(INDEX_FILE_NAME);
        if !path.exists() {
            return Err(VectorDBError::NotFound(path));
        }

        let raw = fs::read_to_string(&path)?;
        let file: IndexFile = serde_json::from_str(&raw)?;
        if let Some(bad) = file.entries.iter().find(|e| e.embedding.len() != file.dimension) {
            return Err(VectorDBError::DimensionMismatch {
                expected: file.dimension,
                found: bad.embedding.len(),
            });
        }

        log::info!(
            "Loaded {} passages from {} ({})",
            file.entries.len(),
            path.display(),
            file.embedding_model
        );
        Ok(Self {
            embedding_model: file.embedding_model,
            entries: RwLock::new(file.entries),
        })
    }

    /// Writes `<dir>/index.json`, creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<(), VectorDBError> {
        fs::create_dir_all(dir)?;
        let entries = self.entries.read().clone();
        let file = IndexFile {
            embedding_model: self.embedding_model.clone(),
            dimension: entries.first().map(|e| e.embedding.len()).unwrap_or(0),
            entries,
        };

        let path = dir.join(INDEX_FILE_NAME);
        fs::write(&path, serde_json::to_vec(&file)?)?;
        log::info!("Saved {} passages to {}", file.entries.len(), path.display());
        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

#[async_trait]
impl VectorStore for LocalIndex {
    async fn add(
        &self,
        passages: Vec<Passage>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), VectorDBError> {
        if passages.len() != embeddings.len() {
            return Err(VectorDBError::LengthMismatch {
                passages: passages.len(),
                embeddings: embeddings.len(),
            });
        }

        let mut entries = self.entries.write();
        let expected = entries
            .first()
            .map(|e| e.embedding.len())
            .or_else(|| embeddings.first().map(Vec::len));
        if let Some(expected) = expected {
            if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
                return Err(VectorDBError::DimensionMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }

        entries.extend(
            passages
                .into_iter()
                .zip(embeddings)
                .map(|(passage, embedding)| IndexEntry { passage, embedding }),
        );
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, VectorDBError> {
        let entries = self.entries.read();
        if let Some(first) = entries.first() {
            if first.embedding.len() != query_embedding.len() {
                return Err(VectorDBError::DimensionMismatch {
                    expected: first.embedding.len(),
                    found: query_embedding.len(),
                });
            }
        }

        let mut scored: Vec<SearchResult> = entries
            .iter()
            .map(|entry| SearchResult {
                passage: entry.passage.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn len(&self) -> Result<usize, VectorDBError> {
        Ok(self.entries.read().len())
    }
}
