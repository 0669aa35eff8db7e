use crate::database::qdrant_config::create_qdrant_client;
use crate::document::Passage;
use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Payload, Qdrant,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
    #[error("Embedding dimension mismatch: index has {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Got {embeddings} embeddings for {passages} passages")]
    LengthMismatch { passages: usize, embeddings: usize },
    #[error("Index not found at {0}")]
    NotFound(PathBuf),
    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Index format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub passage: Passage,
    pub score: f32,
}

/// Nearest-neighbour lookup over embedded passages.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(
        &self,
        passages: Vec<Passage>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), VectorDBError>;

    /// Returns at most `limit` results, best match first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, VectorDBError>;

    async fn len(&self) -> Result<usize, VectorDBError>;
}

/// HR index kept in a Qdrant collection with cosine distance.
#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
    collection: String,
}

impl QdrantStore {
    pub async fn connect(url: &str, collection: &str) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url)
            .await
            .map_err(|e| VectorDBError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            collection: collection.to_string(),
        })
    }

    pub async fn create_collection(&self, vector_size: u64) -> Result<(), VectorDBError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;
        if exists {
            log::info!("Collection {} already exists, skipping creation", self.collection);
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        log::info!("Created collection {} ({} dims)", self.collection, vector_size);
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
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
        let Some(dim) = embeddings.first().map(Vec::len) else {
            return Ok(());
        };
        self.create_collection(dim as u64).await?;

        let points = passages
            .into_iter()
            .zip(embeddings)
            .map(|(passage, vector)| {
                let payload = Payload::try_from(json!({
                    "text": passage.text,
                    "source": passage.source,
                    "page": passage.page,
                }))
                .map_err(|e| VectorDBError::Operation(e.to_string()))?;
                Ok(PointStruct::new(Uuid::new_v4().to_string(), vector, payload))
            })
            .collect::<Result<Vec<_>, VectorDBError>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, VectorDBError> {
        let request =
            SearchPointsBuilder::new(&self.collection, query_embedding.to_vec(), limit as u64)
                .with_payload(true);

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .filter_map(|point| {
                let text = point.payload.get("text")?.as_str()?.to_string();
                let source = point
                    .payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let page = point
                    .payload
                    .get("page")
                    .and_then(|v| v.as_integer())
                    .and_then(|p| u32::try_from(p).ok());

                Some(SearchResult {
                    passage: Passage { text, source, page },
                    score: point.score,
                })
            })
            .collect();

        Ok(results)
    }

    async fn len(&self) -> Result<usize, VectorDBError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
