pub mod ingest;
pub mod local_index;
pub mod qdrant_config;
pub mod vector_db;

pub use ingest::ingest_passages;
pub use local_index::LocalIndex;
pub use vector_db::{QdrantStore, SearchResult, VectorDBError, VectorStore};
