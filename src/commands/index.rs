use crate::commands::{openai_provider, spinner};
use crate::config::AppConfig;
use crate::database::{ingest_passages, LocalIndex, QdrantStore, VectorDBError};
use crate::document::{load_source, TextSplitter};
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;

/// Adds `files` to the HR index. The local index is extended in place when
/// it already exists and created otherwise.
pub async fn run(config: &AppConfig, files: &[PathBuf]) -> Result<()> {
    let splitter = TextSplitter::default();
    let mut passages = Vec::new();
    for path in files {
        let loaded = load_source(path, &splitter).await?;
        println!("📄 {}: {} chunks", path.display(), loaded.len());
        passages.extend(loaded);
    }
    if passages.is_empty() {
        bail!("No text found in the given files");
    }

    let openai = openai_provider(config)?;
    let pb = spinner(format!("Embedding {} chunks...", passages.len()));

    let written = match &config.qdrant_url {
        Some(url) => {
            let store = QdrantStore::connect(url, &config.hr_collection).await;
            match store {
                Ok(store) => ingest_passages(openai.as_ref(), &store, passages).await,
                Err(e) => Err(e.into()),
            }
        }
        None => {
            let index = match LocalIndex::load(&config.hr_index_path) {
                Ok(index) => index,
                Err(VectorDBError::NotFound(_)) => LocalIndex::new(config.embedding_model.clone()),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e.into());
                }
            };
            let result = ingest_passages(openai.as_ref(), &index, passages).await;
            match result {
                Ok(n) => index.save(&config.hr_index_path).map(|_| n).map_err(Into::into),
                Err(e) => Err(e),
            }
        }
    };
    pb.finish_and_clear();
    let written = written?;

    let target = match &config.qdrant_url {
        Some(url) => format!("{} at {}", config.hr_collection, url),
        None => config.hr_index_path.display().to_string(),
    };
    println!("{}", format!("✅ Indexed {} chunks into {}", written, target).bright_green());
    Ok(())
}
