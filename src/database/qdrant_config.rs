use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

/// Normalises a REST-style Qdrant URL to the gRPC endpoint the client speaks.
pub fn grpc_url(url: &str) -> String {
    let (scheme, clean_url) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", url),
    };
    let clean_url = clean_url.trim_end_matches('/');

    // Replace port 6333 with 6334 for gRPC if needed
    let grpc = match clean_url.strip_suffix(":6333") {
        Some(host) => format!("{}:6334", host),
        None => clean_url.to_string(),
    };

    format!("{}://{}", scheme, grpc)
}

pub async fn create_qdrant_client(
    url: &str,
) -> Result<Qdrant, Box<dyn std::error::Error + Send + Sync>> {
    let url_with_scheme = grpc_url(url);
    log::info!("Attempting to connect to Qdrant with URL: {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config)?;

    // Test the connection
    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Connection test failed: {}", e);
            Err(format!("Failed to connect to Qdrant: {}", e).into())
        }
    }
}
