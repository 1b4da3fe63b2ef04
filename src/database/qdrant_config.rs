use qdrant_client::{Qdrant, config::QdrantConfig};
use std::time::Duration;

/// Builds a Qdrant client from whatever URL shape shows up in the
/// environment. The REST port (6333) is rewritten to the gRPC port (6334)
/// since this client only speaks gRPC.
pub async fn create_qdrant_client(url: &str) -> Result<Qdrant, Box<dyn std::error::Error>> {
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };

    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url
    };

    let url_with_scheme = format!("http://{}", grpc_url);
    log::info!("Connecting to Qdrant at {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config)?;

    match client.list_collections().await {
        Ok(_) => Ok(client),
        Err(e) => {
            log::error!("Qdrant connection test failed: {}", e);
            Err(format!("Failed to connect to Qdrant: {}", e).into())
        }
    }
}
