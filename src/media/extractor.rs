use super::types::RawMediaInfo;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Media metadata extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Media metadata extraction failed: {0}")]
    Failed(String),

    #[error("Failed to parse media metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable name of the extractor
    fn name(&self) -> &'static str;

    /// Resolve a post URL into raw stream metadata. Single attempt, no retries.
    async fn extract(&self, url: &str) -> Result<RawMediaInfo, ExtractionError>;

    /// Test if the extractor can run on this system
    async fn test_availability(&self) -> bool;
}
