mod extractor;
mod normalize;
mod types;
mod ytdlp;

pub use extractor::{ExtractionError, Extractor};
pub use normalize::normalize;
pub use types::NormalizedResult;
#[cfg(test)]
pub use types::RawMediaInfo;
pub use ytdlp::YtDlpExtractor;

use tracing::info;

pub struct MediaResolver {
    extractor: Box<dyn Extractor>,
}

impl MediaResolver {
    pub fn new(extractor: Box<dyn Extractor>) -> Self {
        info!("Media resolver initialized with {}", extractor.name());
        Self { extractor }
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    /// Extract the post behind `url` and shape it for clients.
    pub async fn resolve(&self, url: &str) -> Result<NormalizedResult, ExtractionError> {
        info!("Resolving media for URL: {}", url);

        let raw = self.extractor.extract(url).await?;
        let result = normalize(&raw);

        info!(
            "Resolved {} video variants, {} images, audio: {}",
            result.formats.len(),
            result.image_urls.len(),
            result.mp3_url.is_some()
        );
        Ok(result)
    }

    pub async fn is_available(&self) -> bool {
        self.extractor.test_availability().await
    }
}
