use super::{
    extractor::{ExtractionError, Extractor},
    types::RawMediaInfo,
};
use crate::config::ExtractorConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct YtDlpExtractor {
    binary: String,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout(),
        }
    }

    fn command(&self, url: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--quiet")
            .arg(url)
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str) -> Result<RawMediaInfo, ExtractionError> {
        debug!("Extracting metadata with yt-dlp for: {}", url);

        let output = tokio::time::timeout(self.timeout, self.command(url).output())
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?
            .map_err(|source| ExtractionError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Failed(error.trim().to_string()));
        }

        let info: RawMediaInfo = serde_json::from_slice(&output.stdout)?;

        debug!(
            "yt-dlp returned {} formats, {} entries",
            info.formats.len(),
            info.entries.as_ref().map_or(0, |entries| entries.len())
        );

        Ok(info)
    }

    async fn test_availability(&self) -> bool {
        let mut command = Command::new(&self.binary);
        command.arg("--version").kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                warn!("yt-dlp --version did not finish within {:?}", self.timeout);
                false
            }
            Ok(Ok(output)) => {
                if output.status.success() {
                    let version = String::from_utf8_lossy(&output.stdout);
                    info!("yt-dlp is available, version: {}", version.trim());
                    true
                } else {
                    warn!("yt-dlp command failed");
                    false
                }
            }
            Ok(Err(e)) => {
                warn!("yt-dlp not found at {}: {}", self.binary, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(binary: &str, timeout_secs: u64) -> YtDlpExtractor {
        YtDlpExtractor::new(&ExtractorConfig {
            binary: binary.to_string(),
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let extractor = extractor("/nonexistent/yt-dlp", 5);
        let err = extractor
            .extract("https://www.tiktok.com/@user/video/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }));
        assert!(!extractor.test_availability().await);
    }

    #[cfg(unix)]
    fn hanging_binary(dir: &std::path::Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_binary_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&hanging_binary(dir.path()), 1);

        let started = std::time::Instant::now();
        assert!(!extractor.test_availability().await);
        let err = extractor
            .extract("https://www.tiktok.com/@user/video/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    #[ignore] // Requires yt-dlp and network access
    async fn test_extract_real_post() {
        let extractor = extractor("yt-dlp", 60);
        let info = extractor
            .extract("https://www.tiktok.com/@tiktok/video/7106594312292453675")
            .await
            .unwrap();
        assert!(!info.formats.is_empty());
    }
}
