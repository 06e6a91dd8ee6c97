use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::DownloadConfig;
use crate::error::{Result, MergeError};

/// Streams remote merge inputs to scratch files.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(MergeError::Http)?;

        Ok(Self { client, config })
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// The whole transfer is bounded by the configured timeout. A failed or
    /// timed out transfer removes whatever was written to `dest`.
    pub async fn fetch(&self, label: &str, url: &str, dest: &Path) -> Result<u64> {
        let limit = self.config.timeout();
        let result = match tokio::time::timeout(limit, self.stream_to_file(label, url, dest)).await {
            Ok(result) => result,
            Err(_) => Err(MergeError::DownloadTimeout(label.to_string(), limit.as_secs())),
        };

        if result.is_err() {
            let _ = async_fs::remove_file(dest).await;
        }
        result
    }

    async fn stream_to_file(&self, label: &str, url: &str, dest: &Path) -> Result<u64> {
        info!(label, url, "Downloading");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MergeError::Download(format!("Failed to fetch {} from {}: {}", label, url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MergeError::Download(format!(
                "Failed to fetch {} from {}: HTTP {}",
                label, url, status
            )));
        }

        let mut file = async_fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                MergeError::Download(format!("Stream error while fetching {}: {}", label, e))
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        debug!(label, bytes = written, dest = %dest.display(), "Download finished");
        Ok(written)
    }
}
