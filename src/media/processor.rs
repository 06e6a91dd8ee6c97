use async_trait::async_trait;
use std::path::Path;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, MergeError};
use super::{MediaProcessorTrait, MediaCommandBuilder};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn mux(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!("Merging {} + {} -> {}",
              video_path.display(), audio_path.display(), output_path.display());

        let command = self
            .command_builder
            .merge_audio_video(
                video_path,
                audio_path,
                output_path,
                &self.config.audio_codec,
                &self.config.extra_options,
            )
            .with_timeout(self.config.timeout());

        command.execute().await?;

        // ffmpeg can exit cleanly without writing anything for odd inputs
        let written = tokio::fs::metadata(output_path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(MergeError::Media(format!(
                "Merge produced no output at {}",
                output_path.display()
            )));
        }

        info!(bytes = written, "Merge completed successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .with_timeout(self.config.timeout())
            .execute()
            .await
            .map_err(|e| MergeError::Media(format!("Media processor not found: {}", e)))?;

        info!("Media processor is available");
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let version_info = self
            .command_builder
            .version_check()
            .with_timeout(self.config.timeout())
            .execute_with_output()
            .await?;

        // The first line carries the version
        let first_line = version_info.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_binary() {
        let processor = MediaProcessorImpl::new(MediaConfig {
            binary_path: "/nonexistent/ffmpeg".to_string(),
            ..MediaConfig::default()
        });

        let err = processor.check_availability().await.unwrap_err();
        assert!(err.to_string().contains("Media processor not found"));
    }
}
