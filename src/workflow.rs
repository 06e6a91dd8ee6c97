use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::config::Config;
use crate::download::Downloader;
use crate::error::Result;
use crate::media::{MediaProcessorTrait, MediaProcessorFactory};
use crate::model::{MergeOutcome, MergeRequest};
use crate::workspace::{Scratch, Workspace};

/// Download-then-mux pipeline shared by the HTTP service and the CLI.
pub struct Workflow {
    config: Config,
    workspace: Workspace,
    downloader: Downloader,
    media: Arc<dyn MediaProcessorTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        Self::with_processor(config, media)
    }

    /// Build a workflow around a specific media engine binding.
    pub fn with_processor(config: Config, media: Arc<dyn MediaProcessorTrait>) -> Result<Self> {
        config.validate()?;
        let workspace = Workspace::new(&config.workspace);
        let downloader = Downloader::new(config.download.clone())?;

        Ok(Self {
            config,
            workspace,
            downloader,
            media,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn media(&self) -> &dyn MediaProcessorTrait {
        self.media.as_ref()
    }

    /// Run one merge request to completion.
    ///
    /// On success the merged file is left in the output subarea; the input
    /// scratch directory is removed on every exit path.
    pub async fn merge(&self, request: &MergeRequest) -> Result<MergeOutcome> {
        let scratch = self.workspace.scratch(&self.config.media.container).await?;
        let id = scratch.id();
        let span = tracing::info_span!("merge", request_id = %id);

        self.run(scratch, request).instrument(span).await
    }

    async fn run(&self, scratch: Scratch, request: &MergeRequest) -> Result<MergeOutcome> {
        let id = scratch.id();
        match self.process(&scratch, request).await {
            Ok(()) => {
                let path = scratch.persist_output()?;
                let size = tokio::fs::metadata(&path).await?.len();
                info!(output = %path.display(), size, "Merge request completed");
                Ok(MergeOutcome { id, path, size })
            }
            Err(error) => {
                warn!(%error, "Merge request failed");
                scratch.discard();
                Err(error)
            }
        }
    }

    async fn process(&self, scratch: &Scratch, request: &MergeRequest) -> Result<()> {
        let video_path = scratch.video_path(&request.video_url);
        let audio_path = scratch.audio_path(&request.audio_url);

        if self.config.download.parallel {
            tokio::try_join!(
                self.downloader.fetch("video", &request.video_url, &video_path),
                self.downloader.fetch("audio", &request.audio_url, &audio_path),
            )?;
        } else {
            self.downloader.fetch("video", &request.video_url, &video_path).await?;
            self.downloader.fetch("audio", &request.audio_url, &audio_path).await?;
        }

        self.mux(&video_path, &audio_path, scratch.output_path()).await
    }

    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        self.media.mux(video_path, audio_path, output_path).await
    }
}
