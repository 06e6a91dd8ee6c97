//! Shared fixtures for the integration tests: a local origin server that
//! hosts merge inputs and a media engine double that records its calls.

#![allow(dead_code)]

use async_trait::async_trait;
use avmerge::config::Config;
use avmerge::error::{MergeError, Result};
use avmerge::media::MediaProcessorTrait;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const VIDEO_BYTES: &[u8] = b"VIDEO-PAYLOAD";
pub const AUDIO_BYTES: &[u8] = b"AUDIO";

/// Local HTTP server hosting merge inputs
pub struct Origin {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Origin {
    pub async fn start() -> Self {
        Self::with_router(
            Router::new()
                .route("/video.mp4", get(|| async { VIDEO_BYTES }))
                .route("/audio.mp3", get(|| async { AUDIO_BYTES }))
                .route("/missing.mp4", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
                .route(
                    "/slow.mp3",
                    get(|| async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        AUDIO_BYTES
                    }),
                ),
        )
        .await
    }

    pub async fn with_router(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Drop for Origin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Media engine double: writes the video bytes followed by the audio bytes,
/// or fails with a fixed diagnostic.
#[derive(Default)]
pub struct FakeProcessor {
    pub calls: AtomicUsize,
    pub failure: Option<String>,
}

impl FakeProcessor {
    pub fn failing(diagnostic: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(diagnostic.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProcessorTrait for FakeProcessor {
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Both inputs must be fully present before muxing starts
        let mut merged = tokio::fs::read(video_path).await?;
        merged.extend(tokio::fs::read(audio_path).await?);

        if let Some(diagnostic) = &self.failure {
            tokio::fs::write(output_path, b"partial").await?;
            return Err(MergeError::Media(format!("Audio/video merge failed: {}", diagnostic)));
        }

        tokio::fs::write(output_path, merged).await?;
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        Ok("fake-engine 1.0".to_string())
    }
}

/// Configuration rooted in a fresh temporary directory
pub fn test_config() -> (Config, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.workspace.root = dir.path().join("scratch");
    config.logging.file = false;
    config.download.timeout_secs = 2;
    (config, dir)
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(read) => read.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
