//! Scratch storage for merge requests.
//!
//! The workspace root holds two subareas: `input/` with one directory per
//! in-flight request, and `output/` with the merged files. Nothing here is
//! durable; inputs are removed when the request finishes and outputs are
//! reclaimed by the retention sweeper.

use reqwest::Url;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, TempPath};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::WorkspaceConfig;
use crate::error::{Result, MergeError};

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self::at(&config.root)
    }

    pub fn at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            input_dir: root.join(INPUT_DIR),
            output_dir: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Create both subareas if missing. Safe to call repeatedly.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.input_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Allocate a fresh request scratch area with a unique identifier.
    pub async fn scratch(&self, container: &str) -> Result<Scratch> {
        self.ensure().await?;

        let id = Uuid::new_v4();
        let inputs = tempfile::Builder::new()
            .prefix(&id.to_string())
            .rand_bytes(0)
            .tempdir_in(&self.input_dir)
            .map_err(|e| MergeError::Workspace(format!("Failed to create scratch directory: {}", e)))?;
        let output = TempPath::from_path(self.output_dir.join(format!("{}.{}", id, container)));

        debug!(request_id = %id, dir = %inputs.path().display(), "Allocated scratch area");
        Ok(Scratch { id, inputs, output })
    }

    /// Resolve a served output file name, refusing anything that is not a
    /// plain file name inside the output subarea.
    pub fn resolve_output(&self, file_name: &str) -> Option<PathBuf> {
        let valid = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\'])
            && !file_name.contains("..");
        valid.then(|| self.output_dir.join(file_name))
    }
}

/// Per-request scratch area.
///
/// Dropping it removes the downloaded inputs and any output that was not
/// persisted, so cleanup also happens when the request future is cancelled.
#[derive(Debug)]
pub struct Scratch {
    id: Uuid,
    inputs: TempDir,
    output: TempPath,
}

impl Scratch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input_dir(&self) -> &Path {
        self.inputs.path()
    }

    /// Destination for the downloaded video, keeping the source extension
    /// when it looks like one.
    pub fn video_path(&self, url: &str) -> PathBuf {
        self.inputs.path().join(format!("video.{}", extension_of(url).as_deref().unwrap_or("mp4")))
    }

    pub fn audio_path(&self, url: &str) -> PathBuf {
        self.inputs.path().join(format!("audio.{}", extension_of(url).as_deref().unwrap_or("mp3")))
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Keep the output and drop the inputs.
    pub fn persist_output(self) -> Result<PathBuf> {
        let Scratch { id, inputs, output } = self;
        close_inputs(id, inputs);
        output
            .keep()
            .map_err(|e| MergeError::Workspace(format!("Failed to keep output: {}", e.error)))
    }

    /// Drop the inputs and any partial output.
    pub fn discard(self) {
        let Scratch { id, inputs, output } = self;
        close_inputs(id, inputs);
        if let Err(error) = output.close() {
            if error.kind() != ErrorKind::NotFound {
                warn!(request_id = %id, %error, "Failed to remove partial output");
            }
        }
    }
}

fn close_inputs(id: Uuid, inputs: TempDir) {
    let path = inputs.path().to_path_buf();
    if let Err(error) = inputs.close() {
        warn!(request_id = %id, dir = %path.display(), %error, "Failed to remove scratch inputs");
    }
}

/// Short alphanumeric extension of the URL's last path segment, if any
fn extension_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let plausible = !ext.is_empty()
        && ext.len() <= 5
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    plausible.then(|| ext.to_ascii_lowercase())
}
