use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, MergeError};

/// Longest stderr excerpt carried into an error message
const DIAGNOSTIC_LIMIT: usize = 2048;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub timeout: Option<Duration>,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Suppress the banner and keep stderr to actual diagnostics
    pub fn quiet(self) -> Self {
        self.arg("-hide_banner").arg("-loglevel").arg("error")
    }

    /// Select a stream for the output, e.g. `0:v:0`
    pub fn map<S: Into<String>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// End the output with the shortest input stream
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    /// Kill the process if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }

    /// Execute the command and return its stdout
    pub async fn execute_with_output(&self) -> Result<String> {
        self.run().await
    }

    async fn run(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| MergeError::EngineTimeout(self.description.clone(), limit.as_secs()))?,
            None => child.await,
        }
        .map_err(|e| MergeError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::Media(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                diagnostic_tail(&stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Last part of the engine's stderr, where ffmpeg puts the actual error
fn diagnostic_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= DIAGNOSTIC_LIMIT {
        return trimmed;
    }
    let mut start = trimmed.len() - DIAGNOSTIC_LIMIT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

/// Builder for common media processing operations
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the audio/video merge command.
    ///
    /// Takes the first video stream of `video_path` unmodified and the first
    /// audio stream of `audio_path` re-encoded to `audio_codec`; the output
    /// ends with the shorter of the two.
    pub fn merge_audio_video<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        audio_codec: &str,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Audio/video merge")
            .quiet()
            .input(&video_path)
            .input(&audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .copy_video()
            .audio_codec(audio_codec)
            .shortest()
            .overwrite();

        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}
