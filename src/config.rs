use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{Result, MergeError};

/// Upper bound for every configured duration (ten years)
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub download: DownloadConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP service binds to
    pub bind: String,
    /// Prefix for output URLs in merge responses; empty yields relative URLs
    pub public_base_url: String,
    /// Maximum accepted request body size in bytes
    pub request_body_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Scratch root holding the `input` and `output` subareas
    pub root: PathBuf,
    /// How long a produced output is kept before the sweeper reclaims it
    pub output_ttl_secs: u64,
    /// Interval between retention sweeps
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Upper bound for a single input download, body included
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Fetch the video and audio inputs concurrently
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Codec the audio track is re-encoded to
    pub audio_codec: String,
    /// Container extension of the merged output
    pub container: String,
    /// Upper bound for one muxing run; the process is killed afterwards
    pub timeout_secs: u64,
    /// Additional options inserted before the output path
    /// Common options: ["-b:a", "192k", "-movflags", "+faststart"]
    pub extra_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    /// Also write logs to a daily rolling file in `directory`
    pub file: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            public_base_url: String::new(),
            request_body_limit: 64 * 1024,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".avmerge").join("tmp"),
            output_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            connect_timeout_secs: 10,
            user_agent: format!("avmerge/{}", env!("CARGO_PKG_VERSION")),
            parallel: false,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            audio_codec: "aac".to_string(),
            container: "mp4".to_string(),
            timeout_secs: 600,
            extra_options: vec![
                // Example options users can customize:
                // "-b:a".to_string(), "192k".to_string(),
                // "-movflags".to_string(), "+faststart".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".avmerge").join("log"),
            file: true,
        }
    }
}

impl WorkspaceConfig {
    pub fn output_ttl(&self) -> Duration {
        Duration::from_secs(self.output_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl MediaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MergeError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| MergeError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MergeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MergeError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.binary_path.trim().is_empty() {
            return Err(MergeError::Config("media.binary_path must not be empty".to_string()));
        }
        if self.media.audio_codec.trim().is_empty() {
            return Err(MergeError::Config("media.audio_codec must not be empty".to_string()));
        }
        let container = self.media.container.trim();
        if container.is_empty() || container.contains(['/', '\\', '.']) {
            return Err(MergeError::Config(format!(
                "media.container must be a bare extension, got '{}'",
                self.media.container
            )));
        }
        if self.download.timeout_secs == 0 || self.media.timeout_secs == 0 {
            return Err(MergeError::Config("timeouts must be greater than zero".to_string()));
        }

        for (name, secs) in [
            ("workspace.output_ttl_secs", self.workspace.output_ttl_secs),
            ("workspace.sweep_interval_secs", self.workspace.sweep_interval_secs),
            ("download.timeout_secs", self.download.timeout_secs),
            ("download.connect_timeout_secs", self.download.connect_timeout_secs),
            ("media.timeout_secs", self.media.timeout_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(MergeError::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_DURATION_SECS, secs
                )));
            }
        }
        Ok(())
    }
}
