use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A single input transfer exceeded `download.timeout_secs`
    #[error("Download of {0} timed out after {1}s")]
    DownloadTimeout(String, u64),

    /// An engine run exceeded `media.timeout_secs` and was killed
    #[error("{0} timed out after {1}s")]
    EngineTimeout(String, u64),
}

impl MergeError {
    /// Pipeline stage the error is reported under in failure responses.
    pub fn stage(&self) -> &'static str {
        match self {
            MergeError::InvalidRequest(_) => "Request",
            MergeError::Download(_) | MergeError::Http(_) | MergeError::DownloadTimeout(..) => {
                "Download"
            }
            MergeError::Media(_) | MergeError::EngineTimeout(..) => "Processing",
            MergeError::Config(_) => "Configuration",
            MergeError::Io(_) | MergeError::Workspace(_) => "Workspace",
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(MergeError::Download("404".into()).stage(), "Download");
        assert_eq!(MergeError::Media("bad codec".into()).stage(), "Processing");
        assert_eq!(MergeError::DownloadTimeout("video".into(), 5).stage(), "Download");
        assert_eq!(MergeError::EngineTimeout("Muxing".into(), 5).stage(), "Processing");
        // The label is free text and does not pick the stage
        assert_eq!(
            MergeError::EngineTimeout("Download-like label".into(), 5).stage(),
            "Processing"
        );
        assert_eq!(
            MergeError::Io(std::io::Error::other("disk full")).stage(),
            "Workspace"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = MergeError::EngineTimeout("Muxing".into(), 600);
        assert_eq!(err.to_string(), "Muxing timed out after 600s");

        let err = MergeError::DownloadTimeout("audio".into(), 300);
        assert_eq!(err.to_string(), "Download of audio timed out after 300s");
    }
}
