use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Result, MergeError};

pub const MISSING_FIELDS: &str = "Missing video_url or audio_url";

/// Merge request body as it arrives on the wire; both fields are optional
/// here so a missing field becomes a 400 instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeRequestBody {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Validated merge request: two absolute http(s) URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRequest {
    pub video_url: String,
    pub audio_url: String,
}

impl MergeRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(video_url: S1, audio_url: S2) -> Result<Self> {
        MergeRequestBody {
            video_url: Some(video_url.into()),
            audio_url: Some(audio_url.into()),
        }
        .validate()
    }
}

impl MergeRequestBody {
    pub fn validate(self) -> Result<MergeRequest> {
        let present = |field: Option<String>| {
            field
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let (Some(video_url), Some(audio_url)) = (present(self.video_url), present(self.audio_url))
        else {
            return Err(MergeError::InvalidRequest(MISSING_FIELDS.to_string()));
        };

        check_url("video_url", &video_url)?;
        check_url("audio_url", &audio_url)?;

        Ok(MergeRequest { video_url, audio_url })
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(MergeError::InvalidRequest(format!("Invalid {}", field)))
    }
}

/// A merged file sitting in the output subarea.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub id: Uuid,
    pub path: PathBuf,
    pub size: u64,
}

impl MergeOutcome {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Success body of the merge endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResponse {
    pub request_id: Uuid,
    pub message: String,
    pub url: String,
    pub size: u64,
    pub warning: String,
    pub expires_at: DateTime<Utc>,
}

/// Instant an output kept for `ttl` after `now` becomes reclaimable,
/// saturating at the latest representable time.
pub fn expiry_after(now: DateTime<Utc>, ttl: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Error body shared by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self { error: error.into(), details: None }
    }

    pub fn with_details<S1: Into<String>, S2: Into<String>>(error: S1, details: S2) -> Self {
        Self { error: error.into(), details: Some(details.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(video: Option<&str>, audio: Option<&str>) -> MergeRequestBody {
        MergeRequestBody {
            video_url: video.map(str::to_string),
            audio_url: audio.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_fields() {
        for b in [
            body(None, Some("https://a/x.mp3")),
            body(Some("https://a/x.mp4"), None),
            body(None, None),
            body(Some("   "), Some("https://a/x.mp3")),
        ] {
            match b.validate() {
                Err(MergeError::InvalidRequest(msg)) => assert_eq!(msg, MISSING_FIELDS),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let err = MergeRequest::new("file:///etc/passwd", "https://a/x.mp3").unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: Invalid video_url");

        let err = MergeRequest::new("https://a/x.mp4", "not a url").unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: Invalid audio_url");
    }

    #[test]
    fn test_trims_urls() {
        let request = MergeRequest::new(" https://cdn.test/v.mp4 ", "http://cdn.test/a.mp3").unwrap();
        assert_eq!(request.video_url, "https://cdn.test/v.mp4");
        assert_eq!(request.audio_url, "http://cdn.test/a.mp3");
    }

    #[test]
    fn test_expiry_after() {
        let now = Utc::now();
        assert_eq!(
            expiry_after(now, std::time::Duration::from_secs(3600)),
            now + chrono::Duration::seconds(3600)
        );

        // Past the calendar range, but still accepted by chrono::Duration
        let huge = std::time::Duration::from_secs(10_000_000_000_000);
        assert_eq!(expiry_after(now, huge), DateTime::<Utc>::MAX_UTC);

        assert_eq!(
            expiry_after(now, std::time::Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("Method not allowed")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Method not allowed" }));

        let json = serde_json::to_value(ErrorResponse::with_details("Download failed", "HTTP 404")).unwrap();
        assert_eq!(json["details"], "HTTP 404");
    }
}
