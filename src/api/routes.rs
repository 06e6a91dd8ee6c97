use axum::body::{Body, Bytes};
use axum::extract::{Extension, Path as AxumPath};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use mime_guess::from_path;
use serde_json::json;
use std::io::ErrorKind;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use super::AppState;
use crate::error::MergeError;
use crate::model::{
    ErrorResponse, MergeOutcome, MergeRequestBody, MergeResponse, MISSING_FIELDS, expiry_after,
};

impl IntoResponse for MergeError {
    fn into_response(self) -> Response {
        match self {
            MergeError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_details(
                    format!("{} failed", other.stage()),
                    other.to_string(),
                )),
            )
                .into_response(),
        }
    }
}

pub(crate) async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
}

pub(crate) async fn merge(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    if body.iter().all(u8::is_ascii_whitespace) {
        return MergeError::InvalidRequest(MISSING_FIELDS.to_string()).into_response();
    }

    let body = match serde_json::from_slice::<MergeRequestBody>(&body) {
        Ok(body) => body,
        Err(error) => {
            debug!(%error, "Rejected merge body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_details("Invalid request body", error.to_string())),
            )
                .into_response();
        }
    };

    let request = match body.validate() {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    info!(video_url = %request.video_url, audio_url = %request.audio_url, "Merge requested");

    match state.workflow.merge(&request).await {
        Ok(outcome) => (StatusCode::OK, Json(success_body(&state, &outcome))).into_response(),
        Err(error) => error.into_response(),
    }
}

fn success_body(state: &AppState, outcome: &MergeOutcome) -> MergeResponse {
    let ttl = state.workflow.config().workspace.output_ttl();
    let expires_at = expiry_after(Utc::now(), ttl);

    MergeResponse {
        request_id: outcome.id,
        message: "Merge succeeded".to_string(),
        url: state.output_url(&outcome.file_name()),
        size: outcome.size,
        warning: format!(
            "The merged file lives in temporary storage and is removed after {} seconds; \
             download it and store it elsewhere if you need to keep it",
            ttl.as_secs()
        ),
        expires_at,
    }
}

pub(crate) async fn serve_output(
    Extension(state): Extension<AppState>,
    AxumPath(file_name): AxumPath<String>,
) -> Response {
    let Some(path) = state.workflow.workspace().resolve_output(&file_name) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid file name")),
        )
            .into_response();
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found"))).into_response();
        }
        Err(error) => return MergeError::Io(error).into_response(),
    };

    let length = match file.metadata().await {
        Ok(metadata) => metadata.len(),
        Err(error) => return MergeError::Io(error).into_response(),
    };
    let mime = from_path(&path).first_or_octet_stream();

    debug!(file = %file_name, length, "Serving merged output");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

pub(crate) async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    match state.workflow.media().get_version_info().await {
        Ok(version) => (StatusCode::OK, Json(json!({ "status": "ok", "engine": version }))),
        Err(err) => {
            error!(%err, "Media engine unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "engine": err.to_string() })),
            )
        }
    }
}
