mod middleware;
mod routes;

pub use middleware::log_request_errors;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::workflow::Workflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }

    /// Retrieval URL of a merged output
    pub fn output_url(&self, file_name: &str) -> String {
        let base = self.workflow.config().server.public_base_url.trim_end_matches('/');
        format!("{}/outputs/{}", base, file_name)
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.workflow.config().server.request_body_limit;

    let merge = post(routes::merge).fallback(routes::method_not_allowed);

    Router::new()
        .route("/merge", merge.clone())
        .route("/api/merge", merge)
        .route("/outputs/{file}", get(routes::serve_output))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(log_request_errors))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
