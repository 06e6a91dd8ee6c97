use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::error::{Result, MergeError};
use crate::retention::{self, RetentionPolicy};
use crate::workflow::Workflow;

/// Run the HTTP service until Ctrl-C / SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let policy = RetentionPolicy::from_config(&config);
    let bind = config.server.bind.clone();

    let workflow = Workflow::new(config)?;
    workflow.workspace().ensure().await?;
    let engine = engine_version(&workflow).await?;
    info!(
        %engine,
        workspace = %workflow.workspace().root().display(),
        "Workspace ready"
    );

    let sweeper = retention::spawn_sweeper(workflow.workspace().clone(), policy);
    let app = api::router(AppState::new(workflow));

    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| MergeError::Config(format!("Failed to bind {}: {}", bind, e)))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server stopped");
    Ok(())
}

/// Version line of the configured engine; a missing engine fails startup.
async fn engine_version(workflow: &Workflow) -> Result<String> {
    workflow
        .media()
        .get_version_info()
        .await
        .map_err(|e| MergeError::Media(format!("Media processor not found: {}", e)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_engine_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.workspace.root = dir.path().join("ws");
        config.media.binary_path = "/nonexistent/ffmpeg".to_string();

        let workflow = Workflow::new(config).unwrap();
        match engine_version(&workflow).await {
            Err(MergeError::Media(msg)) => assert!(msg.contains("Media processor not found"), "{msg}"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
