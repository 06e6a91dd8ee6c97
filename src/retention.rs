use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::workspace::Workspace;

/// When scratch files become reclaimable
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub output_ttl: Duration,
    /// Input directories only outlive a request when the process died
    /// mid-request, so they are kept at least as long as a request may run.
    pub input_ttl: Duration,
    pub interval: Duration,
}

impl RetentionPolicy {
    pub fn from_config(config: &Config) -> Self {
        let longest_request = config
            .download
            .timeout()
            .saturating_mul(2)
            .saturating_add(config.media.timeout());
        Self {
            output_ttl: config.workspace.output_ttl(),
            input_ttl: longest_request.max(config.workspace.output_ttl()),
            interval: config.workspace.sweep_interval(),
        }
    }
}

/// Counts of what one sweep reclaimed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub outputs: usize,
    pub stale_inputs: usize,
}

/// Remove expired outputs, plus input directories a crashed process left
/// behind.
pub fn sweep(workspace: &Workspace, policy: &RetentionPolicy) -> SweepReport {
    let now = SystemTime::now();
    let mut report = SweepReport::default();

    for entry in WalkDir::new(workspace.output_dir())
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && is_expired(entry.path(), now, policy.output_ttl) {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => report.outputs += 1,
                Err(error) => warn!(path = %entry.path().display(), %error, "Failed to remove expired output"),
            }
        }
    }

    for entry in WalkDir::new(workspace.input_dir())
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() && is_expired(entry.path(), now, policy.input_ttl) {
            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => report.stale_inputs += 1,
                Err(error) => warn!(path = %entry.path().display(), %error, "Failed to remove stale inputs"),
            }
        }
    }

    report
}

fn is_expired(path: &Path, now: SystemTime, ttl: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age >= ttl)
}

/// Run `sweep` every `policy.interval` on the blocking pool.
pub fn spawn_sweeper(workspace: Workspace, policy: RetentionPolicy) -> JoinHandle<()> {
    info!(
        ttl_secs = policy.output_ttl.as_secs(),
        interval_secs = policy.interval.as_secs(),
        "Output retention sweeper started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let ws = workspace.clone();
            match tokio::task::spawn_blocking(move || sweep(&ws, &policy)).await {
                Ok(report) if report != SweepReport::default() => {
                    info!(outputs = report.outputs, stale_inputs = report.stale_inputs, "Reclaimed scratch files");
                }
                Ok(_) => debug!("Nothing to reclaim"),
                Err(error) => warn!(%error, "Retention sweep panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(ttl: Duration) -> RetentionPolicy {
        RetentionPolicy { output_ttl: ttl, input_ttl: ttl, interval: Duration::from_secs(1) }
    }

    #[tokio::test]
    async fn test_sweep_respects_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::at(dir.path());
        workspace.ensure().await.unwrap();

        let output = workspace.output_dir().join("a.mp4");
        std::fs::write(&output, b"merged").unwrap();
        std::fs::create_dir(workspace.input_dir().join("leftover")).unwrap();

        let report = sweep(&workspace, &policy(Duration::from_secs(3600)));
        assert_eq!(report, SweepReport::default());
        assert!(output.exists());

        let report = sweep(&workspace, &policy(Duration::ZERO));
        assert_eq!(report, SweepReport { outputs: 1, stale_inputs: 1 });
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(workspace.input_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_inputs_outlive_longest_request() {
        let mut config = Config::default();
        config.workspace.output_ttl_secs = 10;
        config.download.timeout_secs = 100;
        config.media.timeout_secs = 50;

        let policy = RetentionPolicy::from_config(&config);
        assert_eq!(policy.output_ttl, Duration::from_secs(10));
        assert_eq!(policy.input_ttl, Duration::from_secs(250));
    }

    #[test]
    fn test_policy_saturates_on_unchecked_config() {
        let mut config = Config::default();
        config.download.timeout_secs = u64::MAX;
        config.media.timeout_secs = u64::MAX;

        let policy = RetentionPolicy::from_config(&config);
        assert_eq!(policy.input_ttl, Duration::MAX);
        assert_eq!(policy.output_ttl, config.workspace.output_ttl());
    }

    #[test]
    fn test_sweep_missing_workspace() {
        let workspace = Workspace::at("/nonexistent/avmerge-workspace");
        assert_eq!(sweep(&workspace, &policy(Duration::ZERO)), SweepReport::default());
    }
}
