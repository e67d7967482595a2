//! Periodic garbage collection of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::provider::Provider;

/// Background task that calls [`Provider::gc`] on a fixed interval.
///
/// The first sweep runs immediately. Sweeps run on the blocking pool since
/// providers do synchronous I/O. The task stops when its cancellation token
/// fires or [`shutdown`](Self::shutdown) is called.
pub struct GcTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl GcTask {
    /// Spawn the sweeper on the current tokio runtime.
    pub fn spawn(provider: Arc<dyn Provider>, interval: Duration) -> Self {
        Self::spawn_with_token(provider, interval, CancellationToken::new())
    }

    /// Spawn the sweeper, stopping when `token` is cancelled.
    pub fn spawn_with_token(
        provider: Arc<dyn Provider>,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let child = token.clone();

        let handle = tokio::spawn(async move {
            info!(provider = %provider.name(), ?interval, "Session GC task started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let provider = Arc::clone(&provider);
                        if let Err(e) = tokio::task::spawn_blocking(move || provider.gc()).await {
                            error!(error = %e, "Session GC sweep did not complete");
                        }
                    }
                }
            }

            debug!("Session GC task stopped");
        });

        Self { token, handle }
    }

    /// Token that stops this task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task and wait for the in-flight sweep, if any, to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Session GC task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::provider::DbProvider;
    use crate::repository::{MemoryRepository, SessionRecord, SessionRepository};

    #[tokio::test]
    async fn test_sweeps_until_shutdown() {
        let clock = Arc::new(ManualClock::default());
        let repo = Arc::new(MemoryRepository::new());
        repo.insert_record(SessionRecord::new(
            "stale",
            clock.now() - ChronoDuration::seconds(120),
        ));
        repo.insert_record(SessionRecord::new("live", clock.now()));

        let provider: Arc<dyn Provider> = Arc::new(
            DbProvider::new(repo.clone(), Duration::from_secs(60)).with_clock(clock.clone()),
        );
        let task = GcTask::spawn(provider, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(60)).await;
        task.shutdown().await;

        let sweeps = repo.purge_calls();
        assert!(sweeps >= 1);
        assert!(!repo.exists("stale").unwrap());
        assert!(repo.exists("live").unwrap());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(repo.purge_calls(), sweeps);
    }

    #[tokio::test]
    async fn test_external_token_stops_task() {
        let repo = Arc::new(MemoryRepository::new());
        let provider: Arc<dyn Provider> =
            Arc::new(DbProvider::new(repo.clone(), Duration::from_secs(60)));
        let token = CancellationToken::new();
        let task = GcTask::spawn_with_token(provider, Duration::from_secs(3600), token.clone());

        token.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(task.is_finished());
        task.shutdown().await;
    }

    #[tokio::test]
    async fn test_failing_repository_keeps_running() {
        let repo = Arc::new(MemoryRepository::new());
        repo.set_failing(true);
        let provider: Arc<dyn Provider> =
            Arc::new(DbProvider::new(repo.clone(), Duration::from_secs(60)));
        let task = GcTask::spawn(provider, Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!task.is_finished());
        task.shutdown().await;
        assert!(repo.purge_calls() >= 2);
    }
}
