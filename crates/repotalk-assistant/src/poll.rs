use crate::error::{AssistantError, Result};
use crate::traits::AssistantApi;
use crate::types::{Run, RunStatus};
use repotalk_types::{RunId, ThreadId};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Fixed-interval run status poller.
///
/// `queued | in_progress` keep polling, `completed` succeeds, any other status
/// fails with [`AssistantError::RunFailed`]. The wait is bounded by `timeout`
/// and aborts early when the cancellation token fires. The task only suspends
/// between status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPoller {
    interval: Duration,
    timeout: Duration,
}

impl Default for RunPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl RunPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll until the run reaches a terminal status
    pub async fn wait(
        &self,
        api: &dyn AssistantApi,
        thread: &ThreadId,
        run: &RunId,
        cancel: &CancellationToken,
    ) -> Result<Run> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut checks: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AssistantError::Cancelled { run: run.clone() });
            }
            if Instant::now() >= deadline {
                return Err(AssistantError::PollTimeout {
                    run: run.clone(),
                    waited: started.elapsed(),
                });
            }

            let current = api.retrieve_run(thread, run).await?;
            checks += 1;

            match &current.status {
                RunStatus::Completed => {
                    tracing::debug!(run = %run, checks, elapsed_ms = %started.elapsed().as_millis(), "Run completed");
                    return Ok(current);
                }
                status if status.is_pending() => {
                    tracing::trace!(run = %run, status = %status, "Run pending");
                }
                status => {
                    return Err(AssistantError::RunFailed {
                        run: run.clone(),
                        status: status.to_string(),
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(AssistantError::Cancelled { run: run.clone() });
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
