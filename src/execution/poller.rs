use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::{
    config::PollerConfig,
    error::{RsmError, execution_failed, missing_status},
    manager::ports::ManagerPort,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Succeeded,
    Failed,
}

/// Result of waiting on one execution. Timing out is not an error: the
/// remote work keeps running, only the local wait stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { status: String },
    TimedOut { elapsed: Duration },
}

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits until a terminal status shows up.
    pub timeout: Option<Duration>,
    pub success_statuses: Vec<String>,
    pub failure_statuses: Vec<String>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollerConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms.max(1)),
            timeout: u64::try_from(config.timeout_ms)
                .ok()
                .map(Duration::from_millis),
            success_statuses: config.success_statuses.clone(),
            failure_statuses: config.failure_statuses.clone(),
        }
    }

    pub fn classify(&self, status: &str) -> StatusClass {
        if self.success_statuses.iter().any(|known| known == status) {
            StatusClass::Succeeded
        } else if self.failure_statuses.iter().any(|known| known == status) {
            StatusClass::Failed
        } else {
            StatusClass::Pending
        }
    }

    fn expired(&self, elapsed: Duration) -> bool {
        self.timeout.is_some_and(|timeout| elapsed > timeout)
    }

    /// Checks `execution_id` every `interval` until it succeeds, fails or the
    /// timeout passes. Transport errors end the wait immediately.
    pub async fn wait(
        &self,
        manager: &dyn ManagerPort,
        execution_id: &str,
    ) -> Result<PollOutcome, RsmError> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            let elapsed = started.elapsed();
            if self.expired(elapsed) {
                tracing::error!(
                    target: "rsm.execution",
                    execution_id = %execution_id,
                    attempts = attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "execution_status_check_timed_out"
                );
                return Ok(PollOutcome::TimedOut { elapsed });
            }

            attempts += 1;
            let execution = manager.get_execution(execution_id).await.map_err(|err| {
                RsmError::new(
                    err.kind,
                    format!(
                        "error during polling execution {} state: {}",
                        execution_id, err.message
                    ),
                )
            })?;

            let Some(status) = execution.status.filter(|status| !status.is_empty()) else {
                return Err(missing_status(format!(
                    "failed to retrieve status for execution: {}",
                    execution_id
                )));
            };

            tracing::debug!(
                target: "rsm.execution",
                execution_id = %execution_id,
                status = %status,
                attempt = attempts,
                "execution_status_checked"
            );

            match self.classify(&status) {
                StatusClass::Succeeded => return Ok(PollOutcome::Succeeded { status }),
                StatusClass::Failed => {
                    return Err(execution_failed(format!(
                        "execution {} failed with status '{}', check the manager logs for details",
                        execution_id, status
                    )));
                }
                StatusClass::Pending => sleep(self.interval).await,
            }
        }
    }
}
