use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::artifact::Artifact;
use crate::cancel::Cancellation;
use crate::error::{FetchError, PollError, SubmissionError};
use crate::remote::{ImportJobService, ImportOptions, JobHandle, Phase};

/// Timing parameters for waiting on an import job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between two status queries.
    pub interval: Duration,
    /// Overall deadline for one job; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Extra attempts allowed for a single status query that fails transiently.
    pub max_transport_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: None,
            max_transport_retries: 3,
        }
    }
}

/// Drives import jobs to a terminal phase by polling their status.
pub struct JobPoller<'a, J> {
    jobs: &'a J,
    settings: PollSettings,
}

impl<'a, J: ImportJobService> JobPoller<'a, J> {
    pub fn new(jobs: &'a J, settings: PollSettings) -> Self {
        Self { jobs, settings }
    }

    /// Upload one artifact. Nothing is sent once `cancel` has fired.
    pub async fn submit(
        &self,
        artifact: &Artifact,
        options: &ImportOptions,
        cancel: &Cancellation,
    ) -> Result<JobHandle, SubmissionError> {
        if cancel.is_cancelled() {
            return Err(SubmissionError::Cancelled);
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubmissionError::Cancelled),
            res = self.jobs.submit(artifact, options) => res,
        };
        let handle = result?;
        debug!(artifact = %artifact.name, job = %handle.id, phase = %handle.phase, "import submitted");
        Ok(handle)
    }

    /// Wait until the job leaves `inprogress` and return the phase it ended in.
    ///
    /// `complete` and `failed` are both returned as-is; deciding what a
    /// failed import means is up to the caller.
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        cancel: &Cancellation,
    ) -> Result<Phase, PollError> {
        let wait = self.poll_until_terminal(handle, cancel);
        match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| PollError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => wait.await,
        }
    }

    async fn poll_until_terminal(
        &self,
        handle: &JobHandle,
        cancel: &Cancellation,
    ) -> Result<Phase, PollError> {
        let mut phase = handle.phase.clone();
        let mut polls = 0u32;
        while !phase.is_terminal() {
            self.pause(self.settings.interval, cancel).await?;
            phase = self.read_status(handle, cancel).await?;
            polls += 1;
            trace!(job = %handle.id, %phase, polls, "import state polled");
        }
        debug!(job = %handle.id, %phase, polls, "import reached terminal phase");
        Ok(phase)
    }

    // One fresh status query, retried while the failure looks transient.
    async fn read_status(
        &self,
        handle: &JobHandle,
        cancel: &Cancellation,
    ) -> Result<Phase, PollError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                res = self.jobs.status(handle) => res,
            };
            match result {
                Ok(phase) => return Ok(phase),
                Err(err) if is_transient(&err) && attempts <= self.settings.max_transport_retries => {
                    warn!(job = %handle.id, attempts, error = %err, "status check failed, retrying");
                    self.pause(self.settings.interval, cancel).await?;
                }
                Err(err) => {
                    return Err(PollError::Transport {
                        attempts,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    async fn pause(&self, period: Duration, cancel: &Cancellation) -> Result<(), PollError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PollError::Cancelled),
            _ = sleep(period) => Ok(()),
        }
    }
}

fn is_transient(err: &FetchError) -> bool {
    match err {
        FetchError::Transport(_) => true,
        FetchError::Status { status, .. } => *status >= 500,
        FetchError::Decode(_) | FetchError::Encode(_) | FetchError::Cancelled => false,
    }
}
