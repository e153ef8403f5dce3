use anyhow::Result;
use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::cancel::Cancellation;
use crate::config::RoundtripConfig;
use crate::error::{PollError, SetupError, SubmissionError};
use crate::poller::{JobPoller, PollSettings};
use crate::remote::{
    FolderMetadata, ImportJobService, ImportOptions, Phase, ResourceRef, ResourceStore,
    SearchFilter,
};
use crate::report::{ImportRecord, ResultAggregator, RunReport};
use crate::ui::RunProgress;
use crate::workflow::{FolderMapping, VerificationWorkflow};

/// Everything a run needs besides the service itself.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mapping: FolderMapping,
    pub destination: FolderMetadata,
    pub search: SearchFilter,
    pub import_options: ImportOptions,
    pub poll: PollSettings,
    /// Workflows in flight at once. Values above 1 assume the service
    /// tolerates concurrent writes to disjoint uris.
    pub concurrency: usize,
    pub fail_on_import_failure: bool,
    pub cleanup: bool,
}

impl RunSettings {
    pub fn from_config(config: &RoundtripConfig) -> Self {
        Self {
            mapping: config.folder_mapping(),
            destination: config.destination_metadata(),
            search: config.search_filter(),
            import_options: config.import_options(),
            poll: config.poll_settings(),
            concurrency: config.concurrency.max(1),
            fail_on_import_failure: config.fail_on_import_failure,
            cleanup: config.cleanup,
        }
    }
}

/// The capabilities and settings a run operates on, passed explicitly.
pub struct VerificationContext<'a, S, J> {
    pub store: &'a S,
    pub jobs: &'a J,
    pub settings: &'a RunSettings,
}

impl<'a, S: ResourceStore, J: ImportJobService> VerificationContext<'a, S, J> {
    pub fn new(store: &'a S, jobs: &'a J, settings: &'a RunSettings) -> Self {
        Self {
            store,
            jobs,
            settings,
        }
    }

    /// Provision, import, verify every candidate, then clean up.
    ///
    /// Cleanup runs even when setup fails. Only setup failures come back as
    /// `Err`; per-resource failures are in the returned report.
    pub async fn run(
        &self,
        artifacts: &[Artifact],
        progress: &RunProgress,
        cancel: &Cancellation,
    ) -> Result<RunReport> {
        let aggregator = ResultAggregator::new();
        info!(run_id = %aggregator.run_id(), "round-trip run started");

        self.provision_destination().await;
        let outcome = self
            .import_and_verify(artifacts, &aggregator, progress, cancel)
            .await;

        if self.settings.cleanup {
            progress.phase("cleaning up");
            let imported = aggregator.imports().iter().any(|r| r.job_id.is_some());
            self.cleanup(imported).await;
        }

        outcome?;
        let report = aggregator.report();
        info!(
            checked = report.checked,
            failed = report.failures.len(),
            "round-trip run finished"
        );
        Ok(report)
    }

    async fn import_and_verify(
        &self,
        artifacts: &[Artifact],
        aggregator: &ResultAggregator,
        progress: &RunProgress,
        cancel: &Cancellation,
    ) -> Result<()> {
        progress.phase("importing");
        self.import_artifacts(artifacts, aggregator, progress, cancel)
            .await?;

        progress.phase("listing resources");
        let candidates = self.candidates(cancel).await?;
        info!(count = candidates.len(), "resources to verify");

        progress.phase("verifying");
        self.verify_all(&candidates, aggregator, progress, cancel)
            .await;
        Ok(())
    }

    pub async fn provision_destination(&self) {
        let uri = &self.settings.mapping.destination;
        match self.store.create_folder(uri, &self.settings.destination).await {
            Ok(()) => debug!(folder = %uri, "destination folder ready"),
            Err(err) => warn!(folder = %uri, error = %err, "could not create destination folder"),
        }
    }

    /// Submit each artifact and wait for its job, one at a time.
    ///
    /// Rejections and failed jobs are recorded and logged; the step is fatal
    /// only when no artifact could be submitted at all, when
    /// `fail_on_import_failure` is set and a job fails, or when `cancel`
    /// fires. No artifact is uploaded after cancellation.
    pub async fn import_artifacts(
        &self,
        artifacts: &[Artifact],
        aggregator: &ResultAggregator,
        progress: &RunProgress,
        cancel: &Cancellation,
    ) -> Result<()> {
        if artifacts.is_empty() {
            debug!("no artifacts to import");
            return Ok(());
        }
        debug!(count = artifacts.len(), "importing artifacts");

        let poller = JobPoller::new(self.jobs, self.settings.poll.clone());
        let mut submitted = 0usize;
        for artifact in artifacts {
            if cancel.is_cancelled() {
                self.note_import(
                    aggregator,
                    progress,
                    ImportRecord::errored(&artifact.name, None, PollError::Cancelled),
                );
                break;
            }
            let submitted_job = poller
                .submit(artifact, &self.settings.import_options, cancel)
                .await;
            let handle = match submitted_job {
                Ok(handle) => handle,
                Err(SubmissionError::Cancelled) => {
                    self.note_import(
                        aggregator,
                        progress,
                        ImportRecord::errored(&artifact.name, None, SubmissionError::Cancelled),
                    );
                    break;
                }
                Err(err) => {
                    warn!(artifact = %artifact.name, error = %err, "import rejected");
                    self.note_import(aggregator, progress, ImportRecord::errored(&artifact.name, None, &err));
                    continue;
                }
            };
            submitted += 1;

            let record = match poller.await_completion(&handle, cancel).await {
                Ok(phase) => {
                    if phase == Phase::Complete {
                        debug!(artifact = %artifact.name, "import completed");
                    } else {
                        warn!(artifact = %artifact.name, %phase, "import ended without completing");
                    }
                    ImportRecord::finished(&artifact.name, &handle.id, phase)
                }
                Err(PollError::Cancelled) => {
                    self.note_import(
                        aggregator,
                        progress,
                        ImportRecord::errored(&artifact.name, Some(&handle.id), PollError::Cancelled),
                    );
                    break;
                }
                Err(err) => {
                    warn!(artifact = %artifact.name, error = %err, "gave up waiting for import");
                    ImportRecord::errored(&artifact.name, Some(&handle.id), &err)
                }
            };

            let failed = record.is_failure();
            let phase = record
                .phase
                .as_ref()
                .map(Phase::to_string)
                .or_else(|| record.error.clone())
                .unwrap_or_default();
            self.note_import(aggregator, progress, record);
            if failed && self.settings.fail_on_import_failure {
                return Err(SetupError::ImportFailed {
                    artifact: artifact.name.clone(),
                    phase,
                }
                .into());
            }
        }

        if cancel.is_cancelled() {
            warn!(submitted, "import cancelled");
            return Err(SetupError::Cancelled.into());
        }
        if submitted == 0 {
            return Err(SetupError::NothingSubmitted {
                attempted: artifacts.len(),
            }
            .into());
        }
        Ok(())
    }

    fn note_import(&self, aggregator: &ResultAggregator, progress: &RunProgress, record: ImportRecord) {
        progress.import(&record);
        aggregator.record_import(record);
    }

    /// Identifiers to verify. A failed or cancelled search is fatal.
    pub async fn candidates(&self, cancel: &Cancellation) -> Result<Vec<ResourceRef>, SetupError> {
        if cancel.is_cancelled() {
            return Err(SetupError::Cancelled);
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SetupError::Cancelled),
            res = self.store.search(&self.settings.search) => res,
        };
        result.map_err(|source| SetupError::Enumerate {
            folder: self.settings.search.folder_uri.clone(),
            source,
        })
    }

    /// Verify every candidate with at most `concurrency` workflows in flight.
    pub async fn verify_all(
        &self,
        candidates: &[ResourceRef],
        aggregator: &ResultAggregator,
        progress: &RunProgress,
        cancel: &Cancellation,
    ) {
        let workflow = VerificationWorkflow::new(self.store, &self.settings.mapping);
        stream::iter(candidates)
            .map(|candidate| workflow.verify(&candidate.uri, cancel))
            .buffer_unordered(self.settings.concurrency.max(1))
            .for_each(|outcome| {
                progress.outcome(&outcome);
                aggregator.record(outcome);
                futures::future::ready(())
            })
            .await;
    }

    /// Remove the copies, and the imported sources when this run imported them.
    pub async fn cleanup(&self, imported: bool) {
        let mut folders = vec![self.settings.mapping.destination.as_str()];
        if imported {
            folders.push(self.settings.mapping.source.as_str());
        }
        for folder in folders {
            match self.store.delete(folder).await {
                Ok(()) => debug!(folder, "deleted"),
                Err(err) => warn!(folder, error = %err, "cleanup failed"),
            }
        }
    }
}
