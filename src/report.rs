use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::remote::Phase;
use crate::workflow::{StageFailure, VerificationOutcome, VerificationStatus};

/// What happened to one artifact during the import step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub artifact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportRecord {
    pub fn finished(artifact: &str, job_id: &str, phase: Phase) -> Self {
        Self {
            artifact: artifact.to_string(),
            job_id: Some(job_id.to_string()),
            phase: Some(phase),
            error: None,
        }
    }

    pub fn errored(artifact: &str, job_id: Option<&str>, error: impl fmt::Display) -> Self {
        Self {
            artifact: artifact.to_string(),
            job_id: job_id.map(str::to_string),
            phase: None,
            error: Some(error.to_string()),
        }
    }

    /// True for a job that ended in `failed` or never reached a terminal phase.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.phase == Some(Phase::Failed)
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub passed: usize,
    pub imports: Vec<ImportRecord>,
    /// Failing identifiers only, sorted by uri.
    pub failures: BTreeMap<String, StageFailure>,
}

impl RunReport {
    pub fn is_pass(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok` when nothing failed, otherwise an error listing every failure.
    pub fn verdict(&self) -> Result<(), VerificationFailed> {
        if self.is_pass() {
            Ok(())
        } else {
            Err(VerificationFailed {
                checked: self.checked,
                failures: self.failures.clone(),
            })
        }
    }
}

/// A failing run, carrying the diagnostics of every failed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationFailed {
    pub checked: usize,
    pub failures: BTreeMap<String, StageFailure>,
}

impl fmt::Display for VerificationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} resources failed round-trip verification:",
            self.failures.len(),
            self.checked
        )?;
        for (uri, failure) in &self.failures {
            write!(f, "\n  {uri} {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VerificationFailed {}

#[derive(Debug, Default)]
struct Tally {
    checked: usize,
    passed: usize,
    imports: Vec<ImportRecord>,
    failures: BTreeMap<String, StageFailure>,
}

/// Collects per-identifier outcomes; safe to share between concurrent workflows.
#[derive(Debug)]
pub struct ResultAggregator {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    tally: Mutex<Tally>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            tally: Mutex::new(Tally::default()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record(&self, outcome: VerificationOutcome) {
        let mut tally = self.tally.lock();
        tally.checked += 1;
        match outcome.status {
            VerificationStatus::Passed => {
                info!(uri = %outcome.uri, "PASSED");
                tally.passed += 1;
            }
            VerificationStatus::Failed(failure) => {
                info!(uri = %outcome.uri, stage = %failure.stage, "FAILED");
                debug!(uri = %outcome.uri, diagnostic = %failure.diagnostic, "failure detail");
                tally.failures.insert(outcome.uri, failure);
            }
        }
    }

    pub fn record_import(&self, record: ImportRecord) {
        self.tally.lock().imports.push(record);
    }

    pub fn imports(&self) -> Vec<ImportRecord> {
        self.tally.lock().imports.clone()
    }

    pub fn report(&self) -> RunReport {
        let tally = self.tally.lock();
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            checked: tally.checked,
            passed: tally.passed,
            imports: tally.imports.clone(),
            failures: tally.failures.clone(),
        }
    }
}
