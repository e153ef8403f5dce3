use std::fmt;

use serde::{Deserialize, Serialize};

/// The four stages of a round-trip verification.
///
/// Each identifier flows through: FETCH_ORIGINAL → WRITE_COPY → FETCH_COPY → COMPARE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    FetchOriginal,
    WriteCopy,
    FetchCopy,
    Compare,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::FetchOriginal,
        Stage::WriteCopy,
        Stage::FetchCopy,
        Stage::Compare,
    ];

    /// Stages that never run once this one has failed.
    pub fn skipped_after(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().filter(move |s| *s > self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FetchOriginal => write!(f, "fetch-original"),
            Stage::WriteCopy => write!(f, "write-copy"),
            Stage::FetchCopy => write!(f, "fetch-copy"),
            Stage::Compare => write!(f, "compare"),
        }
    }
}

/// The first stage that failed and what it reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub diagnostic: String,
}

impl StageFailure {
    pub fn new(stage: Stage, diagnostic: impl Into<String>) -> Self {
        Self {
            stage,
            diagnostic: diagnostic.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.diagnostic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Failed(StageFailure),
}

/// Result of verifying one identifier; created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub uri: String,
    pub status: VerificationStatus,
}

impl VerificationOutcome {
    pub fn passed(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            status: VerificationStatus::Passed,
        }
    }

    pub fn failed(uri: &str, failure: StageFailure) -> Self {
        Self {
            uri: uri.to_string(),
            status: VerificationStatus::Failed(failure),
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            VerificationStatus::Passed => None,
            VerificationStatus::Failed(failure) => Some(failure),
        }
    }
}
