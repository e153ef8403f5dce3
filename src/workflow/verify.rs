use tracing::debug;

use super::stage::{Stage, StageFailure, VerificationOutcome};
use crate::cancel::Cancellation;
use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::normalize::{differing_fields, logically_equal, to_comparable, to_write_safe};
use crate::remote::ResourceStore;

pub const COMPARE_MISMATCH: &str = "resources are not equal";

/// Maps uris under the source folder to the same relative path under the destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    pub source: String,
    pub destination: String,
}

impl FolderMapping {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.trim_end_matches('/').to_string(),
            destination: destination.trim_end_matches('/').to_string(),
        }
    }

    /// `None` when `uri` is not inside the source folder.
    pub fn remap(&self, uri: &str) -> Option<String> {
        let rest = uri.strip_prefix(&self.source)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(format!("{}{}", self.destination, rest))
    }
}

/// Runs fetch → write copy → fetch copy → compare for one identifier at a time.
///
/// Stages run strictly in order and the first failure ends the run for that
/// identifier; nothing is retried. The workflow holds no per-identifier
/// state, so any number of `verify` calls may be in flight at once.
pub struct VerificationWorkflow<'a, S> {
    fetcher: ResourceFetcher<'a, S>,
    mapping: &'a FolderMapping,
}

impl<'a, S: ResourceStore> VerificationWorkflow<'a, S> {
    pub fn new(store: &'a S, mapping: &'a FolderMapping) -> Self {
        Self {
            fetcher: ResourceFetcher::new(store),
            mapping,
        }
    }

    pub async fn verify(&self, uri: &str, cancel: &Cancellation) -> VerificationOutcome {
        debug!(uri, "verifying");
        match self.run_stages(uri, cancel).await {
            Ok(()) => VerificationOutcome::passed(uri),
            Err(failure) => {
                debug!(uri, stage = %failure.stage, "{} failed", failure.stage);
                for skipped in failure.stage.skipped_after() {
                    debug!(uri, stage = %skipped, "{skipped} skipped");
                }
                VerificationOutcome::failed(uri, failure)
            }
        }
    }

    async fn run_stages(&self, uri: &str, cancel: &Cancellation) -> Result<(), StageFailure> {
        let original = self
            .fetcher
            .get(uri, cancel)
            .await
            .map_err(|e| stage_error(Stage::FetchOriginal, e))?;
        debug!(uri, "fetch-original passed");

        let destination = self.mapping.remap(uri).ok_or_else(|| {
            StageFailure::new(
                Stage::WriteCopy,
                format!("{uri} is outside source folder {}", self.mapping.source),
            )
        })?;
        let clone = to_write_safe(&original);
        self.fetcher
            .put(&destination, &clone, cancel)
            .await
            .map_err(|e| stage_error(Stage::WriteCopy, e))?;
        debug!(uri, %destination, "write-copy passed");

        let copy = self
            .fetcher
            .get(&destination, cancel)
            .await
            .map_err(|e| stage_error(Stage::FetchCopy, e))?;
        debug!(uri, "fetch-copy passed");

        if cancel.is_cancelled() {
            return Err(StageFailure::new(Stage::Compare, "cancelled"));
        }
        let expected = to_comparable(&clone);
        let actual = to_comparable(&copy);
        if !logically_equal(&expected, &actual) {
            debug!(uri, fields = ?differing_fields(&expected, &actual), "copy differs");
            return Err(StageFailure::new(Stage::Compare, COMPARE_MISMATCH));
        }
        debug!(uri, "compare passed");
        Ok(())
    }
}

fn stage_error(stage: Stage, err: FetchError) -> StageFailure {
    StageFailure::new(stage, err.to_string())
}
