use tracing::{debug, trace};

use crate::cancel::Cancellation;
use crate::error::FetchError;
use crate::remote::{Resource, ResourceStore};

/// Resource reads and writes that honour cancellation and log failures.
///
/// Failures come back as classified [`FetchError`]s; the raw body of a
/// non-success response is logged at trace level and kept in the error.
pub struct ResourceFetcher<'a, S> {
    store: &'a S,
}

impl<'a, S: ResourceStore> ResourceFetcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn get(&self, uri: &str, cancel: &Cancellation) -> Result<Resource, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            res = self.store.get(uri) => res,
        };
        if let Err(err) = &result {
            report_failure("GET", uri, err);
        }
        result
    }

    pub async fn put(
        &self,
        uri: &str,
        resource: &Resource,
        cancel: &Cancellation,
    ) -> Result<Resource, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            res = self.store.put(uri, resource) => res,
        };
        if let Err(err) = &result {
            report_failure("PUT", uri, err);
        }
        result
    }
}

fn report_failure(op: &str, uri: &str, err: &FetchError) {
    match err.status() {
        Some(status) => debug!(uri, status, "{op} failed"),
        None => debug!(uri, error = %err, "{op} failed"),
    }
    if let Some(body) = err.raw_body() {
        trace!(uri, body, "{op} error body");
    }
}
