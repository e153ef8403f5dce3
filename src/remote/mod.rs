//! Capability boundary to the remote repository service.
//!
//! The verification core only talks to the service through [`ResourceStore`]
//! and [`ImportJobService`]; [`RestClient`] is the default binding.

pub mod client;
pub mod types;

pub use client::RestClient;
pub use types::{
    FolderMetadata, ImportOptions, JobHandle, Phase, Resource, ResourceRef, SearchFilter,
};

use crate::artifact::Artifact;
use crate::error::{FetchError, SubmissionError};

/// Repository operations on resources addressed by uri.
#[allow(async_fn_in_trait)]
pub trait ResourceStore {
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<ResourceRef>, FetchError>;

    async fn get(&self, uri: &str) -> Result<Resource, FetchError>;

    /// Create or replace the resource at `uri`, returning what the server stored.
    async fn put(&self, uri: &str, resource: &Resource) -> Result<Resource, FetchError>;

    async fn delete(&self, uri: &str) -> Result<(), FetchError>;

    async fn create_folder(&self, uri: &str, metadata: &FolderMetadata) -> Result<(), FetchError>;
}

/// Asynchronous ingestion of artifacts.
#[allow(async_fn_in_trait)]
pub trait ImportJobService {
    async fn submit(
        &self,
        artifact: &Artifact,
        options: &ImportOptions,
    ) -> Result<JobHandle, SubmissionError>;

    /// Fresh status query for a submitted job.
    async fn status(&self, handle: &JobHandle) -> Result<Phase, FetchError>;
}
