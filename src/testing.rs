//! In-memory stand-ins for the remote service, shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::artifact::Artifact;
use crate::error::{FetchError, SubmissionError};
use crate::remote::{
    FolderMetadata, ImportJobService, ImportOptions, JobHandle, Phase, Resource, ResourceRef,
    ResourceStore, SearchFilter,
};

/// Build a resource at `uri` with server-style volatile fields and the given payload.
pub fn resource(uri: &str, payload: Value) -> Resource {
    Resource {
        uri: Some(uri.to_string()),
        creation_date: Some("2024-01-01T10:00:00".into()),
        update_date: Some("2024-01-01T10:00:00".into()),
        security_file: Some(json!({"uri": format!("{uri}_files/security.xml")})),
        bundles: Some(json!([{"locale": "", "file": {"uri": format!("{uri}_files/b.properties")}}])),
        payload: payload.as_object().cloned().unwrap_or_default(),
    }
}

/// Repository kept in a map, with scriptable failures.
#[derive(Default)]
pub struct MemoryStore {
    resources: Mutex<BTreeMap<String, Resource>>,
    folders: Mutex<BTreeMap<String, FolderMetadata>>,
    get_failures: Mutex<BTreeMap<String, FetchError>>,
    put_failures: Mutex<BTreeMap<String, FetchError>>,
    search_failure: Mutex<Option<FetchError>>,
    // Destinations whose stored payload gets an extra field on write.
    tampered: Mutex<BTreeSet<String>>,
    // Uris whose GET never completes.
    hanging: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource: Resource) {
        let uri = resource.uri.clone().unwrap_or_default();
        self.resources.lock().insert(uri, resource);
    }

    pub fn fail_get(&self, uri: &str, err: FetchError) {
        self.get_failures.lock().insert(uri.to_string(), err);
    }

    pub fn fail_put(&self, uri: &str, err: FetchError) {
        self.put_failures.lock().insert(uri.to_string(), err);
    }

    pub fn fail_search(&self, err: FetchError) {
        *self.search_failure.lock() = Some(err);
    }

    pub fn tamper_on_write(&self, uri: &str) {
        self.tampered.lock().insert(uri.to_string());
    }

    pub fn hang_get(&self, uri: &str) {
        self.hanging.lock().insert(uri.to_string());
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.resources.lock().contains_key(uri)
    }

    pub fn stored(&self, uri: &str) -> Option<Resource> {
        self.resources.lock().get(uri).cloned()
    }

    pub fn folder(&self, uri: &str) -> Option<FolderMetadata> {
        self.folders.lock().get(uri).cloned()
    }

    /// Every call made so far, as `"<op> <uri>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn log(&self, op: &str, uri: &str) {
        self.calls.lock().push(format!("{op} {uri}"));
    }
}

fn under(uri: &str, folder: &str) -> bool {
    uri == folder || uri.starts_with(&format!("{}/", folder.trim_end_matches('/')))
}

impl ResourceStore for MemoryStore {
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<ResourceRef>, FetchError> {
        self.log("search", &filter.folder_uri);
        if let Some(err) = self.search_failure.lock().clone() {
            return Err(err);
        }
        Ok(self
            .resources
            .lock()
            .keys()
            .filter(|uri| under(uri, &filter.folder_uri))
            .map(|uri| ResourceRef {
                uri: uri.clone(),
                label: None,
                resource_type: filter.resource_type.clone(),
            })
            .collect())
    }

    async fn get(&self, uri: &str) -> Result<Resource, FetchError> {
        self.log("get", uri);
        if self.hanging.lock().contains(uri) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.get_failures.lock().get(uri).cloned() {
            return Err(err);
        }
        self.resources
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                body: format!(r#"{{"errorCode":"resource.not.found","message":"{uri}"}}"#),
            })
    }

    async fn put(&self, uri: &str, resource: &Resource) -> Result<Resource, FetchError> {
        self.log("put", uri);
        if let Some(err) = self.put_failures.lock().get(uri).cloned() {
            return Err(err);
        }
        let mut stored = resource.clone();
        stored.uri = Some(uri.to_string());
        stored.creation_date = Some("2030-05-05T05:05:05".into());
        stored.update_date = Some("2030-05-05T05:05:06".into());
        if self.tampered.lock().contains(uri) {
            stored
                .payload
                .insert("description".into(), json!("rewritten by server"));
        }
        self.resources.lock().insert(uri.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, uri: &str) -> Result<(), FetchError> {
        self.log("delete", uri);
        self.resources.lock().retain(|key, _| !under(key, uri));
        self.folders.lock().remove(uri);
        Ok(())
    }

    async fn create_folder(&self, uri: &str, metadata: &FolderMetadata) -> Result<(), FetchError> {
        self.log("create_folder", uri);
        self.folders.lock().insert(uri.to_string(), metadata.clone());
        Ok(())
    }
}

/// Import service replaying a fixed phase script per artifact.
///
/// The job id is the artifact name. Once a script is exhausted its last
/// entry repeats.
#[derive(Default)]
pub struct ScriptedJobs {
    initial: Mutex<BTreeMap<String, Phase>>,
    rejected: Mutex<BTreeSet<String>>,
    submitted: Mutex<Vec<String>>,
    scripts: Mutex<BTreeMap<String, VecDeque<Result<Phase, FetchError>>>>,
    last: Mutex<BTreeMap<String, Result<Phase, FetchError>>>,
    status_calls: AtomicU32,
}

impl ScriptedJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, artifact: &str, initial: Phase, statuses: Vec<Result<Phase, FetchError>>) {
        self.initial.lock().insert(artifact.to_string(), initial);
        self.scripts
            .lock()
            .insert(artifact.to_string(), statuses.into_iter().collect());
    }

    pub fn reject(&self, artifact: &str) {
        self.rejected.lock().insert(artifact.to_string());
    }

    /// Names of every artifact that reached `submit`, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl ImportJobService for ScriptedJobs {
    async fn submit(
        &self,
        artifact: &Artifact,
        _options: &ImportOptions,
    ) -> Result<JobHandle, SubmissionError> {
        self.submitted.lock().push(artifact.name.clone());
        if self.rejected.lock().contains(&artifact.name) {
            return Err(SubmissionError::Rejected {
                status: 400,
                body: format!("cannot import {}", artifact.name),
            });
        }
        let phase = self
            .initial
            .lock()
            .get(&artifact.name)
            .cloned()
            .unwrap_or(Phase::Complete);
        Ok(JobHandle {
            id: artifact.name.clone(),
            phase,
        })
    }

    async fn status(&self, handle: &JobHandle) -> Result<Phase, FetchError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .scripts
            .lock()
            .get_mut(&handle.id)
            .and_then(|script| script.pop_front());
        match next {
            Some(result) => {
                self.last.lock().insert(handle.id.clone(), result.clone());
                result
            }
            None => self
                .last
                .lock()
                .get(&handle.id)
                .cloned()
                .unwrap_or(Ok(Phase::Complete)),
        }
    }
}

pub fn artifact(name: &str) -> Artifact {
    Artifact {
        name: name.to_string(),
        bytes: vec![0x50, 0x4b, 0x03, 0x04],
    }
}
