//! Tipos de dados trocados com o serviço de repositório remoto.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON.
//! [`Resource`] mantém os campos voláteis tipados e o restante do conteúdo
//! como um mapa JSON achatado, de modo que qualquer tipo de recurso do
//! catálogo do servidor passe pelo round trip sem perda.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status reported for an import job.
///
/// The set is open: the service may report values this client has never
/// seen, which are kept verbatim in [`Phase::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    Pending,
    InProgress,
    Complete,
    Failed,
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Pending => "pending",
            Phase::InProgress => "inprogress",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
            Phase::Other(s) => s,
        }
    }

    /// Only `inprogress` licenses another poll.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::InProgress)
    }
}

impl From<String> for Phase {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Phase::Pending,
            "inprogress" => Phase::InProgress,
            "complete" => Phase::Complete,
            "failed" => Phase::Failed,
            _ => Phase::Other(s),
        }
    }
}

impl From<&str> for Phase {
    fn from(s: &str) -> Self {
        Phase::from(s.to_string())
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State document returned by the import endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportState {
    pub id: String,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handle to a submitted import job, carrying the phase observed at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub phase: Phase,
}

impl From<ImportState> for JobHandle {
    fn from(state: ImportState) -> Self {
        Self {
            id: state.id,
            phase: state.phase,
        }
    }
}

/// Parameters sent along with an import submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub include_access_events: bool,
    pub update: bool,
}

impl ImportOptions {
    /// Query parameters understood by the import endpoint.
    pub fn query(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = Vec::new();
        if self.include_access_events {
            params.push(("includeAccessEvents", "true"));
        }
        if self.update {
            params.push(("update", "true"));
        }
        params
    }
}

/// A repository resource.
///
/// `uri`, the timestamps, the security descriptor and the bundles are not
/// part of a resource's logical identity; everything else lives in
/// `payload`. The derived `PartialEq` compares every field, volatile ones
/// included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_file: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundles: Option<Value>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// One entry of a repository search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Search result wrapper; the service omits the list when nothing matched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    #[serde(default)]
    pub resource_lookup: Vec<ResourceRef>,
}

/// Repository search criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub folder_uri: String,
    pub resource_type: Option<String>,
    pub recursive: bool,
}

impl SearchFilter {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("folderUri", self.folder_uri.clone())];
        if let Some(ty) = &self.resource_type {
            params.push(("type", ty.clone()));
        }
        params.push(("recursive", self.recursive.to_string()));
        params
    }
}

/// Attributes of a folder created to hold the copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: u32,
}
