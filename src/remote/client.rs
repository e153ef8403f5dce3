use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    FolderMetadata, ImportOptions, ImportState, JobHandle, Phase, Resource, ResourceList,
    ResourceRef, SearchFilter,
};
use super::{ImportJobService, ResourceStore};
use crate::artifact::Artifact;
use crate::error::{FetchError, SubmissionError};

const FOLDER_MEDIA_TYPE: &str = "application/repository.folder+json";

/// JSON REST binding of [`ResourceStore`] and [`ImportJobService`].
///
/// The underlying reqwest client keeps a cookie store, so a successful
/// [`login`](RestClient::login) authenticates every later call.
pub struct RestClient {
    client: Client,
    base_url: String,
    resource_type: String,
}

impl RestClient {
    pub fn new(base_url: &str, resource_type: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource_type: resource_type.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), FetchError> {
        let response = self
            .client
            .post(format!("{}/rest/login", self.base_url))
            .form(&[("j_username", username), ("j_password", password)])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), FetchError> {
        let response = self
            .client
            .get(format!("{}/logout.html", self.base_url))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn resource_url(&self, uri: &str) -> String {
        format!("{}/rest_v2/resources{}", self.base_url, uri)
    }

    fn media_type(&self) -> String {
        format!("application/repository.{}+json", self.resource_type)
    }
}

// Turns any non-success response into `FetchError::Status`, keeping the body verbatim.
async fn check(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(FetchError::Status {
        status: status.as_u16(),
        body: error_body(response).await,
    })
}

async fn error_body(response: Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FetchError> {
    serde_json::to_vec(value).map_err(|e| FetchError::Encode(e.to_string()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

impl ResourceStore for RestClient {
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<ResourceRef>, FetchError> {
        let response = self
            .client
            .get(format!("{}/rest_v2/resources", self.base_url))
            .header(ACCEPT, "application/json")
            .query(&filter.query())
            .send()
            .await?;
        let response = check(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let list: ResourceList = decode(response).await?;
        Ok(list.resource_lookup)
    }

    async fn get(&self, uri: &str) -> Result<Resource, FetchError> {
        let response = self
            .client
            .get(self.resource_url(uri))
            .header(ACCEPT, self.media_type())
            .send()
            .await?;
        decode(check(response).await?).await
    }

    async fn put(&self, uri: &str, resource: &Resource) -> Result<Resource, FetchError> {
        let body = encode(resource)?;
        let response = self
            .client
            .put(self.resource_url(uri))
            .query(&[("createFolders", "true"), ("overwrite", "true")])
            .header(CONTENT_TYPE, self.media_type())
            .header(ACCEPT, self.media_type())
            .body(body)
            .send()
            .await?;
        decode(check(response).await?).await
    }

    async fn delete(&self, uri: &str) -> Result<(), FetchError> {
        let response = self.client.delete(self.resource_url(uri)).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn create_folder(&self, uri: &str, metadata: &FolderMetadata) -> Result<(), FetchError> {
        let body = encode(metadata)?;
        let response = self
            .client
            .put(self.resource_url(uri))
            .query(&[("createFolders", "true")])
            .header(CONTENT_TYPE, FOLDER_MEDIA_TYPE)
            .header(ACCEPT, FOLDER_MEDIA_TYPE)
            .body(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

impl ImportJobService for RestClient {
    async fn submit(
        &self,
        artifact: &Artifact,
        options: &ImportOptions,
    ) -> Result<JobHandle, SubmissionError> {
        let response = self
            .client
            .post(format!("{}/rest_v2/import", self.base_url))
            .query(&options.query())
            .header(CONTENT_TYPE, "application/zip")
            .header(ACCEPT, "application/json")
            .body(artifact.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let state: ImportState = decode(response)
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        Ok(state.into())
    }

    async fn status(&self, handle: &JobHandle) -> Result<Phase, FetchError> {
        let response = self
            .client
            .get(format!("{}/rest_v2/import/{}/state", self.base_url, handle.id))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let state: ImportState = decode(check(response).await?).await?;
        Ok(state.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MEDIA: &str = "application/repository.semanticLayerDataSource+json";

    async fn client_for(server: &MockServer) -> RestClient {
        RestClient::new(&server.uri(), "semanticLayerDataSource").unwrap()
    }

    #[tokio::test]
    async fn get_decodes_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources/temp/exportResources/sales"))
            .and(header("accept", MEDIA))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uri": "/temp/exportResources/sales",
                "label": "Sales",
                "creationDate": "2024-01-01T00:00:00"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let resource = client.get("/temp/exportResources/sales").await.unwrap();
        assert_eq!(resource.uri.as_deref(), Some("/temp/exportResources/sales"));
        assert_eq!(resource.payload["label"], json!("Sales"));
    }

    #[tokio::test]
    async fn get_failure_keeps_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string("<errorDescriptor>not found</errorDescriptor>"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get("/missing").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 404,
                body: "<errorDescriptor>not found</errorDescriptor>".into(),
            }
        );
    }

    #[tokio::test]
    async fn get_with_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get("/garbled").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn search_with_no_content_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let filter = SearchFilter {
            folder_uri: "/temp/exportResources".into(),
            resource_type: None,
            recursive: true,
        };
        assert!(client.search(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_sends_filter_and_parses_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources"))
            .and(query_param("folderUri", "/temp/exportResources"))
            .and(query_param("type", "semanticLayerDataSource"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceLookup": [
                    {"uri": "/temp/exportResources/a", "label": "A", "resourceType": "semanticLayerDataSource"},
                    {"uri": "/temp/exportResources/b"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let filter = SearchFilter {
            folder_uri: "/temp/exportResources".into(),
            resource_type: Some("semanticLayerDataSource".into()),
            recursive: true,
        };
        let refs = client.search(&filter).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].label.as_deref(), Some("A"));
        assert_eq!(refs[1].uri, "/temp/exportResources/b");
    }

    #[tokio::test]
    async fn put_uses_resource_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/rest_v2/resources/temp/copies/sales"))
            .and(header("content-type", MEDIA))
            .and(body_string_contains("\"label\":\"Sales\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "uri": "/temp/copies/sales",
                "label": "Sales"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let resource = Resource {
            payload: json!({"label": "Sales"}).as_object().unwrap().clone(),
            ..Default::default()
        };
        let stored = client.put("/temp/copies/sales", &resource).await.unwrap();
        assert_eq!(stored.uri.as_deref(), Some("/temp/copies/sales"));
    }

    #[tokio::test]
    async fn create_folder_sends_folder_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/rest_v2/resources/temp/copies"))
            .and(header("content-type", FOLDER_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let meta = FolderMetadata {
            label: "copies".into(),
            description: "Test folder".into(),
            version: 0,
        };
        client.create_folder("/temp/copies", &meta).await.unwrap();
    }

    #[tokio::test]
    async fn submit_then_poll_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest_v2/import"))
            .and(query_param("includeAccessEvents", "true"))
            .and(header("content-type", "application/zip"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "7", "phase": "inprogress"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/import/7/state"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "7", "phase": "finished"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let artifact = Artifact {
            name: "domains.zip".into(),
            bytes: vec![0x50, 0x4b, 0x03, 0x04],
        };
        let options = ImportOptions {
            include_access_events: true,
            update: false,
        };
        let handle = client.submit(&artifact, &options).await.unwrap();
        assert_eq!(handle.id, "7");
        assert_eq!(handle.phase, Phase::InProgress);
        let phase = client.status(&handle).await.unwrap();
        assert_eq!(phase, Phase::Other("finished".into()));
    }

    #[tokio::test]
    async fn submit_rejected_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest_v2/import"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid archive"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let artifact = Artifact {
            name: "broken.zip".into(),
            bytes: vec![1, 2, 3],
        };
        let err = client
            .submit(&artifact, &ImportOptions::default())
            .await
            .unwrap_err();
        match err {
            SubmissionError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid archive");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/login"))
            .and(body_string_contains("j_username=superuser"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.login("superuser", "superuser").await.unwrap();
    }

    #[tokio::test]
    async fn login_rejected_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.login("nobody", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = RestClient::new("http://host/jasperserver/", "domain").unwrap();
        assert_eq!(client.base_url(), "http://host/jasperserver");
        assert_eq!(
            client.resource_url("/a/b"),
            "http://host/jasperserver/rest_v2/resources/a/b"
        );
        assert_eq!(client.media_type(), "application/repository.domain+json");
    }

    #[test]
    fn unserializable_body_is_encode_error() {
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1u8, 2u8), "tuple keys are not JSON object keys");
        let err = encode(&bad).unwrap_err();
        assert!(matches!(err, FetchError::Encode(_)));
        assert!(err.to_string().starts_with("unserializable request: "));
    }

    #[tokio::test]
    async fn non_utf8_error_body_is_not_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest_v2/resources/binary"))
            .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![0xff, 0xfe, b'!']))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get("/binary").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        let body = err.raw_body().unwrap();
        assert!(!body.is_empty());
        assert!(body.ends_with('!'));
    }
}
