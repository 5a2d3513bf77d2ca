//! Appwrite Databases REST backend
//!
//! Talks to `{endpoint}/databases/{db}/collections/{collection}/documents/{doc}`
//! with a server API key.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use url::Url;

use super::CredentialStore;
use crate::auth::CredentialRecord;
use crate::error::StoreError;

/// Identifies the one credential document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub database_id: String,
    pub collection_id: String,
    pub document_id: String,
}

/// Error envelope Appwrite returns with non-2xx responses
#[derive(Debug, Deserialize)]
struct AppwriteError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Credential store backed by an Appwrite document.
pub struct AppwriteStore {
    http: reqwest::Client,
    document_url: Url,
    project_id: String,
    api_key: Secret<String>,
}

impl AppwriteStore {
    pub fn new(
        http: reqwest::Client,
        endpoint: &Url,
        project_id: String,
        api_key: Secret<String>,
        location: &DocumentLocation,
    ) -> Result<Self> {
        let mut document_url = endpoint.clone();
        document_url
            .path_segments_mut()
            .map_err(|_| anyhow!("Appwrite endpoint is not a base URL: {}", endpoint))?
            .pop_if_empty()
            .extend([
                "databases",
                location.database_id.as_str(),
                "collections",
                location.collection_id.as_str(),
                "documents",
                location.document_id.as_str(),
            ]);

        Ok(Self {
            http,
            document_url,
            project_id,
            api_key,
        })
    }

    pub fn document_url(&self) -> &Url {
        &self.document_url
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.document_url.clone())
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", self.api_key.expose_secret())
    }
}

#[async_trait]
impl CredentialStore for AppwriteStore {
    async fn update_credential(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        tracing::debug!("Appwrite PATCH {}", self.document_url);

        let resp = self
            .request(reqwest::Method::PATCH)
            .json(&serde_json::json!({ "data": record }))
            .send()
            .await?;

        check_response(resp).await?;
        Ok(())
    }

    async fn fetch_credential(&self) -> Result<CredentialRecord, StoreError> {
        tracing::debug!("Appwrite GET {}", self.document_url);

        let resp = self.request(reqwest::Method::GET).send().await?;
        let body = check_response(resp).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-success response onto `StoreError::Api`.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await?;
    let (message, kind) = match serde_json::from_str::<AppwriteError>(&body) {
        Ok(err) => (err.message, err.kind),
        Err(_) => (body, None),
    };
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
        kind,
    })
}
