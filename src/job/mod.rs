//! One refresh-and-persist pass
//!
//! Refresh the Google access token, then overwrite the stored record.
//! Nothing is retried; if the write fails the new token is dropped and the
//! next scheduled run starts over.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{self, CredentialRecord, GoogleCredentials};
use crate::error::RefreshError;
use crate::store::CredentialStore;

/// Result object reported to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(err: &RefreshError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
        }
    }

    /// Failure before the job could be built (config, HTTP client, store).
    pub fn setup_failed(err: &anyhow::Error) -> Self {
        Self {
            success: false,
            error: Some(format!("{:#}", err)),
        }
    }
}

/// Token refresh job with its collaborators passed in
pub struct RefreshJob<S> {
    http: reqwest::Client,
    token_url: String,
    credentials: GoogleCredentials,
    store: S,
}

impl<S: CredentialStore> RefreshJob<S> {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        credentials: GoogleCredentials,
        store: S,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            store,
        }
    }

    /// Refresh the token and persist it as of `now`.
    pub async fn refresh_and_persist(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CredentialRecord, RefreshError> {
        let token =
            auth::refresh_access_token(&self.http, &self.token_url, &self.credentials).await?;
        tracing::info!(
            "Access token refreshed (expires_in={}s, scope={})",
            token.expires_in,
            token.scope
        );

        let record = CredentialRecord::from_response(&token, now);
        tracing::debug!("Record passed to store: {:?}", record);
        self.store.update_credential(&record).await?;

        Ok(record)
    }

    /// Run once and flatten the result for the scheduler.
    pub async fn run(&self) -> RunOutcome {
        match self.refresh_and_persist(Utc::now()).await {
            Ok(record) => {
                tracing::info!(
                    "Google Drive access token refreshed and updated in DB (expires_at={})",
                    record.expires_at
                );
                RunOutcome::ok()
            }
            Err(e) => {
                tracing::error!(kind = e.kind(), "Error refreshing Google Drive token: {}", e);
                RunOutcome::failed(&e)
            }
        }
    }
}
