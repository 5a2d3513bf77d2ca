//! Credential record storage
//!
//! The refresh job only ever overwrites one pre-provisioned document; it
//! never creates or deletes it.

pub mod appwrite;

pub use appwrite::{AppwriteStore, DocumentLocation};

use async_trait::async_trait;

use crate::auth::CredentialRecord;
use crate::error::StoreError;

/// Backend holding the single credential record
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Overwrite every field of the record.
    async fn update_credential(&self, record: &CredentialRecord) -> Result<(), StoreError>;

    /// Read the record back.
    async fn fetch_credential(&self) -> Result<CredentialRecord, StoreError>;
}
