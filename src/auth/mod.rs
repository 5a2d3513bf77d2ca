//! Authentication module for Google Drive
//!
//! Refreshes the Google OAuth2 access token from a long-lived refresh
//! token and shapes it into the record other services read.

pub mod google;
pub mod tokens;

pub use google::{refresh_access_token, GOOGLE_TOKEN_URL};
pub use tokens::{CredentialRecord, TokenResponse};

use secrecy::Secret;
use std::fmt;

/// OAuth2 client credentials plus the refresh token issued at consent time
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}
