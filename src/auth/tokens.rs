//! Token response and the persisted credential record

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Successful response from the Google token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    pub scope: String,
    pub token_type: String,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The single document holding the current access token.
///
/// Every field is written on each refresh; nothing from the previous
/// version of the document survives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    /// Milliseconds since the Unix epoch, as a decimal string
    pub expires_at: String,
    pub scope: String,
    pub token_type: String,
    /// RFC 3339 UTC instant of the write
    pub last_updated: String,
}

impl CredentialRecord {
    /// Build the record for a token obtained at `now`.
    pub fn from_response(token: &TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_in_ms = i64::try_from(token.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = now.timestamp_millis().saturating_add(expires_in_ms);

        Self {
            access_token: token.access_token.clone(),
            expires_at: expires_at.to_string(),
            scope: token.scope.clone(),
            token_type: token.token_type.clone(),
            last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Expiry as milliseconds since the epoch, if the stored string parses.
    pub fn expires_at_millis(&self) -> Option<i64> {
        self.expires_at.trim().parse().ok()
    }

    /// Expiry as a UTC instant.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at_millis()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// An unparseable expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_millis() {
            Some(exp) => now.timestamp_millis() >= exp,
            None => true,
        }
    }

    /// Seconds until expiry (negative once expired).
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at_millis()
            .map(|exp| exp.saturating_sub(now.timestamp_millis()) / 1000)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("last_updated", &self.last_updated)
            .finish()
    }
}
