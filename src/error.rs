//! Typed errors for the refresh pipeline

use thiserror::Error;

/// Failure talking to the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database answered with a non-success status.
    #[error("database request failed (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Appwrite error type, e.g. `document_not_found`
        kind: Option<String>,
    },

    #[error("database request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode database response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of a refresh-and-persist pass.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The token endpoint returned a non-success status.
    #[error("failed to refresh token: HTTP {status} {status_text} - {body}")]
    UpstreamAuth {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("failed to reach token endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to parse token response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("failed to persist token: {0}")]
    Persistence(#[from] StoreError),
}

impl RefreshError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamAuth { .. } => "upstream_auth",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Persistence(_) => "persistence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_message() {
        let err = RefreshError::UpstreamAuth {
            status: 400,
            status_text: "Bad Request".to_string(),
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"failed to refresh token: HTTP 400 Bad Request - {"error":"invalid_grant"}"#
        );
        assert_eq!(err.kind(), "upstream_auth");
    }

    #[test]
    fn test_persistence_wraps_store_error() {
        let err: RefreshError = StoreError::Api {
            status: 404,
            message: "Document with the requested ID could not be found.".to_string(),
            kind: Some("document_not_found".to_string()),
        }
        .into();
        assert_eq!(err.kind(), "persistence");
        assert!(err.to_string().contains("HTTP 404"));
    }
}
