//! Refresh-token grant against Google's OAuth2 token endpoint

use secrecy::ExposeSecret;

use super::{GoogleCredentials, TokenResponse};
use crate::error::RefreshError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Exchange the stored refresh token for a fresh access token.
///
/// The body is read once, before the status is checked, so the error path
/// can carry the provider's payload verbatim.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    token_url: &str,
    credentials: &GoogleCredentials,
) -> Result<TokenResponse, RefreshError> {
    tracing::debug!("Requesting access token from {}", token_url);

    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.expose_secret().as_str()),
        ("refresh_token", credentials.refresh_token.expose_secret().as_str()),
        ("grant_type", "refresh_token"),
    ];

    let resp = http
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(RefreshError::Transport)?;

    let status = resp.status();
    let body = resp.text().await.map_err(RefreshError::Transport)?;

    if !status.is_success() {
        tracing::debug!("Token endpoint returned HTTP {}: {}", status.as_u16(), body);
        return Err(RefreshError::UpstreamAuth {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(RefreshError::InvalidResponse)?;
    tracing::debug!("Token endpoint response: {:?}", token);
    Ok(token)
}
