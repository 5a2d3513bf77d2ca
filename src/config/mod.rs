//! Configuration loading
//!
//! Values come from an optional TOML file, overridden by the environment
//! variables the scheduler provisions.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::auth::{GoogleCredentials, GOOGLE_TOKEN_URL};
use crate::store::DocumentLocation;

pub const ENV_APPWRITE_ENDPOINT: &str = "APPWRITE_ENDPOINT";
pub const ENV_APPWRITE_PROJECT_ID: &str = "APPWRITE_PROJECT_ID";
pub const ENV_APPWRITE_API_KEY: &str = "APPWRITE_API_KEY";
pub const ENV_DATABASE_ID: &str = "DATABASE_ID";
pub const ENV_COLLECTION_ID: &str = "GOOGLE_REFRESH_TOKEN_COLLECTION_ID";
pub const ENV_DOCUMENT_ID: &str = "GOOGLE_DRIVE_TOKEN_DOC_ID";
pub const ENV_GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const ENV_GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const ENV_GOOGLE_REFRESH_TOKEN: &str = "GOOGLE_REFRESH_TOKEN";
pub const ENV_GOOGLE_TOKEN_URL: &str = "GOOGLE_TOKEN_URL";

/// Optional on-disk layer; every field may be omitted.
#[derive(Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    appwrite: AppwriteSection,
    google: GoogleSection,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct AppwriteSection {
    endpoint: Option<String>,
    project_id: Option<String>,
    api_key: Option<Secret<String>>,
    database_id: Option<String>,
    collection_id: Option<String>,
    document_id: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct GoogleSection {
    client_id: Option<String>,
    client_secret: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
    token_url: Option<String>,
}

/// Appwrite connection settings
pub struct AppwriteConfig {
    pub endpoint: Url,
    pub project_id: String,
    pub api_key: Secret<String>,
}

/// Google OAuth settings, checked only when a refresh needs them
pub struct GoogleSettings {
    client_id: Option<String>,
    client_secret: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
}

impl GoogleSettings {
    /// Require all three values.
    pub fn credentials(self) -> Result<GoogleCredentials> {
        Ok(GoogleCredentials {
            client_id: required(self.client_id, ENV_GOOGLE_CLIENT_ID)?,
            client_secret: required_secret(self.client_secret, ENV_GOOGLE_CLIENT_SECRET)?,
            refresh_token: required_secret(self.refresh_token, ENV_GOOGLE_REFRESH_TOKEN)?,
        })
    }
}

impl fmt::Debug for GoogleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Resolved configuration
pub struct Config {
    pub appwrite: AppwriteConfig,
    pub document: DocumentLocation,
    pub google: GoogleSettings,
    pub token_url: String,
}

impl Config {
    /// Default config file path
    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "drive-token-refresher", "drive-token-refresher")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location, if it exists) with
    /// `lookup` supplying environment values.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => Some(read_file(path)?),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Some(read_file(&path)?),
                _ => None,
            },
        };

        Self::resolve(file.unwrap_or_default(), lookup)
    }

    fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let FileConfig { appwrite, google } = file;

        let endpoint = required(
            env(ENV_APPWRITE_ENDPOINT).or(appwrite.endpoint),
            ENV_APPWRITE_ENDPOINT,
        )?;
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid {}: {}", ENV_APPWRITE_ENDPOINT, endpoint))?;

        let token_url = env(ENV_GOOGLE_TOKEN_URL)
            .or(google.token_url)
            .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());
        Url::parse(&token_url)
            .with_context(|| format!("Invalid {}: {}", ENV_GOOGLE_TOKEN_URL, token_url))?;

        Ok(Self {
            appwrite: AppwriteConfig {
                endpoint,
                project_id: required(
                    env(ENV_APPWRITE_PROJECT_ID).or(appwrite.project_id),
                    ENV_APPWRITE_PROJECT_ID,
                )?,
                api_key: required_secret(
                    env(ENV_APPWRITE_API_KEY).map(Secret::new).or(appwrite.api_key),
                    ENV_APPWRITE_API_KEY,
                )?,
            },
            document: DocumentLocation {
                database_id: required(
                    env(ENV_DATABASE_ID).or(appwrite.database_id),
                    ENV_DATABASE_ID,
                )?,
                collection_id: required(
                    env(ENV_COLLECTION_ID).or(appwrite.collection_id),
                    ENV_COLLECTION_ID,
                )?,
                document_id: required(
                    env(ENV_DOCUMENT_ID).or(appwrite.document_id),
                    ENV_DOCUMENT_ID,
                )?,
            },
            google: GoogleSettings {
                client_id: env(ENV_GOOGLE_CLIENT_ID).or(google.client_id),
                client_secret: env(ENV_GOOGLE_CLIENT_SECRET)
                    .map(Secret::new)
                    .or(google.client_secret),
                refresh_token: env(ENV_GOOGLE_REFRESH_TOKEN)
                    .map(Secret::new)
                    .or(google.refresh_token),
            },
            token_url,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.appwrite.endpoint.as_str())
            .field("project_id", &self.appwrite.project_id)
            .field("document", &self.document)
            .field("google", &self.google)
            .field("token_url", &self.token_url)
            .finish()
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("Missing required setting {}", name),
    }
}

fn required_secret(value: Option<Secret<String>>, name: &str) -> Result<Secret<String>> {
    match value {
        Some(v) if !v.expose_secret().trim().is_empty() => Ok(v),
        _ => bail!("Missing required setting {}", name),
    }
}
