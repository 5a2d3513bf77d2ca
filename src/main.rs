//! Drive Token Refresher - keeps a Google OAuth2 access token current
//!
//! Refreshes the token from a long-lived refresh token and writes it to a
//! single Appwrite document that other services read.

mod auth;
mod config;
mod error;
mod job;
mod store;

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::CredentialRecord;
use config::{AppwriteConfig, Config};
use job::{RefreshJob, RunOutcome};
use store::{AppwriteStore, CredentialStore, DocumentLocation};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "drive-token-refresher")]
#[command(about = "Refresh a Google OAuth2 access token and store it in Appwrite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML config file (environment variables take precedence)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the access token and update the stored record
    Run,

    /// Show the stored record's expiry without refreshing
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the run result
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let env = |name: &str| std::env::var(name).ok();

    match cli.command {
        Commands::Run => {
            tracing::info!("Refreshing Google Drive access token...");
            let outcome = run(cli.config.as_deref(), env).await;
            println!(
                "{}",
                serde_json::to_string(&outcome).context("Failed to serialize result")?
            );
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Status => {
            status(cli.config.as_deref(), env).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One scheduled pass. Setup failures are reported like refresh failures.
async fn run<F>(config_path: Option<&Path>, lookup: F) -> RunOutcome
where
    F: Fn(&str) -> Option<String>,
{
    match build_job(config_path, lookup) {
        Ok(job) => job.run().await,
        Err(e) => {
            tracing::error!("Error refreshing Google Drive token: {:#}", e);
            RunOutcome::setup_failed(&e)
        }
    }
}

fn build_job<F>(config_path: Option<&Path>, lookup: F) -> Result<RefreshJob<AppwriteStore>>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::load(config_path, lookup).context("Failed to load configuration")?;
    tracing::debug!("Loaded config: {:?}", config);

    let Config {
        appwrite,
        document,
        google,
        token_url,
    } = config;
    let credentials = google.credentials()?;

    let http = http_client()?;
    let store = open_store(http.clone(), appwrite, &document)?;
    Ok(RefreshJob::new(http, token_url, credentials, store))
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

fn open_store(
    http: reqwest::Client,
    appwrite: AppwriteConfig,
    document: &DocumentLocation,
) -> Result<AppwriteStore> {
    let store = AppwriteStore::new(
        http,
        &appwrite.endpoint,
        appwrite.project_id,
        appwrite.api_key,
        document,
    )?;
    tracing::debug!("Credential document: {}", store.document_url());
    Ok(store)
}

/// Display the stored credential record
async fn status<F>(config_path: Option<&Path>, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let Config {
        appwrite, document, ..
    } = Config::load(config_path, lookup).context("Failed to load configuration")?;
    let store = open_store(http_client()?, appwrite, &document)?;

    let record = store
        .fetch_credential()
        .await
        .context("Failed to read credential record")?;
    print!("{}", render_status(&record, Utc::now()));

    Ok(())
}

fn render_status(record: &CredentialRecord, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Token type:   {}", record.token_type);
    let _ = writeln!(out, "Scope:        {}", record.scope);
    match (record.expires_at_utc(), record.remaining_secs(now)) {
        (Some(exp), Some(remaining)) if !record.is_expired(now) => {
            let _ = writeln!(out, "Access token: valid ({}s remaining)", remaining);
            let _ = writeln!(out, "  expires_at: {}", exp.to_rfc3339());
        }
        (Some(exp), _) => {
            let _ = writeln!(out, "Access token: expired");
            let _ = writeln!(out, "  expires_at: {}", exp.to_rfc3339());
        }
        _ => {
            let _ = writeln!(out, "Access token: unknown expiry ({:?})", record.expires_at);
        }
    }
    let _ = writeln!(out, "Last updated: {}", record.last_updated);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Empty TOML file so the user's default config is never read.
    fn empty_config(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "drive-token-refresher-{}-{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, "").unwrap();
        path
    }

    fn appwrite_env(endpoint: &str) -> HashMap<&'static str, String> {
        [
            ("APPWRITE_ENDPOINT", endpoint),
            ("APPWRITE_PROJECT_ID", "proj-1"),
            ("APPWRITE_API_KEY", "key-1"),
            ("DATABASE_ID", "main"),
            ("GOOGLE_REFRESH_TOKEN_COLLECTION_ID", "google_tokens"),
            ("GOOGLE_DRIVE_TOKEN_DOC_ID", "drive"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap()
    }

    fn record(expires_at: &str) -> CredentialRecord {
        CredentialRecord {
            access_token: "abc".to_string(),
            expires_at: expires_at.to_string(),
            scope: "drive".to_string(),
            token_type: "Bearer".to_string(),
            last_updated: "2023-11-14T22:13:20.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_without_settings_reports_failure() {
        let config = empty_config("no-settings");
        let outcome = run(Some(config.as_path()), |_| None).await;

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        let error = outcome.error.unwrap();
        assert!(error.contains("APPWRITE_ENDPOINT"), "{}", error);
        assert!(error.starts_with("Failed to load configuration"), "{}", error);
    }

    #[tokio::test]
    async fn test_run_without_google_settings_reports_failure() {
        let config = empty_config("no-google");
        let env = appwrite_env("https://cloud.appwrite.io/v1");
        let outcome = run(Some(config.as_path()), |k| env.get(k).cloned()).await;

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("GOOGLE_CLIENT_ID"), "{}", error);
    }

    #[tokio::test]
    async fn test_run_with_unreadable_config_file_reports_failure() {
        let missing = std::env::temp_dir().join("drive-token-refresher-does-not-exist.toml");
        let outcome = run(Some(missing.as_path()), |_| None).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn test_run_end_to_end_from_settings() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"abc","expires_in":3600,"scope":"drive","token_type":"Bearer"}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/databases/main/collections/google_tokens/documents/drive"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"$id":"drive"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = empty_config("end-to-end");
        let mut env = appwrite_env(&format!("{}/v1", mock_server.uri()));
        env.insert("GOOGLE_CLIENT_ID", "client-123".to_string());
        env.insert("GOOGLE_CLIENT_SECRET", "s3cret".to_string());
        env.insert("GOOGLE_REFRESH_TOKEN", "1//refresh".to_string());
        env.insert("GOOGLE_TOKEN_URL", format!("{}/token", mock_server.uri()));

        let outcome = run(Some(config.as_path()), |k| env.get(k).cloned()).await;
        assert_eq!(outcome, RunOutcome::ok());
    }

    #[test]
    fn test_render_status_valid() {
        let shown = render_status(&record("1700003600000"), at(1_700_000_000_000));
        assert_eq!(
            shown,
            "Token type:   Bearer\n\
             Scope:        drive\n\
             Access token: valid (3600s remaining)\n  \
             expires_at: 2023-11-14T23:13:20+00:00\n\
             Last updated: 2023-11-14T22:13:20.000Z\n"
        );
        assert!(!shown.contains("abc"));
    }

    #[test]
    fn test_render_status_expired() {
        let shown = render_status(&record("1700003600000"), at(1_700_003_600_000));
        assert!(shown.contains("Access token: expired\n"), "{}", shown);
        assert!(shown.contains("  expires_at: 2023-11-14T23:13:20+00:00\n"), "{}", shown);
    }

    #[test]
    fn test_render_status_unknown_expiry() {
        let shown = render_status(&record("soon"), at(1_700_000_000_000));
        assert!(
            shown.contains("Access token: unknown expiry (\"soon\")\n"),
            "{}",
            shown
        );

        let shown = render_status(&record(&i64::MIN.to_string()), at(1_700_000_000_000));
        assert!(shown.contains("Access token: unknown expiry"), "{}", shown);
    }
}
