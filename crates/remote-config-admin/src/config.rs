//! Environment-driven helpers for building the remote config client.
//!
//! Settings are read from the process environment (or any key/value iterator
//! in tests) and turned into the [`HttpClient`] inputs. Nothing here performs
//! I/O beyond reading variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::http::{Auth, HttpClient, HttpClientOptions, HttpError, DEFAULT_TIMEOUT};
use crate::service::RemoteConfig;

/// Dedicated project id for remote config calls.
const ENV_PROJECT_ID: &str = "REMOTE_CONFIG_PROJECT_ID";
/// Project id fallbacks honoured by Google Cloud tooling.
const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
const ENV_GCLOUD_PROJECT: &str = "GCLOUD_PROJECT";
/// OAuth2 access token.
const ENV_ACCESS_TOKEN: &str = "REMOTE_CONFIG_ACCESS_TOKEN";
/// Base URL override (scheme + host), e.g. for an emulator.
const ENV_ENDPOINT: &str = "REMOTE_CONFIG_ENDPOINT";
/// Allows `http://` endpoints.
const ENV_ALLOW_PLAINTEXT: &str = "REMOTE_CONFIG_ALLOW_PLAINTEXT";
/// Skips TLS certificate validation.
const ENV_NO_TLS_VALIDATION: &str = "REMOTE_CONFIG_NO_TLS_VALIDATION";
/// Per-request timeout in seconds.
const ENV_TIMEOUT_SECS: &str = "REMOTE_CONFIG_TIMEOUT_SECS";

/// Production endpoint of the remote config REST API.
pub const DEFAULT_ENDPOINT: &str = "https://firebaseremoteconfig.googleapis.com";

/// Captures environment-derived options used to build the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfigEnv {
    /// Project whose template is managed.
    pub project_id: Option<String>,
    /// Sanitised access token.
    pub access_token: Option<String>,
    /// Base URL of the REST API.
    pub endpoint: String,
    /// When `true`, `http://` endpoints are accepted.
    pub allow_plaintext: bool,
    /// When `true`, TLS certificate validation is skipped.
    pub no_tls_validation: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Reasons the environment cannot produce a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no project id configured (set REMOTE_CONFIG_PROJECT_ID or GOOGLE_CLOUD_PROJECT)")]
    MissingProjectId,
    #[error("no access token configured (set REMOTE_CONFIG_ACCESS_TOKEN)")]
    MissingAccessToken,
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl RemoteConfigEnv {
    /// Builds settings from the current process environment.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Builds settings from an iterator of key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let lookup = |key: &str| map.get(key).and_then(|value| sanitize_non_empty(value));

        let project_id = lookup(ENV_PROJECT_ID)
            .or_else(|| lookup(ENV_GOOGLE_CLOUD_PROJECT))
            .or_else(|| lookup(ENV_GCLOUD_PROJECT));
        let endpoint = lookup(ENV_ENDPOINT)
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = lookup(ENV_TIMEOUT_SECS)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            project_id,
            access_token: lookup(ENV_ACCESS_TOKEN),
            endpoint,
            allow_plaintext: parse_bool(map.get(ENV_ALLOW_PLAINTEXT).map(String::as_str), false),
            no_tls_validation: parse_bool(
                map.get(ENV_NO_TLS_VALIDATION).map(String::as_str),
                false,
            ),
            timeout,
        }
    }

    /// Builds an [`Auth`] structure when a token is available.
    pub fn to_auth(&self) -> Option<Auth> {
        self.access_token.as_ref().map(|token| Auth {
            access_token: token.clone(),
        })
    }

    pub fn client_options(&self) -> HttpClientOptions {
        HttpClientOptions {
            allow_plaintext: self.allow_plaintext,
            accept_invalid_certs: self.no_tls_validation,
            timeout: self.timeout,
        }
    }

    /// Materialises the REST client described by these settings.
    pub fn build_client(&self, sdk_version: &str) -> Result<HttpClient, ConfigError> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or(ConfigError::MissingProjectId)?;
        let auth = self.to_auth().ok_or(ConfigError::MissingAccessToken)?;
        Ok(HttpClient::new(
            self.endpoint.clone(),
            project_id,
            &auth,
            sdk_version,
            self.client_options(),
        )?)
    }

    /// Builds the service facade on top of [`RemoteConfigEnv::build_client`].
    pub fn build_service(&self, sdk_version: &str) -> Result<RemoteConfig, ConfigError> {
        Ok(RemoteConfig::new(self.build_client(sdk_version)?))
    }
}

/// Helper trimming whitespace and discarding empty values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses boolean values from strings, falling back to the provided default.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()) {
        Some(ref v) if ["1", "true", "t", "yes", "y"].contains(&v.as_str()) => true,
        Some(ref v) if ["0", "false", "f", "no", "n"].contains(&v.as_str()) => false,
        _ => default,
    }
}
