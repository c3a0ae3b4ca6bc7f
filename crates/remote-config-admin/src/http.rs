//! REST client for the remote config backend.
//!
//! Handles header construction, bearer-token rotation, status classification
//! and redacted request logging. Template responses carry their etag in the
//! `ETag` header; the client folds it back into the returned record so the
//! normalizers see a single JSON document.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::api::{ListVersionsOptions, PublishOptions, RemoteConfigApi};
use crate::template::Template;

/// Header identifying the client library to the backend.
const CLIENT_HEADER: &str = "X-Firebase-Client";
/// Suffix appended to the project path for rollbacks.
const ROLLBACK_SUFFIX: &str = ":rollback";
/// Suffix appended to the project path for version listing.
const LIST_VERSIONS_SUFFIX: &str = ":listVersions";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Authentication material attached to every request.
#[derive(Debug, Clone)]
pub struct Auth {
    /// OAuth2 access token sent as `Authorization: Bearer <token>`.
    pub access_token: String,
}

/// Additional options governing how the HTTP client is constructed.
#[derive(Debug, Clone, Copy)]
pub struct HttpClientOptions {
    /// Whether plaintext (HTTP) endpoints are allowed, e.g. for a local emulator.
    pub allow_plaintext: bool,
    /// Whether TLS certificate validation should be skipped.
    pub accept_invalid_certs: bool,
    /// Timeout applied to each request.
    pub timeout: Duration,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            allow_plaintext: false,
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Failures raised by the REST transport.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Credentials were missing, expired or lacked permission (401/403).
    #[error("unauthorized or forbidden: status {0}")]
    Unauthorized(u16),
    /// The project or requested version does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The etag no longer matches the server state (409/412).
    #[error("etag mismatch: {0}")]
    Conflict(String),
    /// The backend refused the request (server-side validation and other 4xx).
    #[error("request rejected with status {status} ({code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
    /// Backend reported a temporary or internal failure (5xx).
    #[error("transient backend error: status {0}")]
    Retryable(u16),
    /// The provided URL violates the required transport policy.
    #[error("insecure base url requires explicit opt-in: {0}")]
    InsecureUrl(String),
    /// A credential or header value cannot be encoded as an HTTP header.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    /// Transport-level issue (DNS, TLS, socket, timeout, etc.).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response payload is not valid JSON.
    #[error("failed to decode JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error envelope returned by the backend (`{"error": {...}}`).
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client encapsulating a reusable `reqwest::Client`, project path and headers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    project_id: String,
    /// Shared header map guarded by a read/write lock for credential rotation.
    headers: Arc<RwLock<HeaderMap>>,
}

impl HttpClient {
    /// Builds a client for `project_id` against `base_url` (scheme + host).
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        auth: &Auth,
        sdk_version: &str,
        options: HttpClientOptions,
    ) -> Result<Self, HttpError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !options.allow_plaintext && base_url.starts_with("http://") {
            return Err(HttpError::InsecureUrl(base_url));
        }

        let mut headers = HeaderMap::new();
        let user_agent = format!("remote-config-admin-rust/{sdk_version}");
        headers.insert(USER_AGENT, header_value(&user_agent, "user-agent")?);
        headers.insert(CLIENT_HEADER, header_value(&user_agent, CLIENT_HEADER)?);
        headers.insert(AUTHORIZATION, bearer(&auth.access_token)?);

        // Redirects are never followed; a 3xx reaches `classify_status`.
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url,
            project_id: project_id.into(),
            headers: Arc::new(RwLock::new(headers)),
        })
    }

    /// Replaces the access token used for subsequent requests.
    pub async fn update_access_token(&self, access_token: &str) -> Result<(), HttpError> {
        let value = bearer(access_token)?;
        let mut headers = self.headers.write().await;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Returns the base URL currently configured for the client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Full URL of the project's remote config resource, plus an optional
    /// custom-method suffix (`:rollback`, `:listVersions`).
    fn resource_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/remoteConfig{}",
            self.base_url, self.project_id, suffix
        )
    }

    /// Attaches headers, sends the request and classifies the HTTP status.
    async fn send_request(
        &self,
        method: Method,
        url: String,
        query: &[(&str, String)],
        if_match: Option<&str>,
        body: Option<Value>,
    ) -> Result<reqwest::Response, HttpError> {
        // Clone headers under the read lock so it is not held across the request.
        let mut headers = self.headers.read().await.clone();
        if let Some(etag) = if_match {
            headers.insert(IF_MATCH, header_value(etag, "if-match")?);
        }
        if body.is_some() {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
        }

        let body_bytes = body.map(|value| value.to_string().into_bytes());
        let body_len = body_bytes.as_ref().map(Vec::len).unwrap_or(0);
        let preview = body_bytes
            .as_deref()
            .map(request_body_preview)
            .unwrap_or_default();
        tracing::debug!(
            method = %method,
            url = %url,
            query = ?query,
            headers = ?redact_headers(&headers),
            body_len = body_len,
            body = %preview,
            "remote-config HTTP request"
        );

        let mut builder = self.client.request(method.clone(), &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(bytes) = body_bytes {
            builder = builder.body(bytes);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            tracing::debug!(
                method = %method,
                url = %url,
                status = %status,
                body = %truncate_preview_text(String::from_utf8_lossy(&body)),
                "remote-config HTTP response"
            );
            return Err(classify_status(status, &body));
        }

        tracing::debug!(
            method = %method,
            url = %url,
            status = %status,
            "remote-config HTTP response"
        );
        Ok(response)
    }

    /// Decodes a template response, inserting the `ETag` header into the record.
    async fn template_response(response: reqwest::Response) -> Result<Value, HttpError> {
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let mut body = json_body(response).await?;
        match (etag, body.as_object_mut()) {
            (Some(etag), Some(record)) => {
                record.insert("etag".into(), Value::String(etag));
            }
            (None, _) => tracing::warn!("remote-config response did not carry an ETag header"),
            (Some(_), None) => {}
        }
        Ok(body)
    }
}

#[async_trait]
impl RemoteConfigApi for HttpClient {
    async fn get_template(&self) -> Result<Value, HttpError> {
        let response = self
            .send_request(Method::GET, self.resource_url(""), &[], None, None)
            .await?;
        Self::template_response(response).await
    }

    async fn get_template_at_version(&self, version_number: i64) -> Result<Value, HttpError> {
        let query = [("versionNumber", version_number.to_string())];
        let response = self
            .send_request(Method::GET, self.resource_url(""), &query, None, None)
            .await?;
        Self::template_response(response).await
    }

    async fn validate_template(&self, template: &Template) -> Result<Value, HttpError> {
        let query = [("validate_only", "true".to_string())];
        let response = self
            .send_request(
                Method::PUT,
                self.resource_url(""),
                &query,
                Some(template.etag()),
                Some(publish_body(template)),
            )
            .await?;
        // A dry run answers with a derived etag that cannot guard a later
        // publish, so the caller's etag is carried over instead.
        let mut body = json_body(response).await?;
        if let Some(record) = body.as_object_mut() {
            record.insert("etag".into(), Value::String(template.etag().to_string()));
        }
        Ok(body)
    }

    async fn publish_template(
        &self,
        template: &Template,
        options: PublishOptions,
    ) -> Result<Value, HttpError> {
        let if_match = if options.force { "*" } else { template.etag() };
        let response = self
            .send_request(
                Method::PUT,
                self.resource_url(""),
                &[],
                Some(if_match),
                Some(publish_body(template)),
            )
            .await?;
        Self::template_response(response).await
    }

    async fn rollback(&self, version_number: i64) -> Result<Value, HttpError> {
        let body = json!({ "versionNumber": version_number.to_string() });
        let response = self
            .send_request(
                Method::POST,
                self.resource_url(ROLLBACK_SUFFIX),
                &[],
                None,
                Some(body),
            )
            .await?;
        Self::template_response(response).await
    }

    async fn list_versions(&self, options: &ListVersionsOptions) -> Result<Value, HttpError> {
        let response = self
            .send_request(
                Method::GET,
                self.resource_url(LIST_VERSIONS_SUFFIX),
                &list_versions_query(options),
                None,
                None,
            )
            .await?;
        json_body(response).await
    }
}

/// Request body for validate/publish. The etag travels in `If-Match`, and of
/// the version metadata only the caller-controlled description is sent.
fn publish_body(template: &Template) -> Value {
    let mut body = Map::new();
    body.insert("conditions".into(), Value::Array(template.conditions.clone()));
    body.insert(
        "parameters".into(),
        Value::Object(template.parameters.clone()),
    );
    body.insert(
        "parameterGroups".into(),
        Value::Object(template.parameter_groups.clone()),
    );
    if let Some(description) = template
        .version
        .as_ref()
        .and_then(|version| version.description())
    {
        body.insert("version".into(), json!({ "description": description }));
    }
    Value::Object(body)
}

fn list_versions_query(options: &ListVersionsOptions) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(page_size) = options.page_size {
        query.push(("pageSize", page_size.to_string()));
    }
    if let Some(token) = &options.page_token {
        query.push(("pageToken", token.clone()));
    }
    if let Some(end) = &options.end_version_number {
        query.push(("endVersionNumber", end.to_string()));
    }
    if let Some(start_time) = &options.start_time {
        query.push(("startTime", start_time.clone()));
    }
    if let Some(end_time) = &options.end_time {
        query.push(("endTime", end_time.clone()));
    }
    query
}

async fn json_body(response: reqwest::Response) -> Result<Value, HttpError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn header_value(value: &str, name: &'static str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeader(name))
}

fn bearer(access_token: &str) -> Result<HeaderValue, HttpError> {
    let mut value = header_value(&format!("Bearer {access_token}"), "authorization")?;
    value.set_sensitive(true);
    Ok(value)
}

/// Maps a non-success status (and its body) to the transport error taxonomy.
fn classify_status(status: StatusCode, body: &[u8]) -> HttpError {
    let envelope = serde_json::from_slice::<ErrorEnvelope>(body).ok();
    let code = envelope
        .as_ref()
        .and_then(|e| e.error.status.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let message = envelope
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HttpError::Unauthorized(status.as_u16()),
        StatusCode::NOT_FOUND => HttpError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => HttpError::Conflict(message),
        s if s.is_server_error() => HttpError::Retryable(s.as_u16()),
        // Unexpected redirects and the remaining 4xx codes are refusals.
        s => HttpError::Rejected {
            status: s.as_u16(),
            code,
            message,
        },
    }
}

/// Returns a redacted view of request headers suitable for debug logging.
fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-goog-api-key"];

    headers
        .iter()
        .map(|(name, value)| {
            let lower = name.as_str().to_ascii_lowercase();
            let display = if SENSITIVE_HEADERS.contains(&lower.as_str()) {
                "<redacted>".to_string()
            } else {
                value
                    .to_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| "<non-utf8>".to_string())
            };
            (lower, display)
        })
        .collect()
}

fn request_body_preview(body: &[u8]) -> String {
    truncate_preview_text(String::from_utf8_lossy(body))
}

fn truncate_preview_text(text: Cow<'_, str>) -> String {
    const MAX_CHARS: usize = 1024;
    let mut chars = text.chars();
    let mut preview = String::new();
    for _ in 0..MAX_CHARS {
        match chars.next() {
            Some(ch) => preview.push(ch),
            None => return preview,
        }
    }
    if chars.next().is_some() {
        preview.push('…');
    }
    preview
}
