//! Public facade over the remote config backend.
//!
//! Every operation is a single round trip through a [`RemoteConfigApi`]
//! implementation followed by normalization of the raw record. Nothing is
//! cached between calls, so a [`RemoteConfig`] can be cloned and shared
//! freely across tasks.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::api::{ListVersionsOptions, PublishOptions, RemoteConfigApi};
use crate::http::HttpError;
use crate::template::Template;
use crate::validator::{self, ISO_DATE_FORMAT};
use crate::version::{Version, VersionNumber};

/// Largest page the backend serves for version listings.
pub const MAX_PAGE_SIZE: u32 = 300;

/// Errors returned by the facade.
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    /// A value failed a shape, type or format check.
    #[error("invalid-argument: {0}")]
    InvalidArgument(String),
    /// Failure reported by the transport, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] HttpError),
}

/// One page of version metadata, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsResult {
    pub versions: Vec<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Typed entry point for managing a project's remote config template.
#[derive(Clone)]
pub struct RemoteConfig {
    api: Arc<dyn RemoteConfigApi>,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig").finish_non_exhaustive()
    }
}

impl RemoteConfig {
    /// Wraps a transport implementation.
    pub fn new(api: impl RemoteConfigApi + 'static) -> Self {
        Self { api: Arc::new(api) }
    }

    /// Wraps a transport that is already shared elsewhere.
    pub fn from_shared(api: Arc<dyn RemoteConfigApi>) -> Self {
        Self { api }
    }

    /// Fetches the active template.
    pub async fn get_template(&self) -> Result<Template, RemoteConfigError> {
        let raw = self.api.get_template().await?;
        let template = Template::from_value(&raw)?;
        debug!(etag = template.etag(), "remote-config template fetched");
        Ok(template)
    }

    /// Fetches the template as published at `version_number`.
    pub async fn get_template_at_version(
        &self,
        version_number: impl Into<VersionNumber>,
    ) -> Result<Template, RemoteConfigError> {
        let version_number = version_number.into().validate()?;
        let raw = self.api.get_template_at_version(version_number).await?;
        let template = Template::from_value(&raw)?;
        debug!(
            etag = template.etag(),
            version_number, "remote-config historical template fetched"
        );
        Ok(template)
    }

    /// Asks the backend to validate `template` without publishing it.
    ///
    /// The returned template keeps the etag of `template`, so it can be
    /// published afterwards. Server-side validation failures surface as
    /// [`RemoteConfigError::Transport`].
    pub async fn validate_template(
        &self,
        template: &Template,
    ) -> Result<Template, RemoteConfigError> {
        let raw = self.api.validate_template(template).await?;
        let validated = Template::from_value(&raw)?;
        debug!(etag = validated.etag(), "remote-config template validated");
        Ok(validated)
    }

    /// Publishes `template`.
    ///
    /// Unless `options.force` is set the backend rejects the publish when the
    /// template etag no longer matches its current state.
    pub async fn publish_template(
        &self,
        template: &Template,
        options: PublishOptions,
    ) -> Result<Template, RemoteConfigError> {
        let raw = self.api.publish_template(template, options).await?;
        let published = Template::from_value(&raw)?;
        debug!(
            previous_etag = template.etag(),
            etag = published.etag(),
            force = options.force,
            "remote-config template published"
        );
        Ok(published)
    }

    /// Republishes the template stored under `version_number` as a new version.
    pub async fn rollback(
        &self,
        version_number: impl Into<VersionNumber>,
    ) -> Result<Template, RemoteConfigError> {
        let version_number = version_number.into().validate()?;
        let raw = self.api.rollback(version_number).await?;
        let template = Template::from_value(&raw)?;
        debug!(
            etag = template.etag(),
            version_number, "remote-config template rolled back"
        );
        Ok(template)
    }

    /// Lists published versions, newest first.
    pub async fn list_versions(
        &self,
        options: Option<ListVersionsOptions>,
    ) -> Result<ListVersionsResult, RemoteConfigError> {
        let options = normalize_list_options(options.unwrap_or_default())?;
        let raw = self.api.list_versions(&options).await?;
        let result = parse_list_versions(&raw)?;
        debug!(
            count = result.versions.len(),
            has_next_page = result.next_page_token.is_some(),
            "remote-config versions listed"
        );
        Ok(result)
    }

    /// Parses a template from JSON text, e.g. one previously saved with
    /// [`Template::to_json`].
    pub fn create_template_from_json(&self, json: &str) -> Result<Template, RemoteConfigError> {
        Template::from_json_str(json)
    }
}

/// Validates listing filters and rewrites date filters to ISO form.
fn normalize_list_options(
    mut options: ListVersionsOptions,
) -> Result<ListVersionsOptions, RemoteConfigError> {
    if let Some(page_size) = options.page_size {
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(RemoteConfigError::InvalidArgument(format!(
                "pageSize must be a number between 1 and {MAX_PAGE_SIZE} (inclusive)"
            )));
        }
    }
    if matches!(options.page_token.as_deref(), Some("")) {
        return Err(RemoteConfigError::InvalidArgument(
            "pageToken must be a non-empty string".to_string(),
        ));
    }
    if let Some(end) = &options.end_version_number {
        if end.as_i64().is_none() {
            return Err(RemoteConfigError::InvalidArgument(
                "endVersionNumber must be a non-empty string in int64 format or a number"
                    .to_string(),
            ));
        }
    }
    options.start_time = options
        .start_time
        .map(|time| to_iso_date(&time, "startTime"))
        .transpose()?;
    options.end_time = options
        .end_time
        .map(|time| to_iso_date(&time, "endTime"))
        .transpose()?;
    Ok(options)
}

fn to_iso_date(raw: &str, field: &str) -> Result<String, RemoteConfigError> {
    validator::parse_iso_date(raw)
        .or_else(|| validator::parse_utc_date(raw))
        .map(|instant| instant.format(ISO_DATE_FORMAT).to_string())
        .ok_or_else(|| {
            RemoteConfigError::InvalidArgument(format!("{field} must be a valid date string"))
        })
}

/// Shapes a raw listing; an absent or null `versions` field is an empty page.
fn parse_list_versions(raw: &Value) -> Result<ListVersionsResult, RemoteConfigError> {
    let record = raw.as_object().ok_or_else(|| {
        RemoteConfigError::InvalidArgument(format!("Invalid list versions response: {raw}"))
    })?;
    let versions = match record.get("versions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(Version::from_value)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(RemoteConfigError::InvalidArgument(
                "List versions response field versions must be an array".to_string(),
            ))
        }
    };
    let next_page_token = record
        .get("nextPageToken")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(ListVersionsResult {
        versions,
        next_page_token,
    })
}
