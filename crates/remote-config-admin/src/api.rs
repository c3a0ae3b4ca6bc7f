//! Transport seam between the service facade and the remote config backend.
//!
//! Implementations exchange raw JSON records; shaping them into typed values
//! is the facade's job. [`crate::http::HttpClient`] is the REST
//! implementation shipped with the crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::http::HttpError;
use crate::template::Template;
use crate::version::VersionNumber;

/// Options accepted by [`RemoteConfigApi::publish_template`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Publish even when the template etag no longer matches the server state.
    pub force: bool,
}

/// Filters and pagination for [`RemoteConfigApi::list_versions`].
///
/// Every field is optional; the service applies its own defaults (a page of
/// up to 300 versions, newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVersionsOptions {
    /// Maximum number of versions per page, between 1 and 300.
    pub page_size: Option<u32>,
    /// Token returned by a previous call as `nextPageToken`.
    pub page_token: Option<String>,
    /// Newest version number to include.
    pub end_version_number: Option<VersionNumber>,
    /// Oldest update time to include, as an ISO or UTC date string.
    pub start_time: Option<String>,
    /// Newest update time to include (exclusive), as an ISO or UTC date string.
    pub end_time: Option<String>,
}

/// Raw operations offered by the remote config backend.
///
/// Errors are returned untouched to the caller of the facade.
#[async_trait]
pub trait RemoteConfigApi: Send + Sync {
    /// Fetches the active template.
    async fn get_template(&self) -> Result<Value, HttpError>;

    /// Fetches the template as it was published at `version_number`.
    async fn get_template_at_version(&self, version_number: i64) -> Result<Value, HttpError>;

    /// Asks the backend to validate `template` without publishing it.
    async fn validate_template(&self, template: &Template) -> Result<Value, HttpError>;

    /// Publishes `template`, guarded by its etag unless `options.force` is set.
    async fn publish_template(
        &self,
        template: &Template,
        options: PublishOptions,
    ) -> Result<Value, HttpError>;

    /// Republishes the template stored under `version_number`.
    async fn rollback(&self, version_number: i64) -> Result<Value, HttpError>;

    /// Fetches one page of version metadata. `options` has already been
    /// validated, with date filters rewritten to ISO form.
    async fn list_versions(&self, options: &ListVersionsOptions) -> Result<Value, HttpError>;
}
