//! Typed administration client for remote config templates.
//!
//! [`RemoteConfig`] fetches, validates, publishes and rolls back a project's
//! template and lists its version history. Raw records coming back from the
//! backend are normalized into [`Template`] and [`Version`] values before
//! they reach the caller. The REST transport lives in [`http`] and can be
//! swapped through the [`RemoteConfigApi`] trait.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod api;
pub mod config;
pub mod http;
pub mod service;
pub mod template;
pub mod validator;
pub mod version;

#[cfg(test)]
mod test_support;

pub use api::{ListVersionsOptions, PublishOptions, RemoteConfigApi};
pub use config::{ConfigError, RemoteConfigEnv};
pub use http::{Auth, HttpClient, HttpClientOptions, HttpError};
pub use service::{ListVersionsResult, RemoteConfig, RemoteConfigError};
pub use template::Template;
pub use version::{UpdateOrigin, UpdateType, Version, VersionNumber};

#[cfg(test)]
mod tests {
    use super::*;

    /// Ensures a service can be assembled from crate-root exports alone.
    #[test]
    fn service_types_are_reexported() {
        let env = RemoteConfigEnv::from_env_iter([
            ("REMOTE_CONFIG_PROJECT_ID", "demo"),
            ("REMOTE_CONFIG_ACCESS_TOKEN", "token"),
        ]);
        let client: HttpClient = env.build_client("0.1.0").unwrap();
        let _service = RemoteConfig::new(client);
        let options = ListVersionsOptions {
            end_version_number: Some(VersionNumber::from(3)),
            ..Default::default()
        };
        assert_eq!(options.end_version_number.unwrap().as_i64(), Some(3));
    }

    /// Verifies the enum wire names parse back to the same variant.
    #[test]
    fn version_enums_round_trip_wire_names() {
        for kind in [
            UpdateType::Unspecified,
            UpdateType::IncrementalUpdate,
            UpdateType::ForcedUpdate,
            UpdateType::Rollback,
        ] {
            assert_eq!(UpdateType::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(
            UpdateOrigin::from_wire(UpdateOrigin::RestApi.as_str()),
            Some(UpdateOrigin::RestApi)
        );
    }
}
