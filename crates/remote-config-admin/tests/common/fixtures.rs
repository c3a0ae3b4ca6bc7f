//! Backend payloads and client wiring shared by the integration tests.
#![allow(dead_code)]

use httptest::Server;
use remote_config_admin::{Auth, HttpClient, HttpClientOptions, RemoteConfig};
use serde_json::{json, Value};

/// Project id every scenario runs against.
pub const PROJECT: &str = "demo-project";

/// Resource paths as seen by the mock backend.
pub const TEMPLATE_PATH: &str = "/v1/projects/demo-project/remoteConfig";
pub const ROLLBACK_PATH: &str = "/v1/projects/demo-project/remoteConfig:rollback";
pub const LIST_VERSIONS_PATH: &str = "/v1/projects/demo-project/remoteConfig:listVersions";

/// Access token the fixtures authenticate with.
pub const ACCESS_TOKEN: &str = "test-token";

/// Base URL of `server` without a trailing slash.
pub fn base_url(server: &Server) -> String {
    server.url_str("").trim_end_matches('/').to_string()
}

/// REST client pointed at the mock backend.
pub fn http_client(server: &Server) -> HttpClient {
    HttpClient::new(
        base_url(server),
        PROJECT,
        &Auth {
            access_token: ACCESS_TOKEN.to_string(),
        },
        "0.1.0",
        HttpClientOptions {
            allow_plaintext: true,
            ..HttpClientOptions::default()
        },
    )
    .expect("client builds")
}

/// Service facade on top of [`http_client`].
pub fn service(server: &Server) -> RemoteConfig {
    RemoteConfig::new(http_client(server))
}

/// Template body as the backend serves it; the etag travels in a header.
pub fn template_body(version_number: &str) -> Value {
    json!({
        "conditions": [
            { "name": "ios", "expression": "device.os == 'ios'", "tagColor": "BLUE" }
        ],
        "parameters": {
            "welcome_message": {
                "defaultValue": { "value": "hello" },
                "conditionalValues": { "ios": { "value": "hello ios" } },
                "valueType": "STRING"
            }
        },
        "parameterGroups": {
            "onboarding": {
                "parameters": {
                    "show_tour": { "defaultValue": { "value": "true" }, "valueType": "BOOLEAN" }
                }
            }
        },
        "version": version_record(version_number, "2024-10-15T10:30:00.123Z")
    })
}

/// Version metadata record in backend form.
pub fn version_record(version_number: &str, update_time: &str) -> Value {
    json!({
        "versionNumber": version_number,
        "updateTime": update_time,
        "updateOrigin": "REST_API",
        "updateType": "INCREMENTAL_UPDATE",
        "updateUser": { "email": "admin@example.com" },
        "description": format!("release {version_number}")
    })
}

/// Backend error envelope.
pub fn error_body(code: u16, status: &str, message: &str) -> String {
    json!({ "error": { "code": code, "status": status, "message": message } }).to_string()
}
