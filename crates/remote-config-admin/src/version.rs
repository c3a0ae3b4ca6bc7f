//! Version metadata attached to every published template.
//!
//! A [`Version`] is produced from an untyped JSON record through a single pass
//! over [`VERSION_RULES`]; fields absent from the input stay absent. The
//! record is immutable once built: callers only read it, or hand it back to
//! the service through [`Version::to_json`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::service::RemoteConfigError;
use crate::validator::{
    self, check_fields, is_boolean, is_int64_like, is_non_empty_string, is_non_null_object,
    is_string, FieldRule,
};

/// Field checks applied to every incoming version record.
const VERSION_RULES: &[FieldRule] = &[
    FieldRule {
        field: "versionNumber",
        check: is_int64_like,
        message: "Version number must be a non-empty string in int64 format or a number",
    },
    FieldRule {
        field: "updateTime",
        check: is_date_string,
        message: "Version update time must be a valid date string",
    },
    FieldRule {
        field: "updateOrigin",
        check: is_update_origin,
        message: "Version update origin must be one of REMOTE_CONFIG_UPDATE_ORIGIN_UNSPECIFIED, \
                  CONSOLE, REST_API or ADMIN_SDK_NODE",
    },
    FieldRule {
        field: "updateType",
        check: is_update_type,
        message: "Version update type must be one of REMOTE_CONFIG_UPDATE_TYPE_UNSPECIFIED, \
                  INCREMENTAL_UPDATE, FORCED_UPDATE or ROLLBACK",
    },
    FieldRule {
        field: "updateUser",
        check: is_non_null_object,
        message: "Version update user must be a non-null object",
    },
    FieldRule {
        field: "description",
        check: is_string,
        message: "Version description must be a string",
    },
    FieldRule {
        field: "rollbackSource",
        check: is_non_empty_string,
        message: "Version rollback source must be a non-empty string",
    },
    FieldRule {
        field: "isLegacy",
        check: is_boolean,
        message: "Version.isLegacy must be a boolean",
    },
];

fn is_date_string(value: &Value) -> bool {
    validator::is_utc_date_string(value) || validator::is_iso_date_string(value)
}

fn is_update_origin(value: &Value) -> bool {
    value.as_str().and_then(UpdateOrigin::from_wire).is_some()
}

fn is_update_type(value: &Value) -> bool {
    value.as_str().and_then(UpdateType::from_wire).is_some()
}

/// Template version number, kept in the representation it arrived in.
///
/// The service emits version numbers as int64 strings while callers commonly
/// pass plain integers; both forms are accepted and neither is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionNumber {
    Number(i64),
    Text(String),
}

impl VersionNumber {
    /// Builds a version number from an untyped JSON value, rejecting anything
    /// that is not integer-valued.
    pub fn from_value(value: &Value) -> Result<Self, RemoteConfigError> {
        let invalid = || {
            RemoteConfigError::InvalidArgument(
                "Version number must be a non-empty string in int64 format or a number".to_string(),
            )
        };
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    return Ok(Self::Number(int));
                }
                let text = number.to_string();
                validator::parse_integral(&text)
                    .map(Self::Number)
                    .ok_or_else(invalid)
            }
            Value::String(text) if validator::parse_integral(text).is_some() => {
                Ok(Self::Text(text.clone()))
            }
            _ => Err(invalid()),
        }
    }

    /// Returns the integer value regardless of the stored representation.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Text(text) => validator::parse_integral(text),
        }
    }

    /// Ensures the value is integer-valued; used for caller-supplied input.
    pub(crate) fn validate(&self) -> Result<i64, RemoteConfigError> {
        self.as_i64().ok_or_else(|| {
            RemoteConfigError::InvalidArgument(format!(
                "Version number must be a non-empty string in int64 format or a number, got {self}"
            ))
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(number) => Value::from(*number),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for VersionNumber {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for VersionNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VersionNumber {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Origin of a template update, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOrigin {
    Unspecified,
    Console,
    RestApi,
    AdminSdkNode,
}

impl UpdateOrigin {
    /// Parses the wire spelling; the short `UNSPECIFIED` alias is accepted too.
    /// [`UpdateOrigin::as_str`] always returns the full name.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "REMOTE_CONFIG_UPDATE_ORIGIN_UNSPECIFIED" | "UNSPECIFIED" => Some(Self::Unspecified),
            "CONSOLE" => Some(Self::Console),
            "REST_API" => Some(Self::RestApi),
            "ADMIN_SDK_NODE" => Some(Self::AdminSdkNode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "REMOTE_CONFIG_UPDATE_ORIGIN_UNSPECIFIED",
            Self::Console => "CONSOLE",
            Self::RestApi => "REST_API",
            Self::AdminSdkNode => "ADMIN_SDK_NODE",
        }
    }
}

/// Kind of change a version introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateType {
    Unspecified,
    IncrementalUpdate,
    ForcedUpdate,
    Rollback,
}

impl UpdateType {
    /// Parses the wire spelling; the short `UNSPECIFIED` alias is accepted too.
    /// [`UpdateType::as_str`] always returns the full name.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "REMOTE_CONFIG_UPDATE_TYPE_UNSPECIFIED" | "UNSPECIFIED" => Some(Self::Unspecified),
            "INCREMENTAL_UPDATE" => Some(Self::IncrementalUpdate),
            "FORCED_UPDATE" => Some(Self::ForcedUpdate),
            "ROLLBACK" => Some(Self::Rollback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "REMOTE_CONFIG_UPDATE_TYPE_UNSPECIFIED",
            Self::IncrementalUpdate => "INCREMENTAL_UPDATE",
            Self::ForcedUpdate => "FORCED_UPDATE",
            Self::Rollback => "ROLLBACK",
        }
    }
}

/// Metadata describing one publication of a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Version {
    version_number: Option<VersionNumber>,
    update_time: Option<String>,
    /// Wire spellings, kept as received; validated against the enums on input.
    update_origin: Option<String>,
    update_type: Option<String>,
    update_user: Option<Map<String, Value>>,
    description: Option<String>,
    rollback_source: Option<String>,
    is_legacy: Option<bool>,
}

impl Version {
    /// Validates and normalizes an untyped version record.
    ///
    /// `updateTime` values in ISO form are re-rendered in UTC display form;
    /// values already in UTC display form are kept verbatim, so normalizing
    /// an already-normalized record is a no-op.
    pub fn from_value(value: &Value) -> Result<Self, RemoteConfigError> {
        let record = value.as_object().ok_or_else(|| {
            RemoteConfigError::InvalidArgument(format!(
                "Invalid Remote Config version instance: {value}"
            ))
        })?;
        check_fields(record, VERSION_RULES)?;

        let version_number = record
            .get("versionNumber")
            .map(VersionNumber::from_value)
            .transpose()?;
        let update_time = record
            .get("updateTime")
            .and_then(Value::as_str)
            .map(normalize_update_time);

        Ok(Self {
            version_number,
            update_time,
            update_origin: record
                .get("updateOrigin")
                .and_then(Value::as_str)
                .map(str::to_string),
            update_type: record
                .get("updateType")
                .and_then(Value::as_str)
                .map(str::to_string),
            update_user: record
                .get("updateUser")
                .and_then(Value::as_object)
                .cloned(),
            description: record
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            rollback_source: record
                .get("rollbackSource")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_legacy: record.get("isLegacy").and_then(Value::as_bool),
        })
    }

    /// Version carrying only a description, for attaching to a publish.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn version_number(&self) -> Option<&VersionNumber> {
        self.version_number.as_ref()
    }

    /// Update time in UTC display form (`Tue, 15 Oct 2024 10:00:00 GMT`).
    pub fn update_time(&self) -> Option<&str> {
        self.update_time.as_deref()
    }

    /// Update time as a parsed instant.
    pub fn update_instant(&self) -> Option<DateTime<Utc>> {
        self.update_time.as_deref().and_then(validator::parse_utc_date)
    }

    pub fn update_origin(&self) -> Option<UpdateOrigin> {
        self.update_origin.as_deref().and_then(UpdateOrigin::from_wire)
    }

    pub fn update_type(&self) -> Option<UpdateType> {
        self.update_type.as_deref().and_then(UpdateType::from_wire)
    }

    /// Opaque descriptor of the user who made the change (`email`, `name`, `imageUrl`).
    pub fn update_user(&self) -> Option<&Map<String, Value>> {
        self.update_user.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn rollback_source(&self) -> Option<&str> {
        self.rollback_source.as_deref()
    }

    pub fn is_legacy(&self) -> Option<bool> {
        self.is_legacy
    }

    /// Renders the record with the service's field names, omitting absent fields.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(number) = &self.version_number {
            map.insert("versionNumber".into(), number.to_json());
        }
        if let Some(update_time) = &self.update_time {
            map.insert("updateTime".into(), Value::String(update_time.clone()));
        }
        if let Some(origin) = &self.update_origin {
            map.insert("updateOrigin".into(), Value::String(origin.clone()));
        }
        if let Some(update_type) = &self.update_type {
            map.insert("updateType".into(), Value::String(update_type.clone()));
        }
        if let Some(user) = &self.update_user {
            map.insert("updateUser".into(), Value::Object(user.clone()));
        }
        if let Some(description) = &self.description {
            map.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(source) = &self.rollback_source {
            map.insert("rollbackSource".into(), Value::String(source.clone()));
        }
        if let Some(is_legacy) = self.is_legacy {
            map.insert("isLegacy".into(), Value::Bool(is_legacy));
        }
        Value::Object(map)
    }
}

/// ISO input becomes UTC display form; anything else was already validated as
/// UTC display form and is kept as given.
fn normalize_update_time(raw: &str) -> String {
    match validator::parse_iso_date(raw) {
        Some(instant) => instant.format(validator::UTC_DATE_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

impl TryFrom<&Value> for Version {
    type Error = RemoteConfigError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}
