//! Remote config templates and their normalization.
//!
//! A [`Template`] bundles conditions, parameters and parameter groups with the
//! etag that guards concurrent publishes. Validation is shallow:
//! only the container shapes are enforced, individual conditions and
//! parameters are passed through as the service returned them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::service::RemoteConfigError;
use crate::version::Version;

/// A remote config template.
///
/// The etag can only be set when the template is built from a record (a
/// service response or caller-supplied JSON); it is read back through
/// [`Template::etag`].
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Ordered targeting conditions (`{"name", "expression", "tagColor"}`).
    pub conditions: Vec<Value>,
    /// Parameters keyed by name.
    pub parameters: Map<String, Value>,
    /// Parameter groups keyed by name.
    pub parameter_groups: Map<String, Value>,
    /// Metadata of the version this template was read from, or the version
    /// description to attach on publish.
    pub version: Option<Version>,
    etag: String,
}

impl Template {
    /// Validates an untyped template record.
    pub fn from_value(value: &Value) -> Result<Self, RemoteConfigError> {
        let record = value.as_object().ok_or_else(|| {
            RemoteConfigError::InvalidArgument(format!("Invalid Remote Config template: {value}"))
        })?;

        let etag = match record.get("etag") {
            Some(Value::String(etag)) if !etag.is_empty() => etag.clone(),
            _ => {
                return Err(RemoteConfigError::InvalidArgument(
                    "Remote Config template etag must be a non-empty string".to_string(),
                ))
            }
        };

        let parameters = object_field(record, "parameters", "Remote Config parameters")?;
        let parameter_groups =
            object_field(record, "parameterGroups", "Remote Config parameter groups")?;

        let conditions = match record.get("conditions") {
            None => Vec::new(),
            Some(Value::Array(conditions)) => conditions.clone(),
            Some(_) => {
                return Err(RemoteConfigError::InvalidArgument(
                    "Remote Config conditions must be an array".to_string(),
                ))
            }
        };

        let version = record.get("version").map(Version::from_value).transpose()?;

        Ok(Self {
            conditions,
            parameters,
            parameter_groups,
            version,
            etag,
        })
    }

    /// Parses and validates a template from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, RemoteConfigError> {
        if json.is_empty() {
            return Err(RemoteConfigError::InvalidArgument(
                "JSON string must be a valid non-empty string".to_string(),
            ));
        }
        let value: Value = serde_json::from_str(json).map_err(|err| {
            RemoteConfigError::InvalidArgument(format!(
                "Failed to parse the JSON string: {json}. {err}"
            ))
        })?;
        Self::from_value(&value)
    }

    /// Opaque concurrency token of the template state this value was read from.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Renders every field, the etag included.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("conditions".into(), Value::Array(self.conditions.clone()));
        map.insert("parameters".into(), Value::Object(self.parameters.clone()));
        map.insert(
            "parameterGroups".into(),
            Value::Object(self.parameter_groups.clone()),
        );
        map.insert("etag".into(), Value::String(self.etag.clone()));
        if let Some(version) = &self.version {
            map.insert("version".into(), version.to_json());
        }
        Value::Object(map)
    }
}

/// Reads an optional mapping field, defaulting to an empty map when absent.
fn object_field(
    record: &Map<String, Value>,
    field: &str,
    label: &str,
) -> Result<Map<String, Value>, RemoteConfigError> {
    match record.get(field) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(RemoteConfigError::InvalidArgument(format!(
            "{label} must be a non-null object"
        ))),
    }
}

impl TryFrom<&Value> for Template {
    type Error = RemoteConfigError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl std::str::FromStr for Template {
    type Err = RemoteConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}
