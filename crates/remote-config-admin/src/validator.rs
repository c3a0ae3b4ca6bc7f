//! Type predicates applied to untyped JSON input.
//!
//! Every predicate is side-effect free and only classifies its input. The
//! normalizers in [`crate::version`] and [`crate::template`] combine them to
//! decide whether a record coming from the service (or from the caller) has
//! the expected shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::service::RemoteConfigError;

/// Rendering of `Date.prototype.toISOString`-style timestamps.
pub(crate) const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
/// Rendering of RFC 7231 `IMF-fixdate` timestamps (`Tue, 15 Oct 2024 10:00:00 GMT`).
pub(crate) const UTC_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn is_non_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.is_empty())
}

pub fn is_non_null_object(value: &Value) -> bool {
    value.is_object()
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

pub fn is_number(value: &Value) -> bool {
    value.is_number()
}

pub fn is_boolean(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

/// Returns `true` when the value is a string in the canonical ISO-8601 extended
/// form with millisecond precision (`2024-10-15T10:00:00.000Z`).
pub fn is_iso_date_string(value: &Value) -> bool {
    value.as_str().and_then(parse_iso_date).is_some()
}

/// Returns `true` when the value is a string in the UTC display form
/// (`Tue, 15 Oct 2024 10:00:00 GMT`).
pub fn is_utc_date_string(value: &Value) -> bool {
    value.as_str().and_then(parse_utc_date).is_some()
}

/// Returns `true` for JSON numbers and non-empty strings that convert to an
/// integer (`42`, `"42"`, `42.0`), and `false` for fractional or non-numeric
/// input (`3.5`, `"3.5"`, `"abc"`).
pub fn is_int64_like(value: &Value) -> bool {
    match value {
        Value::Number(number) => number_is_integral(number),
        Value::String(text) => parse_integral(text).is_some(),
        _ => false,
    }
}

/// Parses a string that must render back identically in ISO form.
pub(crate) fn parse_iso_date(text: &str) -> Option<DateTime<Utc>> {
    parse_canonical(text, ISO_DATE_FORMAT)
}

/// Parses a string that must render back identically in UTC display form.
pub(crate) fn parse_utc_date(text: &str) -> Option<DateTime<Utc>> {
    parse_canonical(text, UTC_DATE_FORMAT)
}

fn parse_canonical(text: &str, format: &str) -> Option<DateTime<Utc>> {
    let parsed = NaiveDateTime::parse_from_str(text, format).ok()?.and_utc();
    // Reject inputs the parser tolerates but the canonical rendering would not
    // produce (padding differences, mismatched weekday, extra precision).
    if parsed.format(format).to_string() == text {
        Some(parsed)
    } else {
        None
    }
}

/// Converts a trimmed numeric string into an integer when it has no fractional part.
pub(crate) fn parse_integral(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    let float = trimmed.parse::<f64>().ok()?;
    float_to_integral(float)
}

fn number_is_integral(number: &serde_json::Number) -> bool {
    if number.is_i64() {
        return true;
    }
    number.as_f64().and_then(float_to_integral).is_some()
}

fn float_to_integral(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// One entry of a declarative validation table.
///
/// Absent fields are not checked; presence (including an explicit `null`)
/// triggers the predicate.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// JSON key the rule applies to.
    pub field: &'static str,
    /// Predicate the value must satisfy.
    pub check: fn(&Value) -> bool,
    /// Message reported when the predicate fails.
    pub message: &'static str,
}

/// Runs every rule against `record` and fails on the first violation.
pub fn check_fields(
    record: &Map<String, Value>,
    rules: &[FieldRule],
) -> Result<(), RemoteConfigError> {
    for rule in rules {
        if let Some(value) = record.get(rule.field) {
            if !(rule.check)(value) {
                return Err(RemoteConfigError::InvalidArgument(rule.message.to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Verifies the primitive predicates classify JSON types.
    #[test]
    fn primitive_predicates_classify_json_types() {
        assert!(is_non_empty_string(&json!("a")));
        assert!(!is_non_empty_string(&json!("")));
        assert!(!is_non_empty_string(&json!(1)));

        assert!(is_non_null_object(&json!({})));
        assert!(!is_non_null_object(&Value::Null));
        assert!(!is_non_null_object(&json!([])));

        assert!(is_array(&json!([1, 2])));
        assert!(!is_array(&json!({"0": 1})));

        assert!(is_number(&json!(1.5)));
        assert!(!is_number(&json!("1.5")));

        assert!(is_boolean(&json!(false)));
        assert!(!is_boolean(&json!("false")));
    }

    /// Ensures only canonical ISO timestamps are accepted.
    #[test]
    fn iso_dates_must_be_canonical() {
        assert!(is_iso_date_string(&json!("2024-10-15T10:00:00.000Z")));
        assert!(is_iso_date_string(&json!("2020-02-29T23:59:59.999Z")));
        assert!(!is_iso_date_string(&json!("2024-10-15T10:00:00Z")));
        assert!(!is_iso_date_string(&json!("2024-10-15")));
        assert!(!is_iso_date_string(&json!("2021-02-29T00:00:00.000Z")));
        assert!(!is_iso_date_string(&json!(1_700_000_000)));
    }

    /// Ensures only canonical UTC display timestamps are accepted.
    #[test]
    fn utc_dates_must_be_canonical() {
        assert!(is_utc_date_string(&json!("Tue, 15 Oct 2024 10:00:00 GMT")));
        // Weekday does not match the date.
        assert!(!is_utc_date_string(&json!("Mon, 15 Oct 2024 10:00:00 GMT")));
        assert!(!is_utc_date_string(&json!("Tue, 15 Oct 2024 10:00:00 UTC")));
        assert!(!is_utc_date_string(&json!("2024-10-15T10:00:00.000Z")));
    }

    /// Checks integer-likeness for numbers and numeric strings.
    #[test]
    fn int64_like_accepts_integral_numbers_and_strings() {
        assert!(is_int64_like(&json!(42)));
        assert!(is_int64_like(&json!(-7)));
        assert!(is_int64_like(&json!(42.0)));
        assert!(is_int64_like(&json!("42")));
        assert!(is_int64_like(&json!(" 42 ")));
        assert!(!is_int64_like(&json!(3.5)));
        assert!(!is_int64_like(&json!("3.5")));
        assert!(!is_int64_like(&json!("")));
        assert!(!is_int64_like(&json!("abc")));
        assert!(!is_int64_like(&json!(true)));
        assert!(!is_int64_like(&Value::Null));
    }

    /// Verifies rule tables skip absent fields and stop at the first violation.
    #[test]
    fn check_fields_skips_absent_and_reports_first_violation() {
        const RULES: &[FieldRule] = &[
            FieldRule {
                field: "name",
                check: is_non_empty_string,
                message: "name must be a non-empty string",
            },
            FieldRule {
                field: "enabled",
                check: is_boolean,
                message: "enabled must be a boolean",
            },
        ];

        let record = json!({ "enabled": true });
        assert!(check_fields(record.as_object().unwrap(), RULES).is_ok());

        let record = json!({ "name": "", "enabled": "yes" });
        let err = check_fields(record.as_object().unwrap(), RULES).unwrap_err();
        assert_eq!(err.to_string(), "invalid-argument: name must be a non-empty string");

        let record = json!({ "name": null });
        assert!(check_fields(record.as_object().unwrap(), RULES).is_err());
    }
}
