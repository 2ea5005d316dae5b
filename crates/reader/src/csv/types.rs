//! The primitive type chain used by CSV type inference and enforcement.
//! Precedence runs most-specific first; `String` is the fallback and always
//! succeeds.

use crate::csv::numbers::normalize_number;
use crate::csv::options::NumberFormat;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TypeTag {
    Boolean,
    Integer,
    Long,
    Decimal,
    Double,
    DateTime,
    Guid,
    String,
}

/// Candidate order for inference, most specific first.
pub(crate) const PRECEDENCE: &[TypeTag] = &[
    TypeTag::Boolean,
    TypeTag::Integer,
    TypeTag::Long,
    TypeTag::Decimal,
    TypeTag::Double,
    TypeTag::DateTime,
    TypeTag::Guid,
];

/// C# `decimal` carries 28-29 significant digits; anything wider fails the
/// candidate rather than silently losing precision.
const DECIMAL_MAX_DIGITS: usize = 28;

impl TypeTag {
    pub(crate) fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Integer | TypeTag::Long | TypeTag::Decimal | TypeTag::Double
        )
    }

    /// Parses `raw` as this type, returning the JSON value to emit, or `None`
    /// when the field does not conform.
    pub(crate) fn parse(self, raw: &str, format: Option<&NumberFormat>) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            TypeTag::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            TypeTag::Integer => {
                let normalized = normalize_integer(trimmed, format)?;
                normalized
                    .parse::<i32>()
                    .ok()
                    .map(|n| Value::Number(serde_json::Number::from(n as i64)))
            }
            TypeTag::Long => {
                let normalized = normalize_integer(trimmed, format)?;
                normalized
                    .parse::<i64>()
                    .ok()
                    .map(|n| Value::Number(serde_json::Number::from(n)))
            }
            TypeTag::Decimal => {
                let normalized = normalize_number(trimmed, format)?;
                if normalized.contains(['e', 'E']) {
                    return None;
                }
                let decimal = BigDecimal::from_str(&normalized).ok()?;
                if decimal.digits() as usize > DECIMAL_MAX_DIGITS {
                    return None;
                }
                let float: f64 = normalized.parse().ok()?;
                serde_json::Number::from_f64(float).map(Value::Number)
            }
            TypeTag::Double => {
                let normalized = normalize_number(trimmed, format)?;
                let float: f64 = normalized.parse().ok()?;
                float
                    .is_finite()
                    .then(|| serde_json::Number::from_f64(float).map(Value::Number))
                    .flatten()
            }
            TypeTag::DateTime => parse_datetime(trimmed).map(Value::String),
            TypeTag::Guid => uuid::Uuid::parse_str(trimmed)
                .ok()
                .map(|id| Value::String(id.hyphenated().to_string())),
            TypeTag::String => Some(Value::String(raw.to_string())),
        }
    }
}

fn normalize_integer(raw: &str, format: Option<&NumberFormat>) -> Option<String> {
    let normalized = normalize_number(raw, format)?;
    if normalized.contains(['.', 'e', 'E']) {
        return None;
    }
    Some(normalized)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Accepts RFC 3339 plus the common unzoned shapes, normalizing everything to
/// an ISO-8601 string so downstream deserialization sees one format.
pub(crate) fn parse_datetime(raw: &str) -> Option<String> {
    if let Ok(zoned) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.to_rfc3339());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.format("%Y-%m-%dT%H:%M:%S%.3f").to_string());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            let midnight = parsed.and_hms_opt(0, 0, 0)?;
            return Some(midnight.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_chain_parses_each_shape() {
        assert_eq!(TypeTag::Boolean.parse("TRUE", None), Some(json!(true)));
        assert_eq!(TypeTag::Integer.parse("42", None), Some(json!(42)));
        assert_eq!(TypeTag::Integer.parse("4000000000", None), None); // beyond i32
        assert_eq!(
            TypeTag::Long.parse("4000000000", None),
            Some(json!(4000000000i64))
        );
        assert_eq!(TypeTag::Decimal.parse("12.50", None), Some(json!(12.5)));
        assert_eq!(TypeTag::Double.parse("1.5e3", None), Some(json!(1500.0)));
        assert!(TypeTag::DateTime.parse("2024-02-29", None).is_some());
        assert!(TypeTag::Guid
            .parse("6ba7b810-9dad-11d1-80b4-00c04fd430c8", None)
            .is_some());
        assert_eq!(TypeTag::String.parse("anything", None), Some(json!("anything")));
    }

    #[test]
    fn integers_reject_fractions_and_text() {
        assert_eq!(TypeTag::Integer.parse("1.5", None), None);
        assert_eq!(TypeTag::Long.parse("abc", None), None);
    }

    #[test]
    fn decimal_rejects_overwide_values() {
        let wide = "1".repeat(29);
        assert_eq!(TypeTag::Decimal.parse(&wide, None), None);
        assert!(TypeTag::Decimal.parse("123456.789", None).is_some());
    }

    #[test]
    fn datetimes_normalize_to_iso() {
        assert_eq!(
            parse_datetime("2024-01-02 03:04:05").as_deref(),
            Some("2024-01-02T03:04:05.000")
        );
        assert_eq!(
            parse_datetime("01/02/2024").as_deref(),
            Some("2024-01-02T00:00:00")
        );
        assert_eq!(parse_datetime("not a date"), None);
    }
}
