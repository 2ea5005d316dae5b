use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;

/// What a reader does with a record-level error.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, EnumIter)]
#[serde(rename_all = "camelCase")]
pub enum ErrorAction {
    /// The first error ends the run; the caller observes it as a fatal error.
    #[default]
    Throw,
    /// The offending record is dropped and the run continues. The error sink
    /// and `error_count` carry the detail.
    Skip,
    /// The run ends gracefully: `terminated_early` is set and completion is
    /// never stamped.
    Stop,
}

/// Which subsystem produced an error record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Origin {
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "YAML")]
    Yaml,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "MERGE")]
    Merge,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Csv => "CSV",
            Origin::Json => "JSON",
            Origin::Yaml => "YAML",
            Origin::Text => "TEXT",
            Origin::Merge => "MERGE",
        };
        f.write_str(s)
    }
}

/// Behavioral error categories shared by every reader and the merger. These
/// are the `errorType` values written to NDJSON error logs, so the serialized
/// names are load-bearing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    CsvQuoteError,
    CsvLimitExceeded,
    SchemaError,
    JsonRootError,
    JsonException,
    JsonSizeLimit,
    JsonValidationError,
    JsonValidationFailed,
    YamlException,
    YamlSecurityError,
    TypeRestriction,
    MergerSourceFailure,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One record-level failure, as delivered to an [`ErrorSink`](crate::ErrorSink)
/// and serialized (one object per line) by the NDJSON sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub ts: DateTime<Utc>,
    #[serde(rename = "reader")]
    pub origin: Origin,
    pub file: Option<String>,
    pub line: u64,
    pub record: u64,
    pub error_type: ErrorKind,
    pub message: String,
    pub excerpt: Option<String>,
    pub action: ErrorAction,
}

/// The error surfaced to the caller when `ErrorAction::Throw` is in effect,
/// carrying the first failure's category and message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FatalError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FatalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        FatalError {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_record_serializes_to_the_documented_field_names() {
        let record = ErrorRecord {
            ts: Utc::now(),
            origin: Origin::Csv,
            file: Some("data.csv".to_string()),
            line: 7,
            record: 3,
            error_type: ErrorKind::CsvQuoteError,
            message: "unescaped quote".to_string(),
            excerpt: Some("a,b\"c".to_string()),
            action: ErrorAction::Skip,
        };
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "ts", "reader", "file", "line", "record", "errorType", "message", "excerpt", "action",
        ] {
            assert!(object.contains_key(key), "missing field: {}", key);
        }
        assert_eq!(object["reader"], "CSV");
        assert_eq!(object["errorType"], "CsvQuoteError");
    }
}
