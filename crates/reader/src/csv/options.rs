use crate::csv::types::TypeTag;
use ops::ReadOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use strum::EnumIter;

/// How quote characters inside unquoted fields are treated.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "camelCase")]
pub enum QuoteMode {
    /// RFC 4180: a quote inside an unquoted field is an error.
    #[default]
    RfcStrict,
    /// A quote inside an unquoted field switches to quoted reading.
    Lenient,
    /// As strict, retained as a distinct mode so configs can name the intent.
    ErrorOnIllegalQuote,
}

#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "camelCase")]
pub enum SchemaInferenceMode {
    #[default]
    ColumnNamesOnly,
    ColumnNamesAndTypes,
}

#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "camelCase")]
pub enum FieldTypeInference {
    /// Every field is emitted as a raw string.
    #[default]
    None,
    /// Fields parse through the inferred primitive chain.
    Primitive,
    /// Every field routes through the caller's converter.
    Custom,
}

/// Numeric locale: which characters separate the decimal part and digit
/// groups. When absent, the smart separator heuristic applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NumberFormat {
    pub decimal_separator: char,
    pub group_separator: Option<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal_separator: '.',
            group_separator: Some(','),
        }
    }
}

pub type ValueConverter = Arc<dyn Fn(&str) -> Value + Send + Sync>;
pub type RawRecordObserver = Arc<dyn Fn(u64, &str) + Send + Sync>;
/// `(raw_header, file, column_index, default_name) -> column_name`
pub type ColumnNamer = Arc<dyn Fn(&str, Option<&str>, usize, &str) -> String + Send + Sync>;

/// CSV reader configuration: the shared [`ReadOptions`] plus everything
/// specific to tokenizing, schema resolution, inference and mapping.
#[derive(Clone)]
pub struct CsvOptions {
    pub common: ReadOptions,

    /// Field separator. `None` asks the reader to detect one from a sampled
    /// prefix (candidates: comma, semicolon, tab, pipe).
    pub separator: Option<char>,
    pub has_header: bool,
    /// Explicit column names; suppresses header consumption when set together
    /// with `has_header = false`, or overrides the header names otherwise.
    pub schema: Option<Vec<String>>,
    /// Field names of the target type, enabling name mapping (caseless,
    /// separator-insensitive, then fuzzy within edit distance 2).
    pub target_fields: Option<Vec<String>>,
    pub trim_whitespace: bool,
    pub allow_missing_trailing_fields: bool,
    pub allow_extra_fields: bool,
    pub quote_mode: QuoteMode,
    pub error_on_trailing_garbage_after_closing_quote: bool,
    pub preserve_line_endings: bool,
    pub normalize_newlines_in_fields: bool,
    pub infer_schema: bool,
    pub schema_inference_mode: SchemaInferenceMode,
    pub schema_inference_sample_rows: usize,
    pub field_type_inference: FieldTypeInference,
    pub field_value_converter: Option<ValueConverter>,
    pub preserve_numeric_strings_with_leading_zeros: bool,
    pub preserve_large_integer_strings: bool,
    pub capture_raw_record: bool,
    pub raw_record_observer: Option<RawRecordObserver>,
    pub column_namer: Option<ColumnNamer>,
    /// 0 = unlimited. A record with strictly more columns fails.
    pub max_columns_per_row: usize,
    /// 0 = unlimited. A record with strictly more characters fails.
    pub max_raw_record_length: usize,
    pub number_format: Option<NumberFormat>,

    /// Output cell filled by the sampling phase; read it through
    /// [`inferred_types`](Self::inferred_types).
    pub inferred: Arc<OnceLock<Vec<TypeTag>>>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            common: ReadOptions::default(),
            separator: Some(','),
            has_header: true,
            schema: None,
            target_fields: None,
            trim_whitespace: false,
            allow_missing_trailing_fields: true,
            allow_extra_fields: false,
            quote_mode: QuoteMode::default(),
            error_on_trailing_garbage_after_closing_quote: true,
            preserve_line_endings: true,
            normalize_newlines_in_fields: false,
            infer_schema: false,
            schema_inference_mode: SchemaInferenceMode::default(),
            schema_inference_sample_rows: 100,
            field_type_inference: FieldTypeInference::default(),
            field_value_converter: None,
            preserve_numeric_strings_with_leading_zeros: false,
            preserve_large_integer_strings: false,
            capture_raw_record: false,
            raw_record_observer: None,
            column_namer: None,
            max_columns_per_row: 0,
            max_raw_record_length: 0,
            number_format: None,
            inferred: Arc::new(OnceLock::new()),
        }
    }
}

impl fmt::Debug for CsvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvOptions")
            .field("common", &self.common)
            .field("separator", &self.separator)
            .field("has_header", &self.has_header)
            .field("schema", &self.schema)
            .field("quote_mode", &self.quote_mode)
            .field("infer_schema", &self.infer_schema)
            .field("schema_inference_mode", &self.schema_inference_mode)
            .field("field_type_inference", &self.field_type_inference)
            .field("max_columns_per_row", &self.max_columns_per_row)
            .field("max_raw_record_length", &self.max_raw_record_length)
            .finish()
    }
}

impl CsvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-column types the sampling phase settled on. `None` until
    /// inference has run (it runs on the first pull) or when inference is
    /// disabled.
    pub fn inferred_types(&self) -> Option<Vec<TypeTag>> {
        self.inferred.get().cloned()
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn with_detected_separator(mut self) -> Self {
        self.separator = None;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_schema(mut self, schema: Vec<String>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_target_fields(mut self, fields: Vec<String>) -> Self {
        self.target_fields = Some(fields);
        self
    }

    pub fn with_quote_mode(mut self, mode: QuoteMode) -> Self {
        self.quote_mode = mode;
        self
    }

    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    pub fn with_inferred_types(mut self) -> Self {
        self.infer_schema = true;
        self.schema_inference_mode = SchemaInferenceMode::ColumnNamesAndTypes;
        self.field_type_inference = FieldTypeInference::Primitive;
        self
    }

    pub fn with_limits(mut self, max_columns_per_row: usize, max_raw_record_length: usize) -> Self {
        self.max_columns_per_row = max_columns_per_row;
        self.max_raw_record_length = max_raw_record_length;
        self
    }
}
