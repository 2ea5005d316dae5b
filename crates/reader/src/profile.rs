//! Serializable reader profiles: the pure-data subset of each reader's
//! options, loadable from a JSON file and applied onto a full options value.
//! A generated draft-07 schema documents each profile for tooling.

use crate::csv::{CsvOptions, FieldTypeInference, NumberFormat, QuoteMode, SchemaInferenceMode};
use crate::json::JsonOptions;
use crate::yaml::YamlOptions;
use crate::ReadError;
use ops::ErrorAction;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn load_profile<P: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<P, ReadError> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| ReadError::Config(format!("failed to parse profile: {}", err)))
}

fn draft07_schema_for<P: JsonSchema>() -> schemars::schema::RootSchema {
    let mut settings = schemars::gen::SchemaSettings::draft07();
    settings.option_add_null_type = false;
    settings.inline_subschemas = true;
    schemars::gen::SchemaGenerator::new(settings).into_root_schema_for::<P>()
}

macro_rules! apply_fields {
    ($profile:expr, $options:expr, { $($field:ident),* $(,)? }) => {
        $(
            if let Some(value) = $profile.$field.clone() {
                $options.$field = value;
            }
        )*
    };
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvProfile {
    /// Explicit separator; omit to let the reader detect one.
    pub separator: Option<char>,
    pub has_header: Option<bool>,
    pub schema: Option<Vec<String>>,
    pub trim_whitespace: Option<bool>,
    pub allow_missing_trailing_fields: Option<bool>,
    pub allow_extra_fields: Option<bool>,
    pub quote_mode: Option<QuoteMode>,
    pub error_on_trailing_garbage_after_closing_quote: Option<bool>,
    pub normalize_newlines_in_fields: Option<bool>,
    pub infer_schema: Option<bool>,
    pub schema_inference_mode: Option<SchemaInferenceMode>,
    pub schema_inference_sample_rows: Option<usize>,
    pub field_type_inference: Option<FieldTypeInference>,
    pub preserve_numeric_strings_with_leading_zeros: Option<bool>,
    pub preserve_large_integer_strings: Option<bool>,
    pub max_columns_per_row: Option<usize>,
    pub max_raw_record_length: Option<usize>,
    pub number_format: Option<NumberFormat>,
    pub error_action: Option<ErrorAction>,
}

impl CsvProfile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        load_profile(path)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        draft07_schema_for::<Self>()
    }

    pub fn apply(&self, options: &mut CsvOptions) {
        if let Some(separator) = self.separator {
            options.separator = Some(separator);
        }
        if let Some(schema) = self.schema.clone() {
            options.schema = Some(schema);
        }
        if let Some(format) = self.number_format {
            options.number_format = Some(format);
        }
        if let Some(action) = self.error_action {
            options.common.error_action = action;
        }
        apply_fields!(self, options, {
            has_header,
            trim_whitespace,
            allow_missing_trailing_fields,
            allow_extra_fields,
            quote_mode,
            error_on_trailing_garbage_after_closing_quote,
            normalize_newlines_in_fields,
            infer_schema,
            schema_inference_mode,
            schema_inference_sample_rows,
            field_type_inference,
            preserve_numeric_strings_with_leading_zeros,
            preserve_large_integer_strings,
            max_columns_per_row,
            max_raw_record_length,
        });
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonProfile {
    pub require_array_root: Option<bool>,
    pub allow_single_object: Option<bool>,
    pub max_depth: Option<usize>,
    pub max_elements: Option<u64>,
    pub max_element_bytes: Option<usize>,
    pub max_string_length: Option<usize>,
    pub guard_rails_enabled: Option<bool>,
    pub error_action: Option<ErrorAction>,
}

impl JsonProfile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        load_profile(path)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        draft07_schema_for::<Self>()
    }

    pub fn apply(&self, options: &mut JsonOptions) {
        if let Some(action) = self.error_action {
            options.common.error_action = action;
        }
        apply_fields!(self, options, {
            require_array_root,
            allow_single_object,
            max_depth,
            max_elements,
            max_element_bytes,
            max_string_length,
            guard_rails_enabled,
        });
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct YamlProfile {
    pub restrict_types: Option<bool>,
    pub disallow_aliases: Option<bool>,
    pub disallow_custom_tags: Option<bool>,
    pub max_depth: Option<usize>,
    pub max_total_documents: Option<u64>,
    pub max_node_scalar_length: Option<usize>,
    pub error_action: Option<ErrorAction>,
}

impl YamlProfile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        load_profile(path)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        draft07_schema_for::<Self>()
    }

    pub fn apply(&self, options: &mut YamlOptions) {
        if let Some(action) = self.error_action {
            options.common.error_action = action;
        }
        apply_fields!(self, options, {
            restrict_types,
            disallow_aliases,
            disallow_custom_tags,
            max_depth,
            max_total_documents,
            max_node_scalar_length,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn a_profile_deserializes_and_applies() {
        let profile: CsvProfile = serde_json::from_value(json!({
            "separator": ";",
            "hasHeader": false,
            "quoteMode": "lenient",
            "maxColumnsPerRow": 12,
            "errorAction": "skip",
        }))
        .unwrap();

        let mut options = CsvOptions::default();
        profile.apply(&mut options);
        assert_eq!(options.separator, Some(';'));
        assert!(!options.has_header);
        assert_eq!(options.quote_mode, QuoteMode::Lenient);
        assert_eq!(options.max_columns_per_row, 12);
        assert_eq!(options.common.error_action, ErrorAction::Skip);
    }

    #[test]
    fn unset_profile_fields_leave_the_options_alone() {
        let profile = JsonProfile::default();
        let mut options = JsonOptions::default();
        profile.apply(&mut options);
        assert!(options.require_array_root);
        assert!(options.allow_single_object);
    }

    #[test]
    fn schemas_generate_for_every_profile() {
        for schema in [
            CsvProfile::json_schema(),
            JsonProfile::json_schema(),
            YamlProfile::json_schema(),
        ] {
            let value = serde_json::to_value(schema).unwrap();
            assert!(value.get("properties").is_some());
        }
    }
}
