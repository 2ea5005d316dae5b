//! The CSV reader: RFC-4180-strict tokenization, schema and type inference,
//! guard rails, raw-record audit, and materialization into caller types.

mod detect;
mod infer;
mod mapping;
mod numbers;
mod options;
mod tokenizer;
mod types;

pub use self::options::{
    ColumnNamer, CsvOptions, FieldTypeInference, NumberFormat, QuoteMode, RawRecordObserver,
    SchemaInferenceMode, ValueConverter,
};
pub use self::types::TypeTag;

use self::infer::InferenceState;
use self::mapping::{map_column_names, resolve_column_names};
use self::tokenizer::{Outcome, RawRecord, Tokenizer};
use crate::input::Input;
use crate::ReadError;
use ops::{ErrorFlow, ErrorKind, Origin, ProgressTracker};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::BufRead;
use std::marker::PhantomData;

const DETECTION_PEEK_BYTES: usize = 8 * 1024;
const EXCERPT_CHARS: usize = 128;

/// Opens a CSV reader over `input`. Column resolution, sampling and
/// inference run on the first pull; the returned iterator is cold.
pub fn read<T: DeserializeOwned>(
    mut input: Input,
    options: CsvOptions,
) -> Result<CsvIter<T>, ReadError> {
    if let Some(separator) = options.separator {
        if matches!(separator, '"' | '\r' | '\n') {
            return Err(ReadError::Config(format!(
                "separator {:?} collides with the record syntax",
                separator
            )));
        }
    }
    if options.field_type_inference == FieldTypeInference::Custom
        && options.field_value_converter.is_none()
    {
        return Err(ReadError::Config(
            "field_type_inference is Custom but no field_value_converter is set".to_string(),
        ));
    }

    input.skip_bom()?;
    let separator = match options.separator {
        Some(separator) => separator,
        None => {
            let peeked = input.peek(DETECTION_PEEK_BYTES)?;
            detect::detect_separator(&String::from_utf8_lossy(&peeked))
        }
    };

    let (reader, _len, file) = input.into_parts();
    let tokenizer = Tokenizer::new(
        reader,
        separator,
        options.quote_mode,
        options.error_on_trailing_garbage_after_closing_quote,
        options.normalize_newlines_in_fields,
    );
    Ok(CsvIter {
        tokenizer,
        options,
        file,
        columns: Vec::new(),
        keys: Vec::new(),
        plans: Vec::new(),
        buffered: VecDeque::new(),
        progress: ProgressTracker::new(),
        record_no: 0,
        initialized: false,
        finished: false,
        _marker: PhantomData,
    })
}

enum ColumnPlan {
    Raw,
    Typed(TypeTag),
    Custom,
}

enum Step<T> {
    Emit(T),
    Skip,
    Stop,
    Finished,
    Fail(ReadError),
}

pub struct CsvIter<T> {
    tokenizer: Tokenizer<Box<dyn BufRead + Send>>,
    options: CsvOptions,
    file: Option<String>,
    columns: Vec<String>,
    keys: Vec<String>,
    plans: Vec<ColumnPlan>,
    buffered: VecDeque<Outcome>,
    progress: ProgressTracker,
    record_no: u64,
    initialized: bool,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CsvIter<T> {
    /// The resolved column names, available after the first pull.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Consumes the header (when configured), resolves column names, samples
    /// rows for inference, and fixes the per-column conversion plans.
    /// Returns false when the run already ended (empty input, or Stop on a
    /// header error).
    fn initialize(&mut self) -> Result<bool, ReadError> {
        let mut header: Option<Vec<String>> = None;
        let mut width_hint = 0usize;

        if self.options.has_header {
            loop {
                match self.tokenizer.next_record()? {
                    Outcome::Record(record) => {
                        self.options.common.metrics.add_lines(record.lines_spanned);
                        let mut fields = record.fields;
                        if self.options.trim_whitespace {
                            for field in &mut fields {
                                *field = field.trim().to_string();
                            }
                        }
                        width_hint = fields.len();
                        header = Some(fields);
                        break;
                    }
                    Outcome::QuoteError {
                        message,
                        excerpt,
                        start_line,
                        lines_spanned,
                    } => {
                        self.options.common.metrics.add_lines(lines_spanned);
                        match ops::handle_error(
                            &self.options.common,
                            Origin::Csv,
                            self.file.as_deref(),
                            start_line,
                            0,
                            ErrorKind::CsvQuoteError,
                            message,
                            Some(excerpt),
                        ) {
                            Ok(ErrorFlow::Continue) => continue,
                            Ok(ErrorFlow::Stop) => return Ok(false),
                            Err(fatal) => return Err(fatal.into()),
                        }
                    }
                    Outcome::Eof => {
                        ops::complete(&self.options.common, &mut self.progress, None);
                        return Ok(false);
                    }
                }
            }
        } else if self.options.schema.is_none() {
            // Headerless and schemaless: the first record fixes the width for
            // synthetic names, then replays as data.
            loop {
                match self.tokenizer.next_record()? {
                    Outcome::Record(record) => {
                        width_hint = record.fields.len();
                        self.buffered.push_back(Outcome::Record(record));
                        break;
                    }
                    outcome @ Outcome::QuoteError { .. } => {
                        self.buffered.push_back(outcome);
                    }
                    Outcome::Eof => break,
                }
            }
        }

        self.columns =
            resolve_column_names(header.as_deref(), width_hint, &self.options, self.file.as_deref());

        let want_inference = self.options.infer_schema
            && self.options.schema_inference_mode == SchemaInferenceMode::ColumnNamesAndTypes;
        let mut inferred: Option<Vec<TypeTag>> = None;
        if want_inference {
            let mut state = InferenceState::new(self.columns.len());
            let mut sampled = 0usize;
            for outcome in &self.buffered {
                if let Outcome::Record(record) = outcome {
                    state.observe(&record.fields, &self.options);
                    sampled += 1;
                }
            }
            while sampled < self.options.schema_inference_sample_rows {
                match self.tokenizer.next_record()? {
                    Outcome::Record(record) => {
                        state.observe(&record.fields, &self.options);
                        self.buffered.push_back(Outcome::Record(record));
                        sampled += 1;
                    }
                    outcome @ Outcome::QuoteError { .. } => {
                        self.buffered.push_back(outcome);
                    }
                    Outcome::Eof => break,
                }
            }
            let mut types = state.finish();
            types.resize(self.columns.len(), TypeTag::String);
            let _ = self.options.inferred.set(types.clone());
            inferred = Some(types);
        }

        self.keys = map_column_names(&self.columns, self.options.target_fields.as_deref());
        self.plans = (0..self.columns.len())
            .map(|index| match self.options.field_type_inference {
                FieldTypeInference::Custom => ColumnPlan::Custom,
                FieldTypeInference::Primitive => inferred
                    .as_ref()
                    .and_then(|types| types.get(index))
                    .map(|&tag| ColumnPlan::Typed(tag))
                    .unwrap_or(ColumnPlan::Raw),
                FieldTypeInference::None => ColumnPlan::Raw,
            })
            .collect();
        Ok(true)
    }
}

impl<T: DeserializeOwned> CsvIter<T> {
    fn record_error(&mut self, kind: ErrorKind, message: String, raw: &str, line: u64) -> Step<T> {
        let excerpt: String = raw.chars().take(EXCERPT_CHARS).collect();
        match ops::handle_error(
            &self.options.common,
            Origin::Csv,
            self.file.as_deref(),
            line,
            self.record_no,
            kind,
            message,
            Some(excerpt),
        ) {
            Ok(ErrorFlow::Continue) => Step::Skip,
            Ok(ErrorFlow::Stop) => Step::Stop,
            Err(fatal) => Step::Fail(fatal.into()),
        }
    }

    fn step(&mut self, outcome: Outcome) -> Step<T> {
        match outcome {
            Outcome::Eof => {
                ops::complete(&self.options.common, &mut self.progress, None);
                Step::Finished
            }
            Outcome::QuoteError {
                message,
                excerpt,
                start_line,
                lines_spanned,
            } => {
                self.options.common.metrics.add_lines(lines_spanned);
                self.record_no += 1;
                match ops::handle_error(
                    &self.options.common,
                    Origin::Csv,
                    self.file.as_deref(),
                    start_line,
                    self.record_no,
                    ErrorKind::CsvQuoteError,
                    message,
                    Some(excerpt),
                ) {
                    Ok(ErrorFlow::Continue) => Step::Skip,
                    Ok(ErrorFlow::Stop) => Step::Stop,
                    Err(fatal) => Step::Fail(fatal.into()),
                }
            }
            Outcome::Record(record) => self.emit_record(record),
        }
    }

    fn emit_record(&mut self, record: RawRecord) -> Step<T> {
        let RawRecord {
            mut fields,
            raw,
            start_line,
            lines_spanned,
        } = record;
        let metrics = &self.options.common.metrics;
        metrics.add_lines(lines_spanned);
        metrics.add_raw_record();
        self.record_no += 1;

        // Guard rails, in order, at the record boundary; the first trigger
        // wins and equality passes.
        if self.options.max_columns_per_row > 0 && fields.len() > self.options.max_columns_per_row {
            let message = format!(
                "record has {} columns, over the limit of {}",
                fields.len(),
                self.options.max_columns_per_row
            );
            return self.record_error(ErrorKind::CsvLimitExceeded, message, &raw, start_line);
        }
        if self.options.max_raw_record_length > 0 {
            let length = raw.chars().count();
            if length > self.options.max_raw_record_length {
                let message = format!(
                    "record is {} characters long, over the limit of {}",
                    length, self.options.max_raw_record_length
                );
                return self.record_error(ErrorKind::CsvLimitExceeded, message, &raw, start_line);
            }
        }

        if self.options.trim_whitespace {
            for field in &mut fields {
                *field = field.trim().to_string();
            }
        }

        let width = self.columns.len();
        if fields.len() < width && !self.options.allow_missing_trailing_fields {
            let message = format!(
                "record has {} fields but the schema defines {}",
                fields.len(),
                width
            );
            return self.record_error(ErrorKind::SchemaError, message, &raw, start_line);
        }
        if fields.len() > width {
            if self.options.allow_extra_fields {
                fields.truncate(width);
            } else {
                let message = format!(
                    "record has {} fields but the schema defines {}",
                    fields.len(),
                    width
                );
                return self.record_error(ErrorKind::SchemaError, message, &raw, start_line);
            }
        }

        let mut object = serde_json::Map::with_capacity(width);
        for (index, key) in self.keys.iter().enumerate() {
            let value = match fields.get(index) {
                // Missing trailing fields pad with the column's default:
                // null for typed columns, empty for raw strings.
                None => match self.plans[index] {
                    ColumnPlan::Raw => Value::String(String::new()),
                    _ => Value::Null,
                },
                Some(field) => match &self.plans[index] {
                    ColumnPlan::Raw => Value::String(field.clone()),
                    ColumnPlan::Custom => {
                        let converter = self
                            .options
                            .field_value_converter
                            .as_ref()
                            .expect("checked at construction");
                        converter(field)
                    }
                    ColumnPlan::Typed(tag) => {
                        let tag = *tag;
                        match tag.parse(field, self.options.number_format.as_ref()) {
                            Some(value) => value,
                            None => {
                                // First enforcement failure demotes the
                                // column to string for the rest of the run.
                                tracing::warn!(
                                    column = %key,
                                    inferred = ?tag,
                                    "inferred type failed to parse; demoting column to string"
                                );
                                self.plans[index] = ColumnPlan::Raw;
                                Value::String(field.clone())
                            }
                        }
                    }
                },
            };
            object.insert(key.clone(), value);
        }

        match serde_json::from_value::<T>(Value::Object(object)) {
            Ok(value) => {
                self.options.common.metrics.add_emitted();
                if self.options.capture_raw_record {
                    if let Some(observer) = &self.options.raw_record_observer {
                        observer(self.record_no, &raw);
                    }
                }
                self.progress.maybe_emit(&self.options.common, None);
                Step::Emit(value)
            }
            Err(err) => {
                let message = format!("failed to materialize record: {}", err);
                self.record_error(ErrorKind::SchemaError, message, &raw, start_line)
            }
        }
    }
}

impl<T: DeserializeOwned> Iterator for CsvIter<T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.options.common.cancellation.is_cancelled() {
                tracing::debug!("csv read cancelled");
                self.finished = true;
                return None;
            }
            if !self.initialized {
                match self.initialize() {
                    Ok(true) => {
                        self.initialized = true;
                        continue;
                    }
                    Ok(false) => {
                        self.finished = true;
                        return None;
                    }
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                }
            }
            let outcome = match self.buffered.pop_front() {
                Some(outcome) => outcome,
                None => match self.tokenizer.next_record() {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        self.finished = true;
                        return Some(Err(err.into()));
                    }
                },
            };
            match self.step(outcome) {
                Step::Emit(value) => return Some(Ok(value)),
                Step::Skip => continue,
                Step::Stop | Step::Finished => {
                    self.finished = true;
                    return None;
                }
                Step::Fail(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
