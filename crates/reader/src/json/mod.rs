//! The streaming JSON element reader: array-root or single-value inputs,
//! a fast stream-deserialize path, and a buffered validation/guard path for
//! element validators and size limits.

mod splitter;

use self::splitter::{ElementSplitter, RootKind, SplitError, SplitEvent};
use crate::input::Input;
use crate::ReadError;
use ops::{ErrorFlow, ErrorKind, Origin, ProgressTracker, ReadOptions};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::io::BufRead;
use std::marker::PhantomData;
use std::sync::Arc;

const EXCERPT_BYTES: usize = 128;

/// Element validation outcome: `Ok(false)` reports a failed check
/// (`JsonValidationFailed`), `Err` reports a validator that could not run
/// (`JsonValidationError`).
pub type ElementValidator = Arc<dyn Fn(&Value) -> Result<bool, String> + Send + Sync>;

#[derive(Clone)]
pub struct JsonOptions {
    pub common: ReadOptions,
    pub require_array_root: bool,
    pub allow_single_object: bool,
    pub validate_elements: bool,
    pub element_validator: Option<ElementValidator>,
    /// 0 = the default nesting limit (128).
    pub max_depth: usize,
    /// 0 = unlimited.
    pub max_elements: u64,
    /// 0 = unlimited.
    pub max_element_bytes: usize,
    /// 0 = unlimited; enforced recursively over every string in an element.
    pub max_string_length: usize,
    /// Routes elements through the buffered guard path even when no
    /// individual limit or validator demands it.
    pub guard_rails_enabled: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            common: ReadOptions::default(),
            require_array_root: true,
            allow_single_object: true,
            validate_elements: false,
            element_validator: None,
            max_depth: 0,
            max_elements: 0,
            max_element_bytes: 0,
            max_string_length: 0,
            guard_rails_enabled: false,
        }
    }
}

impl fmt::Debug for JsonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonOptions")
            .field("common", &self.common)
            .field("require_array_root", &self.require_array_root)
            .field("allow_single_object", &self.allow_single_object)
            .field("validate_elements", &self.validate_elements)
            .field("max_depth", &self.max_depth)
            .field("max_elements", &self.max_elements)
            .field("max_element_bytes", &self.max_element_bytes)
            .field("max_string_length", &self.max_string_length)
            .field("guard_rails_enabled", &self.guard_rails_enabled)
            .finish()
    }
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(mut self, validator: ElementValidator) -> Self {
        self.validate_elements = true;
        self.element_validator = Some(validator);
        self
    }

    pub fn with_limits(mut self, max_elements: u64, max_element_bytes: usize) -> Self {
        self.max_elements = max_elements;
        self.max_element_bytes = max_element_bytes;
        self
    }

    fn uses_value_path(&self) -> bool {
        (self.validate_elements && self.element_validator.is_some())
            || self.guard_rails_enabled
            || self.max_string_length > 0
    }
}

/// Opens a streaming JSON reader over `input`. Root detection runs on the
/// first pull.
pub fn read<T: DeserializeOwned>(
    mut input: Input,
    options: JsonOptions,
) -> Result<JsonIter<T>, ReadError> {
    if options.validate_elements && options.element_validator.is_none() {
        return Err(ReadError::Config(
            "validate_elements is set but no element_validator is given".to_string(),
        ));
    }
    input.skip_bom()?;
    let total_len = input.total_len();
    let (reader, _, file) = input.into_parts();
    Ok(JsonIter {
        splitter: ElementSplitter::new(reader, options.max_depth, options.max_element_bytes),
        options,
        file,
        total_len,
        progress: ProgressTracker::new(),
        element_no: 0,
        root_checked: false,
        finished: false,
        _marker: PhantomData,
    })
}

enum Step<T> {
    Emit(T),
    Skip,
    Stop,
    Finished,
    Fail(ReadError),
}

pub struct JsonIter<T> {
    splitter: ElementSplitter<Box<dyn BufRead + Send>>,
    options: JsonOptions,
    file: Option<String>,
    total_len: Option<u64>,
    progress: ProgressTracker,
    element_no: u64,
    root_checked: bool,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonIter<T> {
    fn percentage(&self) -> Option<f64> {
        self.total_len.filter(|&total| total > 0).map(|total| {
            let consumed = self.splitter.consumed().min(total);
            100.0 * consumed as f64 / total as f64
        })
    }

    fn element_error(&mut self, kind: ErrorKind, message: String, line: u64, excerpt: Option<String>) -> Step<T> {
        match ops::handle_error(
            &self.options.common,
            Origin::Json,
            self.file.as_deref(),
            line,
            self.element_no,
            kind,
            message,
            excerpt,
        ) {
            Ok(ErrorFlow::Continue) => Step::Skip,
            Ok(ErrorFlow::Stop) => Step::Stop,
            Err(fatal) => Step::Fail(fatal.into()),
        }
    }

    /// `Step::Skip` means the root is acceptable and reading proceeds. A
    /// rejected root under `Skip` completes the run with zero records; there
    /// is no element boundary to resume from.
    fn check_root(&mut self) -> Step<T> {
        match self.splitter.detect_root() {
            Ok(RootKind::Array) => Step::Skip,
            Ok(RootKind::Single) => {
                if self.options.require_array_root && !self.options.allow_single_object {
                    let step = self.element_error(
                        ErrorKind::JsonRootError,
                        "input root is a single value but an array root is required".to_string(),
                        self.splitter.line(),
                        None,
                    );
                    match step {
                        Step::Skip => {
                            let pct = self.percentage();
                            ops::complete(&self.options.common, &mut self.progress, pct);
                            Step::Finished
                        }
                        other => other,
                    }
                } else {
                    Step::Skip
                }
            }
            Err(err) => {
                let step = self.split_error(err);
                match step {
                    Step::Skip => Step::Stop,
                    other => other,
                }
            }
        }
    }

    fn split_error(&mut self, err: SplitError) -> Step<T> {
        match err {
            SplitError::Io(err) => Step::Fail(err.into()),
            SplitError::Syntax { message, line } => {
                self.element_error(ErrorKind::JsonException, message, line, None)
            }
        }
    }

    fn next_step(&mut self) -> Step<T> {
        let event = match self.splitter.next_element() {
            Ok(event) => event,
            Err(err) => {
                // Syntax errors are not recoverable mid-stream: even under
                // Skip there is no next boundary to resume from.
                let step = self.split_error(err);
                return match step {
                    Step::Skip => Step::Stop,
                    other => other,
                };
            }
        };
        match event {
            SplitEvent::End => {
                let pct = self.percentage();
                ops::complete(&self.options.common, &mut self.progress, pct);
                Step::Finished
            }
            SplitEvent::Oversized { line, reason } => {
                self.element_no += 1;
                self.element_error(ErrorKind::JsonSizeLimit, reason, line, None)
            }
            SplitEvent::Element { bytes, line } => {
                self.element_no += 1;
                if self.options.max_elements > 0 && self.element_no > self.options.max_elements {
                    let message = format!(
                        "element count exceeds the limit of {}",
                        self.options.max_elements
                    );
                    return self.element_error(ErrorKind::JsonSizeLimit, message, line, None);
                }
                self.emit_element(bytes, line)
            }
        }
    }

    fn emit_element(&mut self, bytes: Vec<u8>, line: u64) -> Step<T> {
        let excerpt = || {
            let head = &bytes[..bytes.len().min(EXCERPT_BYTES)];
            Some(String::from_utf8_lossy(head).into_owned())
        };

        let value: T = if self.options.uses_value_path() {
            let element: Value = match serde_json::from_slice(&bytes) {
                Ok(element) => element,
                Err(err) => {
                    let message = format!("failed to parse element: {}", err);
                    return self.element_error(ErrorKind::JsonException, message, line, excerpt());
                }
            };
            if self.options.max_string_length > 0 {
                if let Some(length) = over_long_string(&element, self.options.max_string_length) {
                    let message = format!(
                        "element contains a {} character string, over the limit of {}",
                        length, self.options.max_string_length
                    );
                    return self.element_error(ErrorKind::JsonSizeLimit, message, line, excerpt());
                }
            }
            self.options.common.metrics.add_raw_record();
            if self.options.validate_elements {
                let validator = self
                    .options
                    .element_validator
                    .as_ref()
                    .expect("checked at construction");
                match validator(&element) {
                    Ok(true) => {}
                    Ok(false) => {
                        return self.element_error(
                            ErrorKind::JsonValidationFailed,
                            "element failed validation".to_string(),
                            line,
                            excerpt(),
                        );
                    }
                    Err(message) => {
                        return self.element_error(
                            ErrorKind::JsonValidationError,
                            format!("element validator failed: {}", message),
                            line,
                            excerpt(),
                        );
                    }
                }
            }
            match serde_json::from_value(element) {
                Ok(value) => value,
                Err(err) => {
                    let message = format!("failed to deserialize element: {}", err);
                    return self.element_error(ErrorKind::JsonException, message, line, excerpt());
                }
            }
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    self.options.common.metrics.add_raw_record();
                    value
                }
                Err(err) => {
                    let message = format!("failed to parse element: {}", err);
                    return self.element_error(ErrorKind::JsonException, message, line, excerpt());
                }
            }
        };

        self.options.common.metrics.add_emitted();
        let percentage = self.percentage();
        self.progress.maybe_emit(&self.options.common, percentage);
        Step::Emit(value)
    }
}

fn over_long_string(value: &Value, limit: usize) -> Option<usize> {
    match value {
        Value::String(s) => {
            let length = s.chars().count();
            (length > limit).then_some(length)
        }
        Value::Array(items) => items.iter().find_map(|item| over_long_string(item, limit)),
        Value::Object(entries) => entries
            .values()
            .find_map(|entry| over_long_string(entry, limit)),
        _ => None,
    }
}

impl<T: DeserializeOwned> Iterator for JsonIter<T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.options.common.cancellation.is_cancelled() {
                tracing::debug!("json read cancelled");
                self.finished = true;
                return None;
            }
            if !self.root_checked {
                match self.check_root() {
                    Step::Skip => {
                        self.root_checked = true;
                        continue;
                    }
                    Step::Stop | Step::Finished => {
                        self.finished = true;
                        return None;
                    }
                    Step::Fail(err) => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                    Step::Emit(_) => unreachable!("root checking emits nothing"),
                }
            }
            match self.next_step() {
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
