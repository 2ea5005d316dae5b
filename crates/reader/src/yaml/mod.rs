//! The hardened YAML reader: multi-document or sequence-root inputs, an
//! event-level security filter, and a type whitelist ahead of
//! materialization through `serde_yaml`.

mod filter;

use self::filter::{DocumentBuilder, FilterLimits};
use crate::chars::CharReader;
use crate::input::Input;
use crate::ReadError;
use ops::{ErrorFlow, ErrorKind, Origin, ProgressTracker, ReadOptions};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::any::TypeId;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io::{self, BufRead};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use yaml_rust2::parser::Parser;

#[derive(Clone)]
pub struct YamlOptions {
    pub common: ReadOptions,
    /// Restrict materialization to an allowed set of target types. With
    /// `allowed_types = None` exactly the requested type is allowed.
    pub restrict_types: bool,
    pub allowed_types: Option<HashSet<TypeId>>,
    pub disallow_aliases: bool,
    pub disallow_custom_tags: bool,
    pub max_depth: usize,
    /// 0 = unlimited. In sequence-root mode this counts elements.
    pub max_total_documents: u64,
    /// 0 = unlimited.
    pub max_node_scalar_length: usize,
}

impl Default for YamlOptions {
    fn default() -> Self {
        YamlOptions {
            common: ReadOptions::default(),
            restrict_types: true,
            allowed_types: None,
            disallow_aliases: true,
            disallow_custom_tags: true,
            max_depth: 64,
            max_total_documents: 0,
            max_node_scalar_length: 0,
        }
    }
}

impl fmt::Debug for YamlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlOptions")
            .field("common", &self.common)
            .field("restrict_types", &self.restrict_types)
            .field("disallow_aliases", &self.disallow_aliases)
            .field("disallow_custom_tags", &self.disallow_custom_tags)
            .field("max_depth", &self.max_depth)
            .field("max_total_documents", &self.max_total_documents)
            .field("max_node_scalar_length", &self.max_node_scalar_length)
            .finish()
    }
}

impl YamlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_types(mut self, types: HashSet<TypeId>) -> Self {
        self.allowed_types = Some(types);
        self
    }

    pub fn permissive(mut self) -> Self {
        self.restrict_types = false;
        self.disallow_aliases = false;
        self.disallow_custom_tags = false;
        self
    }
}

/// Feeds decoded characters to the YAML parser, parking any I/O failure so
/// the reader can surface it after the parser returns, and counting consumed
/// line terminators through a shared cell (the parser owns this iterator).
struct IoChars<R> {
    chars: CharReader<R>,
    error: Arc<Mutex<Option<io::Error>>>,
    lines: Arc<std::sync::atomic::AtomicU64>,
}

impl<R: BufRead> Iterator for IoChars<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self.chars.next_char() {
            Ok(Some(c)) => {
                if c == '\n' {
                    self.lines.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Some(c)
            }
            Ok(None) => None,
            Err(err) => {
                *self.error.lock().unwrap() = Some(err);
                None
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Documents,
    SequenceRoot,
}

/// Opens a YAML reader over `input`. Mode detection (multi-document vs
/// sequence root) happens when the first document is pumped.
pub fn read<T: DeserializeOwned + 'static>(
    mut input: Input,
    options: YamlOptions,
) -> Result<YamlIter<T>, ReadError> {
    input.skip_bom()?;
    let (reader, _, file) = input.into_parts();
    let io_error = Arc::new(Mutex::new(None));
    let limits = FilterLimits {
        disallow_aliases: options.disallow_aliases,
        disallow_custom_tags: options.disallow_custom_tags,
        max_depth: options.max_depth,
        max_node_scalar_length: options.max_node_scalar_length,
    };
    let type_allowed = !options.restrict_types
        || options
            .allowed_types
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&TypeId::of::<T>()));
    let lines = Arc::new(std::sync::atomic::AtomicU64::new(0));
    Ok(YamlIter {
        parser: Parser::new(IoChars {
            chars: CharReader::new(reader),
            error: io_error.clone(),
            lines: lines.clone(),
        }),
        builder: DocumentBuilder::new(limits),
        io_error,
        options,
        file,
        progress: ProgressTracker::new(),
        pending: VecDeque::new(),
        mode: None,
        unit_no: 0,
        lines,
        lines_reported: 0,
        type_allowed,
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

pub struct YamlIter<T> {
    parser: Parser<IoChars<Box<dyn BufRead + Send>>>,
    builder: DocumentBuilder,
    io_error: Arc<Mutex<Option<io::Error>>>,
    options: YamlOptions,
    file: Option<String>,
    progress: ProgressTracker,
    pending: VecDeque<Value>,
    mode: Option<Mode>,
    /// Count of emitted units: documents, or elements in sequence-root mode.
    unit_no: u64,
    lines: Arc<std::sync::atomic::AtomicU64>,
    lines_reported: u64,
    type_allowed: bool,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> YamlIter<T> {
    fn unit_error(&mut self, kind: ErrorKind, message: String, line: u64, excerpt: Option<String>) -> Step<T> {
        match ops::handle_error(
            &self.options.common,
            Origin::Yaml,
            self.file.as_deref(),
            line,
            self.unit_no,
            kind,
            message,
            excerpt,
        ) {
            Ok(ErrorFlow::Continue) => Step::Skip,
            Ok(ErrorFlow::Stop) => Step::Stop,
            Err(fatal) => Step::Fail(fatal.into()),
        }
    }

    fn sync_line_metric(&mut self) {
        let lines = self.lines.load(std::sync::atomic::Ordering::Relaxed);
        if lines > self.lines_reported {
            self.options
                .common
                .metrics
                .add_lines(lines - self.lines_reported);
            self.lines_reported = lines;
        }
    }

    /// Pumps one document out of the parser, returning its filtered value, or
    /// `None` at end of stream.
    fn pump_document(&mut self) -> Result<Option<Value>, Step<T>> {
        self.builder.reset();
        if let Err(scan_error) = self.parser.load(&mut self.builder, false) {
            if let Some(io_error) = self.io_error.lock().unwrap().take() {
                return Err(Step::Fail(io_error.into()));
            }
            // The scan error's display carries its own position diagnostics.
            let line = self.lines.load(std::sync::atomic::Ordering::Relaxed) + 1;
            let message = format!("failed to parse document: {}", scan_error);
            // The scanner cannot re-synchronize after a syntax error, so Skip
            // degrades to a graceful stop.
            return Err(match self.unit_error(ErrorKind::YamlException, message, line, None) {
                Step::Skip => Step::Stop,
                other => other,
            });
        }
        if let Some(io_error) = self.io_error.lock().unwrap().take() {
            return Err(Step::Fail(io_error.into()));
        }

        let root = self.builder.take_root();
        let violations = self.builder.take_violations();
        if let Some(first) = violations.first() {
            let message = first.message.clone();
            let excerpt = Some(format!("line {}, column {}", first.line, first.column));
            return Err(self.unit_error(ErrorKind::YamlSecurityError, message, first.line, excerpt));
        }

        if root.is_none() && self.builder.stream_ended() {
            return Ok(None);
        }
        Ok(Some(root.unwrap_or(Value::Null)))
    }

    fn emit_unit(&mut self, value: Value) -> Step<T> {
        self.unit_no += 1;
        if self.options.max_total_documents > 0 && self.unit_no > self.options.max_total_documents {
            let message = format!(
                "document count exceeds the limit of {}",
                self.options.max_total_documents
            );
            return self.unit_error(ErrorKind::YamlSecurityError, message, 0, None);
        }
        if !self.type_allowed {
            return self.unit_error(
                ErrorKind::TypeRestriction,
                "target type is not in the allowed set".to_string(),
                0,
                None,
            );
        }
        self.options.common.metrics.add_raw_record();
        match serde_yaml::from_value::<T>(value) {
            Ok(value) => {
                self.options.common.metrics.add_emitted();
                self.progress.maybe_emit(&self.options.common, None);
                Step::Emit(value)
            }
            Err(err) => {
                let message = format!("document does not materialize as the target type: {}", err);
                self.unit_error(ErrorKind::TypeRestriction, message, 0, None)
            }
        }
    }

    fn next_step(&mut self) -> Step<T> {
        if let Some(value) = self.pending.pop_front() {
            return self.emit_unit(value);
        }
        let document = match self.pump_document() {
            Ok(document) => document,
            Err(step) => return step,
        };
        self.sync_line_metric();
        match document {
            None => {
                ops::complete(&self.options.common, &mut self.progress, None);
                Step::Finished
            }
            Some(value) => {
                // The first document fixes the mode: a sequence root emits
                // per element, anything else per document.
                let mode = *self.mode.get_or_insert(match value {
                    Value::Sequence(_) => Mode::SequenceRoot,
                    _ => Mode::Documents,
                });
                match (mode, value) {
                    (Mode::SequenceRoot, Value::Sequence(items)) => {
                        self.pending.extend(items);
                        Step::Skip
                    }
                    (_, value) => self.emit_unit(value),
                }
            }
        }
    }
}

impl<T: DeserializeOwned> Iterator for YamlIter<T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.options.common.cancellation.is_cancelled() {
                tracing::debug!("yaml read cancelled");
                self.finished = true;
                return None;
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
