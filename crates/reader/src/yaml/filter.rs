//! Event-level YAML document building with a security filter in front of
//! materialization. Each parse event is inspected before it contributes to
//! the document value; offending nodes are recorded as violations and their
//! subtrees skipped, keeping hostile documents away from deserialization.

use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

#[derive(Debug, Clone)]
pub(crate) struct Violation {
    pub message: String,
    pub line: u64,
    pub column: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct FilterLimits {
    pub disallow_aliases: bool,
    pub disallow_custom_tags: bool,
    pub max_depth: usize,
    pub max_node_scalar_length: usize,
}

enum Frame {
    Sequence { items: Vec<Value>, anchor: usize },
    Mapping { map: Mapping, pending_key: Option<Value>, anchor: usize },
}

/// Builds one document value per `Parser::load(…, false)` pump, applying the
/// filter as events arrive.
pub(crate) struct DocumentBuilder {
    limits: FilterLimits,
    stack: Vec<Frame>,
    root: Option<Value>,
    violations: Vec<Violation>,
    anchors: HashMap<usize, Value>,
    /// Depth of unclosed containers inside a skipped subtree.
    skip_nested: Option<u32>,
    stream_ended: bool,
}

impl DocumentBuilder {
    pub fn new(limits: FilterLimits) -> Self {
        DocumentBuilder {
            limits,
            stack: Vec::new(),
            root: None,
            violations: Vec::new(),
            anchors: HashMap::new(),
            skip_nested: None,
            stream_ended: false,
        }
    }

    /// Clears per-document state ahead of the next pump. Anchors reset too;
    /// aliases do not reach across documents.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.root = None;
        self.violations.clear();
        self.anchors.clear();
        self.skip_nested = None;
    }

    pub fn stream_ended(&self) -> bool {
        self.stream_ended
    }

    pub fn take_root(&mut self) -> Option<Value> {
        self.root.take()
    }

    pub fn take_violations(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.violations)
    }

    fn violation(&mut self, message: impl Into<String>, marker: Marker) {
        self.violations.push(Violation {
            message: message.into(),
            line: marker.line() as u64,
            column: marker.col() as u64 + 1,
        });
    }

    fn attach(&mut self, value: Value, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping {
                map, pending_key, ..
            }) => match pending_key.take() {
                None => *pending_key = Some(value),
                Some(key) => {
                    map.insert(key, value);
                }
            },
        }
    }

    /// Filter checks shared by scalars and container starts. Returns false
    /// when the node must be skipped.
    fn admit_node(&mut self, anchor: usize, tag: Option<&Tag>, marker: Marker) -> bool {
        if self.limits.disallow_aliases && anchor > 0 {
            self.violation("anchor definition is not allowed", marker);
            return false;
        }
        if self.limits.disallow_custom_tags {
            if let Some(tag) = tag {
                if !is_core_tag(tag) {
                    self.violation(
                        format!("custom tag !{}{} is not allowed", tag.handle, tag.suffix),
                        marker,
                    );
                    return false;
                }
            }
        }
        true
    }
}

impl MarkedEventReceiver for DocumentBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        // Inside a skipped subtree only container bookkeeping happens.
        if let Some(nested) = self.skip_nested.as_mut() {
            match event {
                Event::SequenceStart(..) | Event::MappingStart(..) => *nested += 1,
                Event::SequenceEnd | Event::MappingEnd => {
                    *nested -= 1;
                    if *nested == 0 {
                        self.skip_nested = None;
                    }
                }
                Event::StreamEnd => self.stream_ended = true,
                _ => {}
            }
            return;
        }

        match event {
            Event::Nothing | Event::StreamStart | Event::DocumentStart | Event::DocumentEnd => {}
            Event::StreamEnd => self.stream_ended = true,
            Event::Alias(id) => {
                if self.limits.disallow_aliases {
                    self.violation("alias reference is not allowed", marker);
                    return;
                }
                let resolved = self.anchors.get(&id).cloned().unwrap_or(Value::Null);
                self.attach(resolved, 0);
            }
            Event::Scalar(value, style, anchor, tag) => {
                if !self.admit_node(anchor, tag.as_ref(), marker) {
                    return;
                }
                if self.limits.max_node_scalar_length > 0 {
                    let length = value.chars().count();
                    if length > self.limits.max_node_scalar_length {
                        self.violation(
                            format!(
                                "scalar of {} characters is over the limit of {}",
                                length, self.limits.max_node_scalar_length
                            ),
                            marker,
                        );
                        return;
                    }
                }
                let resolved = resolve_scalar(value, style, tag.as_ref());
                self.attach(resolved, anchor);
            }
            Event::SequenceStart(anchor, tag) => {
                if !self.admit_container(anchor, tag.as_ref(), marker) {
                    return;
                }
                self.stack.push(Frame::Sequence {
                    items: Vec::new(),
                    anchor,
                });
            }
            Event::MappingStart(anchor, tag) => {
                if !self.admit_container(anchor, tag.as_ref(), marker) {
                    return;
                }
                self.stack.push(Frame::Mapping {
                    map: Mapping::new(),
                    pending_key: None,
                    anchor,
                });
            }
            Event::SequenceEnd => {
                if let Some(Frame::Sequence { items, anchor }) = self.stack.pop() {
                    self.attach(Value::Sequence(items), anchor);
                }
            }
            Event::MappingEnd => {
                if let Some(Frame::Mapping { map, anchor, .. }) = self.stack.pop() {
                    self.attach(Value::Mapping(map), anchor);
                }
            }
        }
    }
}

impl DocumentBuilder {
    fn admit_container(&mut self, anchor: usize, tag: Option<&Tag>, marker: Marker) -> bool {
        if !self.admit_node(anchor, tag, marker) {
            self.skip_nested = Some(1);
            return false;
        }
        let depth = self.stack.len() + 1;
        if depth > self.limits.max_depth {
            self.violation(
                format!(
                    "nesting depth {} is over the limit of {}",
                    depth, self.limits.max_depth
                ),
                marker,
            );
            self.skip_nested = Some(1);
            return false;
        }
        true
    }
}

const CORE_SUFFIXES: &[&str] = &["null", "bool", "int", "float", "str", "seq", "map"];

/// Core YAML 1.2 schema tags are admitted; everything else (local tags,
/// named handles, foreign URIs) counts as custom.
fn is_core_tag(tag: &Tag) -> bool {
    (tag.handle == "tag:yaml.org,2002:" || tag.handle == "!!")
        && CORE_SUFFIXES.contains(&tag.suffix.as_str())
}

/// Core-schema scalar resolution: plain scalars resolve to null/bool/int/
/// float where they match, everything else stays a string. Quoted scalars are
/// always strings; explicit core tags force their type.
fn resolve_scalar(value: String, style: TScalarStyle, tag: Option<&Tag>) -> Value {
    if let Some(tag) = tag.filter(|tag| is_core_tag(tag)) {
        return match tag.suffix.as_str() {
            "null" => Value::Null,
            "bool" => parse_bool(&value).map(Value::Bool).unwrap_or(Value::String(value)),
            "int" => parse_int(&value)
                .map(|n| Value::Number(n.into()))
                .unwrap_or(Value::String(value)),
            "float" => parse_float(&value)
                .map(|f| Value::Number(f.into()))
                .unwrap_or(Value::String(value)),
            _ => Value::String(value),
        };
    }
    if !matches!(style, TScalarStyle::Plain) {
        return Value::String(value);
    }
    match value.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        _ => {}
    }
    if let Some(b) = parse_bool(&value) {
        return Value::Bool(b);
    }
    if let Some(n) = parse_int(&value) {
        return Value::Number(n.into());
    }
    if let Some(f) = parse_float(&value) {
        return Value::Number(f.into());
    }
    Value::String(value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    let (sign, body) = match value.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let parsed = if let Some(hex) = body.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = body.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()?
    } else if body.chars().all(|c| c.is_ascii_digit()) && !body.is_empty() {
        body.parse().ok()?
    } else {
        return None;
    };
    Some(sign * parsed)
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Some(f64::NAN),
        _ => {}
    }
    // Exclude shapes the int rule already rejected as non-numeric, and plain
    // words like `nan` that Rust's float parser would accept.
    if !value.contains(['.', 'e', 'E']) {
        return None;
    }
    if value
        .chars()
        .any(|c| !matches!(c, '0'..='9' | '.' | 'e' | 'E' | '-' | '+'))
    {
        return None;
    }
    value.parse().ok()
}
