//! Byte-level splitter that carves one top-level element at a time out of a
//! JSON byte stream, without materializing anything beyond the element
//! currently being read. Depth and element-size guard rails are enforced
//! while scanning, so an oversized element is discarded, not buffered.

use memchr::memchr2;
use std::io::{self, Read};

const READ_CHUNK: usize = 8 * 1024;
const DEFAULT_MAX_DEPTH: usize = 128;

pub(crate) struct ByteCursor<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    consumed: u64,
    line: u64,
}

impl<R: Read> ByteCursor<R> {
    fn new(inner: R) -> Self {
        ByteCursor {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            eof: false,
            consumed: 0,
            line: 1,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        self.buf.drain(..self.pos);
        self.pos = 0;
        let mut chunk = [0u8; READ_CHUNK];
        let read = self.inner.read(&mut chunk)?;
        if read == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        loop {
            if self.pos < self.buf.len() {
                return Ok(Some(self.buf[self.pos]));
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn bump(&mut self) -> Option<u8> {
        // Only call after a successful peek.
        let b = self.buf[self.pos];
        self.pos += 1;
        self.consumed += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    fn bump_n(&mut self, n: usize) {
        let run = &self.buf[self.pos..self.pos + n];
        self.line += run.iter().filter(|&&b| b == b'\n').count() as u64;
        self.pos += n;
        self.consumed += n as u64;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RootKind {
    Array,
    Single,
}

#[derive(Debug)]
pub(crate) enum SplitEvent {
    Element { bytes: Vec<u8>, line: u64 },
    /// The element exceeded a scan-time guard rail and has been consumed and
    /// discarded; parsing can continue with the next element.
    Oversized { line: u64, reason: String },
    End,
}

#[derive(Debug)]
pub(crate) enum SplitError {
    Io(io::Error),
    Syntax { message: String, line: u64 },
}

impl From<io::Error> for SplitError {
    fn from(err: io::Error) -> Self {
        SplitError::Io(err)
    }
}

pub(crate) struct ElementSplitter<R> {
    bytes: ByteCursor<R>,
    max_depth: usize,
    max_element_bytes: usize,
    root: Option<RootKind>,
    first_element: bool,
    ended: bool,
}

impl<R: Read> ElementSplitter<R> {
    pub fn new(reader: R, max_depth: usize, max_element_bytes: usize) -> Self {
        ElementSplitter {
            bytes: ByteCursor::new(reader),
            max_depth: if max_depth == 0 {
                DEFAULT_MAX_DEPTH
            } else {
                max_depth
            },
            max_element_bytes,
            root: None,
            first_element: true,
            ended: false,
        }
    }

    /// Total bytes consumed, for progress percentages.
    pub fn consumed(&self) -> u64 {
        self.bytes.consumed
    }

    pub fn line(&self) -> u64 {
        self.bytes.line
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.bytes.peek()? {
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n') {
                self.bytes.bump();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn syntax(&self, message: impl Into<String>) -> SplitError {
        SplitError::Syntax {
            message: message.into(),
            line: self.bytes.line,
        }
    }

    /// Looks at the first non-whitespace byte to classify the root. An array
    /// root is entered (its `[` is consumed); any other root is left in place
    /// to be read as a single element.
    pub fn detect_root(&mut self) -> Result<RootKind, SplitError> {
        self.skip_whitespace()?;
        let kind = match self.bytes.peek()? {
            None => return Err(self.syntax("input contains no JSON value")),
            Some(b'[') => {
                self.bytes.bump();
                RootKind::Array
            }
            Some(_) => RootKind::Single,
        };
        self.root = Some(kind);
        Ok(kind)
    }

    /// Verifies only whitespace remains after the root value.
    fn expect_end_of_input(&mut self) -> Result<(), SplitError> {
        self.skip_whitespace()?;
        match self.bytes.peek()? {
            None => Ok(()),
            Some(b) => Err(self.syntax(format!(
                "unexpected trailing content after the root value: {:?}",
                b as char
            ))),
        }
    }

    pub fn next_element(&mut self) -> Result<SplitEvent, SplitError> {
        if self.ended {
            return Ok(SplitEvent::End);
        }
        match self.root.expect("detect_root must run first") {
            RootKind::Single => {
                let event = self.scan_value()?;
                self.ended = true;
                self.expect_end_of_input()?;
                Ok(event)
            }
            RootKind::Array => {
                self.skip_whitespace()?;
                match self.bytes.peek()? {
                    None => Err(self.syntax("unterminated array: expected ',' or ']'")),
                    Some(b']') => {
                        self.bytes.bump();
                        self.ended = true;
                        self.expect_end_of_input()?;
                        Ok(SplitEvent::End)
                    }
                    Some(b',') if !self.first_element => {
                        self.bytes.bump();
                        self.skip_whitespace()?;
                        self.first_element = false;
                        let event = self.scan_value()?;
                        Ok(event)
                    }
                    Some(_) if self.first_element => {
                        self.first_element = false;
                        self.scan_value()
                    }
                    Some(b) => Err(self.syntax(format!(
                        "expected ',' or ']' between array elements, found {:?}",
                        b as char
                    ))),
                }
            }
        }
    }

    /// Scans exactly one JSON value, returning its raw bytes. Structural
    /// bytes are tracked (string/escape state and container depth) but not
    /// interpreted; `serde_json` does the real parsing later.
    fn scan_value(&mut self) -> Result<SplitEvent, SplitError> {
        let start_line = self.bytes.line;
        let mut out: Vec<u8> = Vec::new();
        let mut size: usize = 0;
        let mut depth: usize = 0;
        let mut in_string = false;
        let mut escaped = false;
        let mut started = false;
        let mut container = false;
        let mut oversized: Option<String> = None;

        loop {
            let complete = started && depth == 0 && !in_string;
            let b = match self.bytes.peek()? {
                Some(b) => b,
                None => {
                    if complete {
                        break;
                    }
                    return Err(self.syntax("unexpected end of input inside a value"));
                }
            };

            if in_string {
                if escaped {
                    self.push(&mut out, &mut size, &mut oversized, b);
                    escaped = false;
                    continue;
                }
                if b == b'\\' {
                    self.push(&mut out, &mut size, &mut oversized, b);
                    escaped = true;
                    continue;
                }
                if b == b'"' {
                    self.push(&mut out, &mut size, &mut oversized, b);
                    in_string = false;
                    if depth == 0 {
                        break;
                    }
                    continue;
                }
                // Plain string content: copy the whole buffered run up to the
                // next quote or escape in one step.
                let run = {
                    let chunk = self.bytes.buffered();
                    memchr2(b'"', b'\\', chunk).unwrap_or(chunk.len())
                };
                if oversized.is_none() {
                    out.extend_from_slice(&self.bytes.buffered()[..run]);
                }
                size += run;
                if oversized.is_none()
                    && self.max_element_bytes > 0
                    && size > self.max_element_bytes
                {
                    oversized = Some(format!(
                        "element is larger than the {} byte limit",
                        self.max_element_bytes
                    ));
                    out.clear();
                    out.shrink_to_fit();
                }
                self.bytes.bump_n(run);
                continue;
            }

            match b {
                b'"' => {
                    if complete {
                        break;
                    }
                    started = true;
                    in_string = true;
                    self.push(&mut out, &mut size, &mut oversized, b);
                }
                b'{' | b'[' => {
                    if complete {
                        break;
                    }
                    started = true;
                    container = true;
                    depth += 1;
                    if depth > self.max_depth && oversized.is_none() {
                        oversized = Some(format!(
                            "element nesting exceeds the depth limit of {}",
                            self.max_depth
                        ));
                    }
                    self.push(&mut out, &mut size, &mut oversized, b);
                }
                b'}' | b']' => {
                    if depth == 0 {
                        // Terminates a scalar; the byte belongs to the array.
                        if started {
                            break;
                        }
                        return Err(self.syntax("unexpected closing bracket"));
                    }
                    depth -= 1;
                    self.push(&mut out, &mut size, &mut oversized, b);
                    if depth == 0 && container {
                        break;
                    }
                }
                b',' => {
                    if depth == 0 {
                        if !started {
                            return Err(self.syntax("unexpected comma"));
                        }
                        break;
                    }
                    self.push(&mut out, &mut size, &mut oversized, b);
                }
                b' ' | b'\t' | b'\r' | b'\n' => {
                    if depth == 0 {
                        if started {
                            break;
                        }
                        self.bytes.bump();
                        continue;
                    }
                    self.push(&mut out, &mut size, &mut oversized, b);
                }
                _ => {
                    started = true;
                    self.push(&mut out, &mut size, &mut oversized, b);
                }
            }
        }

        match oversized {
            Some(reason) => Ok(SplitEvent::Oversized {
                line: start_line,
                reason,
            }),
            None => Ok(SplitEvent::Element {
                bytes: out,
                line: start_line,
            }),
        }
    }

    /// Consumes `b` into the element buffer, switching to discard mode once a
    /// guard rail trips so memory stays bounded.
    fn push(&mut self, out: &mut Vec<u8>, size: &mut usize, oversized: &mut Option<String>, b: u8) {
        self.bytes.bump();
        *size += 1;
        if oversized.is_none() && self.max_element_bytes > 0 && *size > self.max_element_bytes {
            *oversized = Some(format!(
                "element is larger than the {} byte limit",
                self.max_element_bytes
            ));
        }
        if oversized.is_none() {
            out.push(b);
        } else if !out.is_empty() {
            out.clear();
            out.shrink_to_fit();
        }
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn split_all(content: &str) -> Result<Vec<String>, SplitError> {
        let mut splitter =
            ElementSplitter::new(Cursor::new(content.as_bytes().to_vec()), 0, 0);
        splitter.detect_root()?;
        let mut out = Vec::new();
        loop {
            match splitter.next_element()? {
                SplitEvent::Element { bytes, .. } => {
                    out.push(String::from_utf8(bytes).unwrap());
                }
                SplitEvent::Oversized { reason, .. } => panic!("oversized: {}", reason),
                SplitEvent::End => return Ok(out),
            }
        }
    }

    #[test]
    fn splits_array_elements_of_every_shape() {
        let elements =
            split_all(r#"[1, "two", {"three": [3, 3]}, [4], true, null, -5.5e2]"#).unwrap();
        assert_eq!(
            elements,
            vec![
                "1",
                "\"two\"",
                "{\"three\": [3, 3]}",
                "[4]",
                "true",
                "null",
                "-5.5e2"
            ]
        );
    }

    #[test]
    fn an_empty_array_splits_to_nothing() {
        assert!(split_all("[]").unwrap().is_empty());
        assert!(split_all(" [ ] ").unwrap().is_empty());
    }

    #[test]
    fn a_single_root_value_is_one_element() {
        assert_eq!(split_all(r#"{"a": 1}"#).unwrap(), vec!["{\"a\": 1}"]);
        assert_eq!(split_all("42").unwrap(), vec!["42"]);
    }

    #[test]
    fn strings_may_contain_structural_characters() {
        let elements = split_all(r#"["a,b]", "quote \" inside"]"#).unwrap();
        assert_eq!(elements, vec!["\"a,b]\"", "\"quote \\\" inside\""]);
    }

    #[test]
    fn trailing_garbage_after_the_root_is_a_syntax_error() {
        assert!(matches!(
            split_all("[1] extra"),
            Err(SplitError::Syntax { .. })
        ));
        assert!(matches!(
            split_all("{\"a\":1} {\"b\":2}"),
            Err(SplitError::Syntax { .. })
        ));
    }

    #[test]
    fn an_unterminated_array_is_a_syntax_error() {
        assert!(matches!(
            split_all("[1, 2"),
            Err(SplitError::Syntax { .. })
        ));
    }

    #[test]
    fn missing_commas_are_a_syntax_error() {
        assert!(matches!(
            split_all("[1 2]"),
            Err(SplitError::Syntax { .. })
        ));
    }

    #[test]
    fn oversized_elements_are_discarded_but_the_stream_continues() {
        let content = r#"[{"big": "0123456789012345678901234567890123456789"}, 7]"#;
        let mut splitter = ElementSplitter::new(Cursor::new(content.as_bytes().to_vec()), 0, 16);
        splitter.detect_root().unwrap();

        match splitter.next_element().unwrap() {
            SplitEvent::Oversized { reason, .. } => assert!(reason.contains("16 byte limit")),
            other => panic!("expected oversized, got {:?}", other),
        }
        match splitter.next_element().unwrap() {
            SplitEvent::Element { bytes, .. } => assert_eq!(bytes, b"7"),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn over_deep_elements_are_discarded() {
        let mut splitter =
            ElementSplitter::new(Cursor::new(b"[[[[1]]], 2]".to_vec()), 2, 0);
        splitter.detect_root().unwrap();
        assert!(matches!(
            splitter.next_element().unwrap(),
            SplitEvent::Oversized { .. }
        ));
        match splitter.next_element().unwrap() {
            SplitEvent::Element { bytes, .. } => assert_eq!(bytes, b"2"),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn line_numbers_track_newlines() {
        let content = "[\n1,\n2\n]";
        let mut splitter = ElementSplitter::new(Cursor::new(content.as_bytes().to_vec()), 0, 0);
        splitter.detect_root().unwrap();
        match splitter.next_element().unwrap() {
            SplitEvent::Element { bytes, line } => {
                assert_eq!(bytes, b"1");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
        match splitter.next_element().unwrap() {
            SplitEvent::Element { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
