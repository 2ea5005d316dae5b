//! The RFC-4180 tokenizer: a character-level state machine producing logical
//! records (a vector of field strings) from a UTF-8 byte stream. Memory per
//! record is O(record length); quoted fields may span physical lines.

use crate::chars::CharReader;
use crate::csv::options::QuoteMode;
use std::io::{self, BufRead};

const EXCERPT_CHARS: usize = 128;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    FieldStart,
    InUnquoted,
    InQuoted,
    AfterClosingQuote,
}

/// One tokenized logical record.
#[derive(Debug)]
pub(crate) struct RawRecord {
    pub fields: Vec<String>,
    pub raw: String,
    /// 1-based physical line on which the record starts.
    pub start_line: u64,
    /// Physical line terminators consumed while reading the record,
    /// embedded ones included.
    pub lines_spanned: u64,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Record(RawRecord),
    /// A tokenization failure. The reader has already been re-synchronized to
    /// the next record boundary.
    QuoteError {
        message: String,
        excerpt: String,
        start_line: u64,
        lines_spanned: u64,
    },
    Eof,
}

pub(crate) struct Tokenizer<R> {
    chars: CharReader<R>,
    pending: Option<char>,
    separator: char,
    quote_mode: QuoteMode,
    error_on_trailing_garbage: bool,
    normalize_newlines: bool,
    next_line: u64,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(
        reader: R,
        separator: char,
        quote_mode: QuoteMode,
        error_on_trailing_garbage: bool,
        normalize_newlines: bool,
    ) -> Self {
        Tokenizer {
            chars: CharReader::new(reader),
            pending: None,
            separator,
            quote_mode,
            error_on_trailing_garbage,
            normalize_newlines,
            next_line: 1,
        }
    }

    pub fn consumed_bytes(&self) -> u64 {
        self.chars.consumed()
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        match self.pending.take() {
            Some(c) => Ok(Some(c)),
            None => self.chars.next_char(),
        }
    }

    /// Consumes a record terminator whose first character was `first`,
    /// folding `\r\n` into one terminator.
    fn consume_terminator(&mut self, first: char) -> io::Result<()> {
        if first == '\r' {
            match self.read_char()? {
                Some('\n') | None => {}
                other => self.pending = other,
            }
        }
        Ok(())
    }

    pub fn next_record(&mut self) -> io::Result<Outcome> {
        let start_line = self.next_line;
        let mut state = State::FieldStart;
        let mut fields: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut raw = String::new();
        let mut lines = 0u64;

        macro_rules! finish {
            () => {{
                fields.push(std::mem::take(&mut field));
                self.next_line = start_line + lines;
                return Ok(Outcome::Record(RawRecord {
                    fields,
                    raw,
                    start_line,
                    lines_spanned: lines,
                }));
            }};
        }

        loop {
            let c = match self.read_char()? {
                Some(c) => c,
                None => {
                    // EOF.
                    return match state {
                        State::InQuoted => {
                            self.next_line = start_line + lines;
                            Ok(self.quote_error(
                                "unterminated quoted field at end of input",
                                &raw,
                                start_line,
                                lines,
                                false,
                            )?)
                        }
                        State::FieldStart if fields.is_empty() && raw.is_empty() => {
                            Ok(Outcome::Eof)
                        }
                        _ => finish!(),
                    };
                }
            };

            match state {
                State::FieldStart => match c {
                    '"' => {
                        raw.push(c);
                        state = State::InQuoted;
                    }
                    c if c == self.separator => {
                        raw.push(c);
                        fields.push(std::mem::take(&mut field));
                    }
                    '\r' | '\n' => {
                        self.consume_terminator(c)?;
                        lines += 1;
                        finish!();
                    }
                    _ => {
                        raw.push(c);
                        field.push(c);
                        state = State::InUnquoted;
                    }
                },
                State::InUnquoted => match c {
                    c if c == self.separator => {
                        raw.push(c);
                        fields.push(std::mem::take(&mut field));
                        state = State::FieldStart;
                    }
                    '\r' | '\n' => {
                        self.consume_terminator(c)?;
                        lines += 1;
                        finish!();
                    }
                    '"' => match self.quote_mode {
                        QuoteMode::Lenient => {
                            raw.push(c);
                            state = State::InQuoted;
                        }
                        QuoteMode::RfcStrict | QuoteMode::ErrorOnIllegalQuote => {
                            raw.push(c);
                            return self.quote_error(
                                "unescaped quote inside an unquoted field",
                                &raw,
                                start_line,
                                lines,
                                true,
                            );
                        }
                    },
                    _ => {
                        raw.push(c);
                        field.push(c);
                    }
                },
                State::InQuoted => match c {
                    '"' => match self.read_char()? {
                        Some('"') => {
                            raw.push_str("\"\"");
                            field.push('"');
                        }
                        next => {
                            raw.push('"');
                            self.pending = next;
                            state = State::AfterClosingQuote;
                        }
                    },
                    '\r' => {
                        lines += 1;
                        let next = self.read_char()?;
                        let crlf = matches!(next, Some('\n'));
                        if !crlf {
                            self.pending = next;
                        }
                        if self.normalize_newlines {
                            raw.push('\n');
                            field.push('\n');
                        } else {
                            raw.push('\r');
                            field.push('\r');
                            if crlf {
                                raw.push('\n');
                                field.push('\n');
                            }
                        }
                    }
                    '\n' => {
                        lines += 1;
                        raw.push('\n');
                        field.push('\n');
                    }
                    _ => {
                        raw.push(c);
                        field.push(c);
                    }
                },
                State::AfterClosingQuote => match c {
                    c if c == self.separator => {
                        raw.push(c);
                        fields.push(std::mem::take(&mut field));
                        state = State::FieldStart;
                    }
                    '\r' | '\n' => {
                        self.consume_terminator(c)?;
                        lines += 1;
                        finish!();
                    }
                    c if c.is_whitespace() => {
                        // Padding between the closing quote and the separator
                        // is tolerated by common practice.
                        raw.push(c);
                    }
                    _ => {
                        raw.push(c);
                        if self.error_on_trailing_garbage {
                            return self.quote_error(
                                "unexpected character after closing quote",
                                &raw,
                                start_line,
                                lines,
                                true,
                            );
                        }
                        field.push(c);
                        state = State::InUnquoted;
                    }
                },
            }
        }
    }

    /// Builds a quote error and, when `resync` is set, consumes input through
    /// the next unquoted record terminator so the following record parses.
    fn quote_error(
        &mut self,
        message: &str,
        raw: &str,
        start_line: u64,
        mut lines: u64,
        resync: bool,
    ) -> io::Result<Outcome> {
        if resync {
            loop {
                match self.read_char()? {
                    None => break,
                    Some(c @ ('\r' | '\n')) => {
                        self.consume_terminator(c)?;
                        lines += 1;
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
        self.next_line = start_line + lines;
        Ok(Outcome::QuoteError {
            message: message.to_string(),
            excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
            start_line,
            lines_spanned: lines,
        })
    }
}
