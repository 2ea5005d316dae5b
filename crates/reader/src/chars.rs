//! Incremental UTF-8 decoding over a byte stream. Decodes one scalar value
//! per call, holding at most one read buffer of undecoded bytes, so readers
//! stay O(record) in memory regardless of input size.

use std::io::{self, Read};

const READ_CHUNK: usize = 8 * 1024;

pub(crate) struct CharReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    consumed: u64,
}

impl<R: Read> CharReader<R> {
    pub fn new(inner: R) -> Self {
        CharReader {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            eof: false,
            consumed: 0,
        }
    }

    /// Total bytes decoded so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn next_char(&mut self) -> io::Result<Option<char>> {
        loop {
            let available = &self.buf[self.pos..];
            if !available.is_empty() {
                // ASCII fast path.
                if available[0] < 0x80 {
                    let ch = available[0] as char;
                    self.pos += 1;
                    self.consumed += 1;
                    return Ok(Some(ch));
                }
                let take = available.len().min(4);
                match std::str::from_utf8(&available[..take]) {
                    Ok(s) => {
                        let ch = s.chars().next().expect("non-empty valid prefix");
                        return Ok(Some(self.advance(ch)));
                    }
                    Err(e) if e.valid_up_to() > 0 => {
                        let s = std::str::from_utf8(&available[..e.valid_up_to()])
                            .expect("prefix is valid per valid_up_to");
                        let ch = s.chars().next().expect("non-empty valid prefix");
                        return Ok(Some(self.advance(ch)));
                    }
                    Err(e) if e.error_len().is_some() => {
                        return Err(invalid_utf8());
                    }
                    Err(_) if self.eof => return Err(invalid_utf8()),
                    Err(_) => { /* incomplete sequence: read more below */ }
                }
            } else if self.eof {
                return Ok(None);
            }

            self.fill()?;
        }
    }

    fn advance(&mut self, ch: char) -> char {
        self.pos += ch.len_utf8();
        self.consumed += ch.len_utf8() as u64;
        ch
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
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "input is not valid UTF-8")
}
