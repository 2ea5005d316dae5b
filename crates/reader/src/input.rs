//! The byte-level input abstraction shared by every reader: a buffered byte
//! stream plus whatever is known about its total length (for progress
//! percentages) and its name (for error records).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;
use unicode_bom::Bom;

pub struct Input {
    reader: Box<dyn BufRead + Send>,
    len: Option<u64>,
    name: Option<String>,
}

impl Input {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Input> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata().ok().map(|meta| meta.len());
        Ok(Input {
            reader: Box::new(BufReader::new(file)),
            len,
            name: Some(path.display().to_string()),
        })
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Input {
        Input {
            reader: Box::new(BufReader::new(reader)),
            len: None,
            name: None,
        }
    }

    /// In-memory input; the total length is known, so progress percentages
    /// work the same as for files.
    pub fn from_string(content: impl Into<String>) -> Input {
        let bytes = content.into().into_bytes();
        Input {
            reader: Box::new(Cursor::new(bytes.clone())),
            len: Some(bytes.len() as u64),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Input {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn total_len(&self) -> Option<u64> {
        self.len
    }

    /// Reads up to `n` bytes and pushes them back, so the stream still starts
    /// at its current position afterwards.
    pub fn peek(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut head = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let read = self.reader.read(&mut head[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        head.truncate(filled);

        let rest = std::mem::replace(&mut self.reader, Box::new(io::empty()));
        self.reader = Box::new(Cursor::new(head.clone()).chain(rest));
        Ok(head)
    }

    /// Skips a UTF-8 byte-order mark if one is present. Inputs in any other
    /// marked encoding are rejected; the readers consume UTF-8 only.
    pub fn skip_bom(&mut self) -> io::Result<()> {
        let head = self.peek(4)?;
        match Bom::from(head.as_slice()) {
            Bom::Null => Ok(()),
            Bom::Utf8 => {
                let mut bom = [0u8; 3];
                self.reader.read_exact(&mut bom)?;
                Ok(())
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported input encoding (found {} byte-order mark)", other),
            )),
        }
    }

    pub(crate) fn into_parts(self) -> (Box<dyn BufRead + Send>, Option<u64>, Option<String>) {
        (self.reader, self.len, self.name)
    }
}
