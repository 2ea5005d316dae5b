use crate::ErrorRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Receiver of [`ErrorRecord`]s. Implementations must be callable from the
/// reader's thread; the built-in file sink serializes writes internally.
pub trait ErrorSink: Send + Sync {
    fn record(&self, record: &ErrorRecord);
}

/// Delivers a record to a sink, isolating the reader from sink bugs: a
/// panicking sink is logged and swallowed, never propagated.
pub fn dispatch(sink: &dyn ErrorSink, record: &ErrorRecord) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.record(record)));
    if outcome.is_err() {
        tracing::warn!(error_type = %record.error_type, "error sink panicked; record dropped");
    }
}

/// File-backed sink writing one JSON object per line, with the field names
/// documented on [`ErrorRecord`].
pub struct NdjsonSink {
    writer: Mutex<BufWriter<File>>,
}

impl NdjsonSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(NdjsonSink {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl ErrorSink for NdjsonSink {
    fn record(&self, record: &ErrorRecord) {
        let mut writer = self.writer.lock().unwrap();
        // Serialization of ErrorRecord cannot fail; I/O can, and a sink
        // failure must not kill the reader.
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writer.write_all(line.as_bytes());
            let _ = writer.write_all(b"\n");
            let _ = writer.flush();
        }
    }
}

/// Wraps a callback as a sink.
pub struct FnSink<F>(pub F);

impl<F> ErrorSink for FnSink<F>
where
    F: Fn(&ErrorRecord) + Send + Sync,
{
    fn record(&self, record: &ErrorRecord) {
        (self.0)(record)
    }
}

/// Collects records in memory; intended for tests.
#[derive(Default)]
pub struct VecSink {
    records: Mutex<Vec<ErrorRecord>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for VecSink {
    fn record(&self, record: &ErrorRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ErrorAction, ErrorKind, Origin};
    use chrono::Utc;

    fn record() -> ErrorRecord {
        ErrorRecord {
            ts: Utc::now(),
            origin: Origin::Json,
            file: None,
            line: 1,
            record: 1,
            error_type: ErrorKind::JsonException,
            message: "bad token".to_string(),
            excerpt: None,
            action: ErrorAction::Skip,
        }
    }

    #[test]
    fn panicking_sink_is_swallowed() {
        let sink = FnSink(|_: &ErrorRecord| panic!("sink bug"));
        dispatch(&sink, &record());
    }

    #[test]
    fn ndjson_sink_writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.ndjson");
        let sink = NdjsonSink::create(&path).unwrap();
        sink.record(&record());
        sink.record(&record());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["reader"], "JSON");
            assert_eq!(value["errorType"], "JsonException");
        }
    }
}
