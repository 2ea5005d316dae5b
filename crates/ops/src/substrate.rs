use crate::{sink, ErrorAction, ErrorKind, ErrorRecord, FatalError, Origin, ProgressEvent, ReadOptions};
use chrono::Utc;
use std::time::Instant;

/// What the reader loop should do after a handled record-level error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorFlow {
    /// Skip the record and keep reading.
    Continue,
    /// Break the loop without calling [`complete`].
    Stop,
}

/// The shared error-handling algorithm: count the error, compose and deliver
/// an [`ErrorRecord`], then resolve the configured [`ErrorAction`]. Errors are
/// delivered to the sink in occurrence order, and a sink failure never
/// unwinds into the reader.
pub fn handle_error(
    options: &ReadOptions,
    origin: Origin,
    file: Option<&str>,
    line: u64,
    record: u64,
    kind: ErrorKind,
    message: impl Into<String>,
    excerpt: Option<String>,
) -> Result<ErrorFlow, FatalError> {
    let message = message.into();
    options.metrics.add_error();

    let error_record = ErrorRecord {
        ts: Utc::now(),
        origin,
        file: file.map(str::to_string),
        line,
        record,
        error_type: kind,
        message: message.clone(),
        excerpt,
        action: options.error_action,
    };
    if let Some(error_sink) = options.error_sink.as_deref() {
        sink::dispatch(error_sink, &error_record);
    }

    match options.error_action {
        ErrorAction::Throw => Err(FatalError::new(kind, message)),
        ErrorAction::Stop => {
            options.metrics.mark_stopped(message);
            Ok(ErrorFlow::Stop)
        }
        ErrorAction::Skip => {
            tracing::warn!(%origin, %kind, line, record, "skipped record");
            Ok(ErrorFlow::Continue)
        }
    }
}

/// Gates progress emission on the record-count and wall-time intervals of a
/// [`ReadOptions`], whichever triggers first. One tracker lives inside each
/// reader for the duration of a run.
pub struct ProgressTracker {
    started: Instant,
    last_emit: Instant,
    records_since_emit: u64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        let now = Instant::now();
        ProgressTracker {
            started: now,
            last_emit: now,
            records_since_emit: 0,
        }
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after each emitted record.
    pub fn maybe_emit(&mut self, options: &ReadOptions, percentage: Option<f64>) {
        self.records_since_emit += 1;
        let by_count = options.progress_record_interval > 0
            && self.records_since_emit >= options.progress_record_interval;
        let by_time = self.last_emit.elapsed() >= options.progress_time_interval;
        if by_count || by_time {
            self.emit(options, percentage);
        }
    }

    fn emit(&mut self, options: &ReadOptions, percentage: Option<f64>) {
        self.records_since_emit = 0;
        self.last_emit = Instant::now();
        if let Some(progress_sink) = options.progress_sink.as_deref() {
            let metrics = &options.metrics;
            progress_sink.progress(&ProgressEvent {
                lines_read: metrics.lines_read(),
                records_read: metrics.records_emitted(),
                error_count: metrics.error_count(),
                elapsed: self.started.elapsed(),
                percentage,
            });
        }
    }
}

/// Normal end-of-input: stamp `completed` and emit the final progress event.
/// Stop, Throw and cancellation paths never call this.
pub fn complete(options: &ReadOptions, tracker: &mut ProgressTracker, percentage: Option<f64>) {
    options.metrics.mark_completed();
    tracker.emit(options, percentage);
    tracing::debug!(
        records = options.metrics.records_emitted(),
        errors = options.metrics.error_count(),
        "read completed"
    );
}
