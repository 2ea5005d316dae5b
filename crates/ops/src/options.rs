use crate::{ErrorAction, ErrorRecord, ErrorSink, FnSink, ProgressSink, ReadMetrics};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The option bundle shared by every reader. Format-specific option structs
/// embed one of these (composition, no inheritance); all configuration is
/// explicit and there is no global state.
#[derive(Clone)]
pub struct ReadOptions {
    pub error_action: ErrorAction,
    pub error_sink: Option<Arc<dyn ErrorSink>>,
    pub progress_sink: Option<Arc<dyn ProgressSink>>,
    /// Emit a progress event every this many records; 0 disables the count
    /// trigger.
    pub progress_record_interval: u64,
    /// Emit a progress event whenever this much wall time has elapsed since
    /// the last one.
    pub progress_time_interval: Duration,
    pub cancellation: CancellationToken,
    pub metrics: Arc<ReadMetrics>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            error_action: ErrorAction::Throw,
            error_sink: None,
            progress_sink: None,
            progress_record_interval: 5000,
            progress_time_interval: Duration::from_secs(5),
            cancellation: CancellationToken::new(),
            metrics: Arc::new(ReadMetrics::new()),
        }
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("error_action", &self.error_action)
            .field("error_sink", &self.error_sink.is_some())
            .field("progress_sink", &self.progress_sink.is_some())
            .field("progress_record_interval", &self.progress_record_interval)
            .field("progress_time_interval", &self.progress_time_interval)
            .finish()
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_action(mut self, action: ErrorAction) -> Self {
        self.error_action = action;
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn with_progress_intervals(mut self, records: u64, time: Duration) -> Self {
        self.progress_record_interval = records;
        self.progress_time_interval = time;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ReadMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Convenience error callback: installs `callback` as the error sink and
    /// forces `error_action = Skip`, so the run keeps going and the callback
    /// sees every failure.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ErrorRecord) + Send + Sync + 'static,
    {
        self.error_action = ErrorAction::Skip;
        self.error_sink = Some(Arc::new(FnSink(callback)));
        self
    }
}
