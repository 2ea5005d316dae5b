use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// Periodic progress notification, emitted through a user-supplied sink.
/// `percentage` is populated only when the total input size is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub lines_read: u64,
    pub records_read: u64,
    pub error_count: u64,
    pub elapsed: Duration,
    pub percentage: Option<f64>,
}

pub trait ProgressSink: Send + Sync {
    fn progress(&self, event: &ProgressEvent);
}

/// Wraps a callback as a progress sink.
pub struct FnProgressSink<F>(pub F);

impl<F> ProgressSink for FnProgressSink<F>
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn progress(&self, event: &ProgressEvent) {
        (self.0)(event)
    }
}

/// Collects events in memory; intended for tests.
#[derive(Default)]
pub struct VecProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl VecProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for VecProgressSink {
    fn progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
