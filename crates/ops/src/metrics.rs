use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Counters owned by a single reader and advanced monotonically over a run.
/// The consumer holds a clone of the `Arc` and reads after completion; mid-run
/// reads are safe because every counter is atomic.
#[derive(Debug)]
pub struct ReadMetrics {
    started: DateTime<Utc>,
    lines_read: AtomicU64,
    raw_records_parsed: AtomicU64,
    records_emitted: AtomicU64,
    error_count: AtomicU64,
    terminated_early: AtomicBool,
    termination_error: Mutex<Option<String>>,
    completed: Mutex<Option<DateTime<Utc>>>,
}

impl Default for ReadMetrics {
    fn default() -> Self {
        ReadMetrics {
            started: Utc::now(),
            lines_read: AtomicU64::new(0),
            raw_records_parsed: AtomicU64::new(0),
            records_emitted: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            terminated_early: AtomicBool::new(false),
            termination_error: Mutex::new(None),
            completed: Mutex::new(None),
        }
    }
}

impl ReadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lines(&self, n: u64) {
        self.lines_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_raw_record(&self) {
        self.raw_records_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn raw_records_parsed(&self) -> u64 {
        self.raw_records_parsed.load(Ordering::Relaxed)
    }

    pub fn records_emitted(&self) -> u64 {
        self.records_emitted.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn terminated_early(&self) -> bool {
        self.terminated_early.load(Ordering::Relaxed)
    }

    pub fn termination_error(&self) -> Option<String> {
        self.termination_error.lock().unwrap().clone()
    }

    /// Set once, by `ErrorAction::Stop` handling.
    pub fn mark_stopped(&self, message: impl Into<String>) {
        self.terminated_early.store(true, Ordering::Relaxed);
        let mut slot = self.termination_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }

    /// Stamp normal completion. Stop, Throw and cancellation never reach this.
    pub fn mark_completed(&self) {
        let mut slot = self.completed.lock().unwrap();
        if slot.is_none() {
            *slot = Some(Utc::now());
        }
    }

    pub fn completed(&self) -> Option<DateTime<Utc>> {
        *self.completed.lock().unwrap()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started,
            lines_read: self.lines_read(),
            raw_records_parsed: self.raw_records_parsed(),
            records_emitted: self.records_emitted(),
            error_count: self.error_count(),
            terminated_early: self.terminated_early(),
            termination_error: self.termination_error(),
            completed: self.completed(),
        }
    }
}

/// A point-in-time copy of [`ReadMetrics`], cheap to log or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub started: DateTime<Utc>,
    pub lines_read: u64,
    pub raw_records_parsed: u64,
    pub records_emitted: u64,
    pub error_count: u64,
    pub terminated_early: bool,
    pub termination_error: Option<String>,
    pub completed: Option<DateTime<Utc>>,
}
