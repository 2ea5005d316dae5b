//! The observation channel used by the `spy` operator. Observation is always
//! injected; the stderr default exists for ergonomic use, not as a hidden
//! global.

use std::sync::{Arc, Mutex};

pub trait Observer: Send + Sync {
    fn observe(&self, text: &str);
}

/// Default observer: one line per observation on standard error.
pub struct StderrObserver;

impl Observer for StderrObserver {
    fn observe(&self, text: &str) {
        eprintln!("{}", text);
    }
}

/// Wraps a callback as an observer.
pub struct FnObserver<F>(pub F);

impl<F> Observer for FnObserver<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn observe(&self, text: &str) {
        (self.0)(text)
    }
}

/// Collects observations in memory; intended for tests.
#[derive(Default)]
pub struct VecObserver {
    lines: Mutex<Vec<String>>,
}

impl VecObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Observer for VecObserver {
    fn observe(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

/// Rendering options for the `spy` operator.
#[derive(Clone)]
pub struct SpyOptions {
    pub tag: String,
    pub timestamp: bool,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub observer: Arc<dyn Observer>,
}

impl SpyOptions {
    pub fn new(tag: impl Into<String>) -> Self {
        SpyOptions {
            tag: tag.into(),
            timestamp: false,
            separator: None,
            prefix: None,
            suffix: None,
            observer: Arc::new(StderrObserver),
        }
    }

    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = true;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub(crate) fn render(&self, item: &dyn std::fmt::Display) -> String {
        let mut line = String::new();
        if self.timestamp {
            line.push_str(&chrono::Utc::now().format("%H:%M:%S%.3f ").to_string());
        }
        if !self.tag.is_empty() {
            line.push('[');
            line.push_str(&self.tag);
            line.push_str("] ");
        }
        line.push_str(&item.to_string());
        line
    }
}
