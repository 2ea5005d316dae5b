//! The unified merger: a single-consumer, N-producer, pull-based merge of
//! async sources with per-source filtering, a fairness policy, an error mode,
//! and a frozen-after-start lifecycle.

use chrono::Utc;
use futures::stream::BoxStream;
use futures::{Future, Stream, StreamExt};
use ops::{ErrorKind, ErrorRecord, ErrorSink, Origin};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Predicate applied to a source's items immediately before they are yielded
/// to the consumer; rejected items are dropped and the source re-pulled.
pub type SourcePredicate<T> = Box<dyn FnMut(&T) -> bool + Send>;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("merger has started enumeration; {0} is no longer permitted")]
    Lifecycle(&'static str),

    #[error("a source named {0:?} is already registered")]
    DuplicateSource(String),

    #[error("no source named {0:?} is registered")]
    UnknownSource(String),

    #[error("source {name:?} failed: {source}")]
    Source {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// What happens when a producer fails mid-stream.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ErrorMode {
    /// The first source failure ends enumeration with [`MergeError::Source`].
    #[default]
    FailFast,
    /// A failed source is dropped and reported through the error sink; the
    /// remaining sources keep flowing.
    ContinueOnError,
}

/// How the merger schedules its pulls. Within one source, order is always
/// preserved; across sources it never is.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Fairness {
    /// Scan sources in registration order on every pull and yield the first
    /// one that is ready. Earlier sources win when several are ready at once.
    #[default]
    FirstAvailable,
    /// Rotate the scan start past the last yielding source, so every source
    /// gets a fair chance under continuous input.
    RoundRobin,
}

#[derive(Clone, Default)]
pub struct MergerConfig {
    pub error_mode: ErrorMode,
    pub fairness: Fairness,
    pub cancellation: CancellationToken,
    pub error_sink: Option<Arc<dyn ErrorSink>>,
}

impl std::fmt::Debug for MergerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergerConfig")
            .field("error_mode", &self.error_mode)
            .field("fairness", &self.fairness)
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}

struct Source<T> {
    name: String,
    stream: BoxStream<'static, Result<T, BoxError>>,
    predicate: Option<SourcePredicate<T>>,
}

/// The merger in its configuring state. Sources may be added and removed
/// freely until [`iter_async`](UnifiedStream::iter_async) freezes the set;
/// afterwards every mutation fails with [`MergeError::Lifecycle`].
pub struct UnifiedStream<T> {
    config: MergerConfig,
    sources: Vec<Source<T>>,
    started: bool,
}

impl<T: Send + 'static> UnifiedStream<T> {
    pub fn new(config: MergerConfig) -> Self {
        UnifiedStream {
            config,
            sources: Vec::new(),
            started: false,
        }
    }

    /// Registers a fallible source under a unique name, with an optional
    /// predicate applied before items reach the consumer.
    pub fn unify<S>(
        &mut self,
        stream: S,
        name: impl Into<String>,
        predicate: Option<SourcePredicate<T>>,
    ) -> Result<&mut Self, MergeError>
    where
        S: Stream<Item = Result<T, BoxError>> + Send + 'static,
    {
        if self.started {
            return Err(MergeError::Lifecycle("unify"));
        }
        let name = name.into();
        if self.sources.iter().any(|source| source.name == name) {
            return Err(MergeError::DuplicateSource(name));
        }
        tracing::debug!(source = %name, "registered merger source");
        self.sources.push(Source {
            name,
            stream: stream.boxed(),
            predicate,
        });
        Ok(self)
    }

    /// Registers an infallible source.
    pub fn unify_items<S>(
        &mut self,
        stream: S,
        name: impl Into<String>,
        predicate: Option<SourcePredicate<T>>,
    ) -> Result<&mut Self, MergeError>
    where
        S: Stream<Item = T> + Send + 'static,
    {
        self.unify(stream.map(Ok), name, predicate)
    }

    /// Removes a registered source. Legal only before enumeration starts.
    pub fn unlisten(&mut self, name: &str) -> Result<&mut Self, MergeError> {
        if self.started {
            return Err(MergeError::Lifecycle("unlisten"));
        }
        let index = self
            .sources
            .iter()
            .position(|source| source.name == name)
            .ok_or_else(|| MergeError::UnknownSource(name.to_string()))?;
        self.sources.remove(index);
        Ok(self)
    }

    /// Begins enumeration, freezing the source set. A second call is a
    /// lifecycle error.
    pub fn iter_async(&mut self) -> Result<Merged<T>, MergeError> {
        if self.started {
            return Err(MergeError::Lifecycle("iter_async"));
        }
        self.started = true;
        let sources = std::mem::take(&mut self.sources);
        tracing::debug!(
            sources = sources.len(),
            fairness = ?self.config.fairness,
            "merger enumeration started"
        );
        let live = sources.len();
        Ok(Merged {
            slots: sources.into_iter().map(Some).collect(),
            live,
            cursor: 0,
            error_mode: self.config.error_mode,
            fairness: self.config.fairness,
            error_sink: self.config.error_sink.clone(),
            cancel: Box::pin(self.config.cancellation.clone().cancelled_owned()),
            finished: false,
        })
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| source.name.clone())
            .collect()
    }
}

enum Step<T> {
    Yield(T),
    Fail(String, BoxError),
    Drained(String),
    Pending,
}

/// The enumerating merger. Ends when the last source is drained, a fail-fast
/// error surfaces, or the cancellation token fires (a clean end; outstanding
/// pulls resolving afterwards are dropped).
pub struct Merged<T> {
    slots: Vec<Option<Source<T>>>,
    live: usize,
    cursor: usize,
    error_mode: ErrorMode,
    fairness: Fairness,
    error_sink: Option<Arc<dyn ErrorSink>>,
    cancel: Pin<Box<WaitForCancellationFutureOwned>>,
    finished: bool,
}

impl<T> Merged<T> {
    fn report_dropped_source(&self, name: &str, error: &BoxError) {
        tracing::warn!(source = name, %error, "merger source failed; continuing without it");
        if let Some(error_sink) = self.error_sink.as_deref() {
            let record = ErrorRecord {
                ts: Utc::now(),
                origin: Origin::Merge,
                file: None,
                line: 0,
                record: 0,
                error_type: ErrorKind::MergerSourceFailure,
                message: format!("source {:?} failed: {}", name, error),
                excerpt: None,
                action: ops::ErrorAction::Skip,
            };
            ops::dispatch(error_sink, &record);
        }
    }
}

impl<T> Stream for Merged<T> {
    type Item = Result<T, MergeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if this.cancel.as_mut().poll(cx).is_ready() {
            tracing::debug!("merger cancelled");
            this.finished = true;
            return Poll::Ready(None);
        }
        if this.live == 0 {
            this.finished = true;
            return Poll::Ready(None);
        }

        let slot_count = this.slots.len();
        let scan_start = match this.fairness {
            Fairness::FirstAvailable => 0,
            Fairness::RoundRobin => this.cursor % slot_count,
        };

        for offset in 0..slot_count {
            let index = (scan_start + offset) % slot_count;
            let step = {
                let Some(source) = this.slots[index].as_mut() else {
                    continue;
                };
                loop {
                    match source.stream.poll_next_unpin(cx) {
                        Poll::Ready(Some(Ok(item))) => {
                            if let Some(predicate) = source.predicate.as_mut() {
                                if !predicate(&item) {
                                    // Filtered out: re-pull this source now.
                                    continue;
                                }
                            }
                            break Step::Yield(item);
                        }
                        Poll::Ready(Some(Err(error))) => {
                            break Step::Fail(source.name.clone(), error)
                        }
                        Poll::Ready(None) => break Step::Drained(source.name.clone()),
                        Poll::Pending => break Step::Pending,
                    }
                }
            };
            match step {
                Step::Yield(item) => {
                    this.cursor = index + 1;
                    return Poll::Ready(Some(Ok(item)));
                }
                Step::Fail(name, error) => match this.error_mode {
                    ErrorMode::FailFast => {
                        this.finished = true;
                        return Poll::Ready(Some(Err(MergeError::Source {
                            name,
                            source: error,
                        })));
                    }
                    ErrorMode::ContinueOnError => {
                        this.report_dropped_source(&name, &error);
                        this.slots[index] = None;
                        this.live -= 1;
                    }
                },
                Step::Drained(name) => {
                    tracing::debug!(source = %name, "merger source drained");
                    this.slots[index] = None;
                    this.live -= 1;
                }
                Step::Pending => {}
            }
            if this.live == 0 {
                this.finished = true;
                return Poll::Ready(None);
            }
        }
        Poll::Pending
    }
}
