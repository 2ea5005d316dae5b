//! Shared operational substrate for the readers and the merger: the error
//! taxonomy, error records and sinks, per-run metrics, progress events, and
//! the common `ReadOptions` bundle that threads them through every reader.

mod error;
mod metrics;
mod options;
mod progress;
mod sink;
mod substrate;

pub use self::error::{ErrorAction, ErrorKind, ErrorRecord, FatalError, Origin};
pub use self::metrics::{MetricsSnapshot, ReadMetrics};
pub use self::options::ReadOptions;
pub use self::progress::{FnProgressSink, ProgressEvent, ProgressSink, VecProgressSink};
pub use self::sink::{dispatch, ErrorSink, FnSink, NdjsonSink, VecSink};
pub use self::substrate::{complete, handle_error, ErrorFlow, ProgressTracker};

pub use tokio_util::sync::CancellationToken;
