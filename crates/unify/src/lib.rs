//! Async plumbing for pull-based pipelines: the sync→async bridge, bounded
//! buffering, throttling and polling adapters, and the N-source unified
//! merger. Everything here is single-consumer, cooperative, and cancellation
//! aware.

pub mod adapters;
pub mod merger;

pub use self::adapters::{
    bounded, iter_stream, poll, poll_until, throttle, BoundedBuffer, BufferConfig, FullMode,
    IterStream, Poller, Throttle,
};
pub use self::merger::{
    BoxError, ErrorMode, Fairness, Merged, MergeError, MergerConfig, SourcePredicate,
    UnifiedStream,
};

pub use tokio_util::sync::CancellationToken;
