use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Bridges a synchronous iterator into an async stream. Items are pulled on
/// the consumer's task; after `yield_threshold` of continuous synchronous
/// work the bridge voluntarily suspends once (re-waking itself immediately)
/// so the host scheduler gets a turn, then resumes.
pub fn iter_stream<I>(iter: I, yield_threshold: Duration) -> IterStream<I::IntoIter>
where
    I: IntoIterator,
{
    let yield_threshold = if yield_threshold.is_zero() {
        Duration::from_millis(1)
    } else {
        yield_threshold
    };
    IterStream {
        iter: iter.into_iter(),
        yield_threshold,
        window_started: None,
        cancellation: CancellationToken::new(),
    }
}

pub struct IterStream<I> {
    iter: I,
    yield_threshold: Duration,
    window_started: Option<Instant>,
    cancellation: CancellationToken,
}

impl<I> IterStream<I> {
    /// Ends the stream cleanly once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

impl<I> Stream for IterStream<I>
where
    I: Iterator + Unpin,
{
    type Item = I::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<I::Item>> {
        let this = self.get_mut();
        if this.cancellation.is_cancelled() {
            return Poll::Ready(None);
        }
        let window_started = this.window_started.get_or_insert_with(Instant::now);
        if window_started.elapsed() >= this.yield_threshold {
            this.window_started = Some(Instant::now());
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(this.iter.next())
    }
}
