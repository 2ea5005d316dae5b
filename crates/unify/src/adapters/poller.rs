use futures::{Future, Stream};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::{Duration, Instant};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Synthesizes a stream by invoking `f` at `interval` cadence, forever (or
/// until cancelled).
pub fn poll<F, T>(f: F, interval: Duration) -> Poller<F, T>
where
    F: FnMut() -> T,
{
    Poller {
        f,
        interval: new_interval(interval),
        started: Instant::now(),
        stop_when: None,
        stopped: false,
        cancel: None,
    }
}

/// As [`poll`], ending the stream once `stop_when(&item, elapsed)` returns
/// true. The item that triggered the stop is still yielded; the stream ends
/// on the next pull.
pub fn poll_until<F, T, W>(f: F, interval: Duration, stop_when: W) -> Poller<F, T>
where
    F: FnMut() -> T,
    W: FnMut(&T, Duration) -> bool + Send + 'static,
{
    let mut poller = poll(f, interval);
    poller.stop_when = Some(Box::new(stop_when));
    poller
}

fn new_interval(period: Duration) -> tokio::time::Interval {
    let period = if period.is_zero() {
        Duration::from_millis(1)
    } else {
        period
    };
    tokio::time::interval(period)
}

pin_project_lite::pin_project! {
    pub struct Poller<F, T> {
        f: F,
        interval: tokio::time::Interval,
        started: Instant,
        stop_when: Option<Box<dyn FnMut(&T, Duration) -> bool + Send>>,
        stopped: bool,
        cancel: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    }
}

impl<F, T> Poller<F, T> {
    /// Ends the stream cleanly once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(Box::pin(token.cancelled_owned()));
        self
    }
}

impl<F, T> Stream for Poller<F, T>
where
    F: FnMut() -> T,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.project();
        if *this.stopped {
            return Poll::Ready(None);
        }
        if let Some(cancel) = this.cancel.as_mut() {
            if cancel.as_mut().poll(cx).is_ready() {
                *this.stopped = true;
                return Poll::Ready(None);
            }
        }
        ready!(this.interval.poll_tick(cx));
        let item = (this.f)();
        if let Some(stop_when) = this.stop_when.as_mut() {
            if stop_when(&item, this.started.elapsed()) {
                *this.stopped = true;
            }
        }
        Poll::Ready(Some(item))
    }
}
