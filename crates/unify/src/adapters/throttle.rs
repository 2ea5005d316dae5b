use futures::{Future, Stream};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Emits an item, then delays by `interval` before the next upstream pull.
pub fn throttle<S: Stream>(stream: S, interval: Duration) -> Throttle<S> {
    Throttle {
        stream,
        interval,
        delay: None,
        cancel: None,
    }
}

pin_project_lite::pin_project! {
    pub struct Throttle<S> {
        #[pin]
        stream: S,
        interval: Duration,
        #[pin]
        delay: Option<tokio::time::Sleep>,
        cancel: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    }
}

impl<S> Throttle<S> {
    /// Ends the stream cleanly once `token` is cancelled, including during a
    /// delay; no partial item is emitted.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(Box::pin(token.cancelled_owned()));
        self
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let mut this = self.project();
        if let Some(cancel) = this.cancel.as_mut() {
            if cancel.as_mut().poll(cx).is_ready() {
                return Poll::Ready(None);
            }
        }
        if let Some(delay) = this.delay.as_mut().as_pin_mut() {
            ready!(delay.poll(cx));
            this.delay.set(None);
        }
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                this.delay.set(Some(tokio::time::sleep(*this.interval)));
                Poll::Ready(Some(item))
            }
            None => Poll::Ready(None),
        }
    }
}
