use crate::observe::SpyOptions;
use futures_core::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Lazy pass-through that renders each item to the configured observation
    /// channel; the async mirror of the sync `Spy`.
    pub struct Spy<S> {
        #[pin]
        stream: S,
        options: SpyOptions,
        emitted: u64,
        finished: bool,
    }
}

impl<S> Spy<S> {
    pub(crate) fn new(stream: S, options: SpyOptions) -> Self {
        Spy {
            stream,
            options,
            emitted: 0,
            finished: false,
        }
    }
}

impl<S> Stream for Spy<S>
where
    S: Stream,
    S::Item: fmt::Display,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }
        let polled = ready!(this.stream.poll_next(cx));
        if *this.emitted == 0 {
            if let Some(prefix) = &this.options.prefix {
                this.options.observer.observe(prefix);
            }
        }
        match polled {
            Some(item) => {
                if *this.emitted > 0 {
                    if let Some(separator) = &this.options.separator {
                        this.options.observer.observe(separator);
                    }
                }
                this.options.observer.observe(&this.options.render(&item));
                *this.emitted += 1;
                Poll::Ready(Some(item))
            }
            None => {
                *this.finished = true;
                if let Some(suffix) = &this.options.suffix {
                    this.options.observer.observe(suffix);
                }
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::observe::{SpyOptions, VecObserver};
    use crate::AsyncSequenceExt;
    use futures::{stream, StreamExt};
    use std::sync::Arc;

    #[tokio::test]
    async fn spy_passes_items_through_and_observes_them() {
        let observer = Arc::new(VecObserver::new());
        let options = SpyOptions::new("t").with_observer(observer.clone());
        let out: Vec<i32> = stream::iter(vec![7, 8]).spy_with(options).collect().await;
        assert_eq!(out, vec![7, 8]);
        assert_eq!(observer.lines(), vec!["[t] 7", "[t] 8"]);
    }
}
