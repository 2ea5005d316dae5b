use futures_core::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Yields items until, and including, the first match. Fused after the
    /// cut: the upstream is never polled again.
    pub struct Until<S, P> {
        #[pin]
        stream: S,
        predicate: P,
        done: bool,
    }
}

impl<S, P> Until<S, P> {
    pub(crate) fn new(stream: S, predicate: P) -> Self {
        Until {
            stream,
            predicate,
            done: false,
        }
    }
}

impl<S, P> Stream for Until<S, P>
where
    S: Stream,
    P: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                if (this.predicate)(&item) {
                    *this.done = true;
                }
                Poll::Ready(Some(item))
            }
            None => {
                *this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

pin_project_lite::pin_project! {
    /// As [`Until`], with the running item index available to the predicate.
    pub struct UntilIndexed<S, P> {
        #[pin]
        stream: S,
        predicate: P,
        index: usize,
        done: bool,
    }
}

impl<S, P> UntilIndexed<S, P> {
    pub(crate) fn new(stream: S, predicate: P) -> Self {
        UntilIndexed {
            stream,
            predicate,
            index: 0,
            done: false,
        }
    }
}

impl<S, P> Stream for UntilIndexed<S, P>
where
    S: Stream,
    P: FnMut(&S::Item, usize) -> bool,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                if (this.predicate)(&item, *this.index) {
                    *this.done = true;
                }
                *this.index += 1;
                Poll::Ready(Some(item))
            }
            None => {
                *this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::AsyncSequenceExt;
    use futures::{stream, StreamExt};

    #[tokio::test]
    async fn until_is_inclusive_of_the_first_match() {
        let out: Vec<i32> = stream::iter(vec![1, 2, 3, 4])
            .until(|&x| x == 3)
            .collect()
            .await;
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn until_indexed_sees_indices() {
        let out: Vec<&str> = stream::iter(vec!["a", "b", "c"])
            .until_indexed(|_, i| i == 1)
            .collect()
            .await;
        assert_eq!(out, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let out: Vec<i32> = stream::empty::<i32>().until(|_| true).collect().await;
        assert!(out.is_empty());
    }
}
