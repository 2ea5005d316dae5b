use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Lazy pass-through: the action observes each item as it flows by.
    pub struct ForEachItem<S, A> {
        #[pin]
        stream: S,
        action: A,
    }
}

impl<S, A> ForEachItem<S, A> {
    pub(crate) fn new(stream: S, action: A) -> Self {
        ForEachItem { stream, action }
    }
}

impl<S, A> Stream for ForEachItem<S, A>
where
    S: Stream,
    A: FnMut(&S::Item),
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                (this.action)(&item);
                Poll::Ready(Some(item))
            }
            None => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

pin_project_lite::pin_project! {
    /// As [`ForEachItem`], with the running item index.
    pub struct ForEachIndexed<S, A> {
        #[pin]
        stream: S,
        action: A,
        index: usize,
    }
}

impl<S, A> ForEachIndexed<S, A> {
    pub(crate) fn new(stream: S, action: A) -> Self {
        ForEachIndexed {
            stream,
            action,
            index: 0,
        }
    }
}

impl<S, A> Stream for ForEachIndexed<S, A>
where
    S: Stream,
    A: FnMut(&S::Item, usize),
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                (this.action)(&item, *this.index);
                *this.index += 1;
                Poll::Ready(Some(item))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    /// Pass-through with an asynchronous action: the action's future is
    /// driven to completion before its item is yielded downstream, so the
    /// adapter suspends at most once per item beyond the upstream pull.
    pub struct ThenEach<S: Stream, A, Fut> {
        #[pin]
        stream: S,
        action: A,
        #[pin]
        pending: Option<Fut>,
        item: Option<S::Item>,
    }
}

impl<S: Stream, A, Fut> ThenEach<S, A, Fut> {
    pub(crate) fn new(stream: S, action: A) -> Self {
        ThenEach {
            stream,
            action,
            pending: None,
            item: None,
        }
    }
}

impl<S, A, Fut> Stream for ThenEach<S, A, Fut>
where
    S: Stream,
    A: FnMut(&S::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        let mut this = self.project();
        loop {
            if let Some(fut) = this.pending.as_mut().as_pin_mut() {
                ready!(fut.poll(cx));
                this.pending.set(None);
                return Poll::Ready(this.item.take());
            }
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(item) => {
                    let fut = (this.action)(&item);
                    *this.item = Some(item);
                    this.pending.set(Some(fut));
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::AsyncSequenceExt;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn for_each_item_passes_items_through() {
        let seen = Arc::new(AtomicU64::new(0));
        let s = seen.clone();
        let out: Vec<u64> = stream::iter(vec![1u64, 2, 3])
            .for_each_item(move |&x| {
                s.fetch_add(x, Ordering::Relaxed);
            })
            .collect()
            .await;
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(seen.load(Ordering::Relaxed), 6);
    }

    #[tokio::test]
    async fn then_each_awaits_the_action_before_yielding() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let out: Vec<i32> = stream::iter(vec![10, 20])
            .then_each(move |_| {
                let c = c.clone();
                async move {
                    tokio::task::yield_now().await;
                    c.fetch_add(1, Ordering::Relaxed);
                }
            })
            .collect()
            .await;
        assert_eq!(out, vec![10, 20]);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn for_each_indexed_counts_from_zero() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = seen.clone();
        stream::iter(vec!["a", "b"])
            .for_each_indexed(move |&item, index| s.lock().unwrap().push((index, item)))
            .drain()
            .await;
        assert_eq!(*seen.lock().unwrap(), vec![(0, "a"), (1, "b")]);
    }
}
