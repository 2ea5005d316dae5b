use futures_core::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Concatenates nested streams, inserting a separator item between
    /// consecutive groups. Inner streams are boxed so they can be driven
    /// without projecting through the outer stream's item type.
    pub struct FlattenSeparated<S, Inner>
    where
        Inner: Stream,
    {
        #[pin]
        outer: S,
        inner: Option<Pin<Box<Inner>>>,
        separator: Inner::Item,
        started: bool,
    }
}

impl<S, Inner: Stream> FlattenSeparated<S, Inner> {
    pub(crate) fn new(outer: S, separator: Inner::Item) -> Self {
        FlattenSeparated {
            outer,
            inner: None,
            separator,
            started: false,
        }
    }
}

impl<S, Inner> Stream for FlattenSeparated<S, Inner>
where
    S: Stream<Item = Inner>,
    Inner: Stream,
    Inner::Item: Clone,
{
    type Item = Inner::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Inner::Item>> {
        let mut this = self.project();
        loop {
            if let Some(inner) = this.inner.as_mut() {
                match ready!(inner.as_mut().poll_next(cx)) {
                    Some(item) => return Poll::Ready(Some(item)),
                    None => *this.inner = None,
                }
            }
            match ready!(this.outer.as_mut().poll_next(cx)) {
                Some(group) => {
                    *this.inner = Some(Box::pin(group));
                    if *this.started {
                        return Poll::Ready(Some(this.separator.clone()));
                    }
                    *this.started = true;
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

    #[tokio::test]
    async fn separator_appears_between_groups_only() {
        let groups = stream::iter(vec![
            stream::iter(vec![1, 2]),
            stream::iter(vec![3]),
            stream::iter(vec![4, 5]),
        ]);
        let out: Vec<i32> = groups.flatten_separated(0).collect().await;
        assert_eq!(out, vec![1, 2, 0, 3, 0, 4, 5]);
    }

    #[tokio::test]
    async fn no_groups_yield_nothing() {
        let groups = stream::iter(Vec::<futures::stream::Iter<std::vec::IntoIter<i32>>>::new());
        let out: Vec<i32> = groups.flatten_separated(0).collect().await;
        assert!(out.is_empty());
    }
}
