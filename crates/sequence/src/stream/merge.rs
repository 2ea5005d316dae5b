use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project_lite::pin_project! {
    /// Merges two pre-sorted streams under `less_eq`. Ties yield the left
    /// element first. Each side is pulled at most once per yielded item; a
    /// side that reported `Pending` parks its slot until it resolves.
    pub struct MergeOrdered<L, R, F>
    where
        L: Stream,
    {
        #[pin]
        left: L,
        #[pin]
        right: R,
        left_slot: Option<L::Item>,
        right_slot: Option<L::Item>,
        left_done: bool,
        right_done: bool,
        less_eq: F,
    }
}

impl<L: Stream, R, F> MergeOrdered<L, R, F> {
    pub(crate) fn new(left: L, right: R, less_eq: F) -> Self {
        MergeOrdered {
            left,
            right,
            left_slot: None,
            right_slot: None,
            left_done: false,
            right_done: false,
            less_eq,
        }
    }
}

impl<L, R, F> Stream for MergeOrdered<L, R, F>
where
    L: Stream,
    R: Stream<Item = L::Item>,
    F: FnMut(&L::Item, &L::Item) -> bool,
{
    type Item = L::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<L::Item>> {
        let this = self.project();

        if this.left_slot.is_none() && !*this.left_done {
            match this.left.poll_next(cx) {
                Poll::Ready(Some(item)) => *this.left_slot = Some(item),
                Poll::Ready(None) => *this.left_done = true,
                Poll::Pending => {}
            }
        }
        if this.right_slot.is_none() && !*this.right_done {
            match this.right.poll_next(cx) {
                Poll::Ready(Some(item)) => *this.right_slot = Some(item),
                Poll::Ready(None) => *this.right_done = true,
                Poll::Pending => {}
            }
        }

        let take_left = match (this.left_slot.as_ref(), this.right_slot.as_ref()) {
            (Some(l), Some(r)) => (this.less_eq)(l, r),
            (Some(_), None) if *this.right_done => true,
            (None, Some(_)) if *this.left_done => false,
            (None, None) if *this.left_done && *this.right_done => return Poll::Ready(None),
            // One side still owes us a value before ordering can be decided.
            _ => return Poll::Pending,
        };

        if take_left {
            Poll::Ready(this.left_slot.take())
        } else {
            Poll::Ready(this.right_slot.take())
        }
    }
}
