use futures_core::Stream;
use std::mem;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Concatenates successive string items until an item equal to the
    /// separator is seen, then yields the buffer and resets.
    pub struct Delimited<S> {
        #[pin]
        stream: S,
        separator: String,
        buffer: String,
        done: bool,
    }
}

impl<S> Delimited<S> {
    pub(crate) fn new(stream: S, separator: String) -> Self {
        Delimited {
            stream,
            separator,
            buffer: String::new(),
            done: false,
        }
    }
}

impl<S> Stream for Delimited<S>
where
    S: Stream,
    S::Item: AsRef<str>,
{
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(item) => {
                    if item.as_ref() == this.separator {
                        if !this.buffer.is_empty() {
                            return Poll::Ready(Some(mem::take(this.buffer)));
                        }
                    } else {
                        this.buffer.push_str(item.as_ref());
                    }
                }
                None => {
                    *this.done = true;
                    if !this.buffer.is_empty() {
                        return Poll::Ready(Some(mem::take(this.buffer)));
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}
