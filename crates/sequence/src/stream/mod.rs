//! Asynchronous operators: an extension trait over [`futures::Stream`] with
//! contracts identical to the synchronous [`iter`](crate::iter) flavor. Each
//! adapter suspends at most once per item, at its upstream pull.

mod cases;
mod each;
mod flatten;
mod merge;
mod spy;
mod strings;
mod until;

pub use self::cases::{
    AllCases, AllCasesUnfiltered, Cases, CasesTagged, CasedAsyncSequenceExt, ForEachCase,
    ForEachCaseIndexed, ForEachCaseSignal, Reselect, SelectCase, SelectCaseIndexed,
    TransformedAsyncSequenceExt, UnCase, UnCaseTransformed,
};
pub use self::each::{ForEachIndexed, ForEachItem, ThenEach};
pub use self::flatten::FlattenSeparated;
pub use self::merge::MergeOrdered;
pub use self::spy::Spy;
pub use self::strings::Delimited;
pub use self::until::{Until, UntilIndexed};

use crate::observe::SpyOptions;
use crate::routing::CasePredicate;
use futures::{Future, Stream, StreamExt};
use std::fmt;

/// Lazy operators over any [`Stream`].
#[allow(async_fn_in_trait)]
pub trait AsyncSequenceExt: Stream + Sized {
    /// Yields items up to and including the first one matching `predicate`.
    fn until<P>(self, predicate: P) -> Until<Self, P>
    where
        P: FnMut(&Self::Item) -> bool,
    {
        Until::new(self, predicate)
    }

    /// As [`until`](Self::until), with the running item index available to the
    /// predicate.
    fn until_indexed<P>(self, predicate: P) -> UntilIndexed<Self, P>
    where
        P: FnMut(&Self::Item, usize) -> bool,
    {
        UntilIndexed::new(self, predicate)
    }

    /// Yields items up to and including index `bound`.
    fn until_count(self, bound: usize) -> futures::stream::Take<Self> {
        self.take(bound.saturating_add(1))
    }

    /// `skip(start).take(count)` as one operator.
    fn take_range(
        self,
        start: usize,
        count: usize,
    ) -> futures::stream::Take<futures::stream::Skip<Self>> {
        self.skip(start).take(count)
    }

    /// Lazy pass-through: invokes `action` on each item as it flows by.
    fn for_each_item<A>(self, action: A) -> ForEachItem<Self, A>
    where
        A: FnMut(&Self::Item),
    {
        ForEachItem::new(self, action)
    }

    /// As [`for_each_item`](Self::for_each_item), with the running item index.
    fn for_each_indexed<A>(self, action: A) -> ForEachIndexed<Self, A>
    where
        A: FnMut(&Self::Item, usize),
    {
        ForEachIndexed::new(self, action)
    }

    /// Lazy pass-through with an asynchronous action, awaited to completion
    /// before the item is yielded downstream.
    fn then_each<A, Fut>(self, action: A) -> ThenEach<Self, A, Fut>
    where
        A: FnMut(&Self::Item) -> Fut,
        Fut: Future<Output = ()>,
    {
        ThenEach::new(self, action)
    }

    /// Terminal: pulls the stream to its end, dropping every item.
    async fn drain(self) {
        let mut stream = std::pin::pin!(self);
        while let Some(item) = stream.next().await {
            drop(item);
        }
    }

    /// Terminal: pulls the stream to its end, invoking `action` per item.
    async fn drain_with<A>(self, mut action: A)
    where
        A: FnMut(Self::Item),
    {
        let mut stream = std::pin::pin!(self);
        while let Some(item) = stream.next().await {
            action(item);
        }
    }

    /// Terminal left fold. An empty stream returns `init` unchanged.
    async fn cumul<B, F>(self, init: B, mut fold: F) -> B
    where
        F: FnMut(B, Self::Item) -> B,
    {
        let mut stream = std::pin::pin!(self);
        let mut acc = init;
        while let Some(item) = stream.next().await {
            acc = fold(acc, item);
        }
        acc
    }

    /// Terminal left fold seeded by the first element. An empty stream folds
    /// to `None`.
    async fn cumul_first<F>(self, mut fold: F) -> Option<Self::Item>
    where
        F: FnMut(Self::Item, Self::Item) -> Self::Item,
    {
        let mut stream = std::pin::pin!(self);
        let mut acc = stream.next().await?;
        while let Some(item) = stream.next().await {
            acc = fold(acc, item);
        }
        Some(acc)
    }

    /// Terminal: concatenates string items into one buffer, with an optional
    /// separator between items and optional prefix/suffix brackets.
    async fn build_string(
        self,
        separator: Option<&str>,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> String
    where
        Self::Item: AsRef<str>,
    {
        let mut stream = std::pin::pin!(self);
        let mut out = String::new();
        if let Some(prefix) = prefix {
            out.push_str(prefix);
        }
        let mut first = true;
        while let Some(item) = stream.next().await {
            if !first {
                if let Some(separator) = separator {
                    out.push_str(separator);
                }
            }
            out.push_str(item.as_ref());
            first = false;
        }
        if let Some(suffix) = suffix {
            out.push_str(suffix);
        }
        out
    }

    /// Merges this pre-sorted stream with another pre-sorted stream into one
    /// sorted stream in O(1) extra state. Ties yield the left element first.
    fn merge_ordered<S2, F>(self, other: S2, less_eq: F) -> MergeOrdered<Self, S2, F>
    where
        S2: Stream<Item = Self::Item>,
        F: FnMut(&Self::Item, &Self::Item) -> bool,
    {
        MergeOrdered::new(self, other, less_eq)
    }

    /// Concatenates nested streams, inserting `separator` between groups.
    /// (A plain concatenation is [`StreamExt::flatten`].)
    fn flatten_separated(
        self,
        separator: <Self::Item as Stream>::Item,
    ) -> FlattenSeparated<Self, Self::Item>
    where
        Self::Item: Stream,
        <Self::Item as Stream>::Item: Clone,
    {
        FlattenSeparated::new(self, separator)
    }

    /// Emptiness probe: consumes at most one element; the receiver is
    /// consumed either way.
    async fn is_null_or_empty(self) -> bool {
        let mut stream = std::pin::pin!(self);
        stream.next().await.is_none()
    }

    /// Lazy pass-through that renders each item to the observation channel.
    fn spy(self, tag: impl Into<String>) -> Spy<Self>
    where
        Self::Item: fmt::Display,
    {
        Spy::new(self, SpyOptions::new(tag))
    }

    /// As [`spy`](Self::spy), with full rendering options.
    fn spy_with(self, options: SpyOptions) -> Spy<Self>
    where
        Self::Item: fmt::Display,
    {
        Spy::new(self, options)
    }

    /// Routes each item to the index of the first matching predicate, or to
    /// the supra category `predicates.len()` when none match.
    fn cases(self, predicates: Vec<CasePredicate<Self::Item>>) -> Cases<Self> {
        Cases::new(self, predicates)
    }

    /// As [`cases`](Self::cases), carrying a caller-chosen label per arm
    /// instead of an index. `supra` labels the unmatched items.
    fn cases_tagged<L>(
        self,
        arms: Vec<(L, CasePredicate<Self::Item>)>,
        supra: L,
    ) -> CasesTagged<Self, L>
    where
        L: Clone,
    {
        CasesTagged::new(self, arms, supra)
    }

    /// Concatenates successive string items until an item equal to
    /// `separator` is seen, then yields the buffer and resets.
    fn delimit(self, separator: impl Into<String>) -> Delimited<Self>
    where
        Self::Item: AsRef<str>,
    {
        Delimited::new(self, separator.into())
    }
}

impl<S: Stream> AsyncSequenceExt for S {}

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn terminal_folds_mirror_the_sync_contracts() {
        assert_eq!(stream::iter(vec![1, 2, 3]).cumul(0, |a, b| a + b).await, 6);
        assert_eq!(stream::empty::<i32>().cumul(9, |a, b| a + b).await, 9);
        assert_eq!(
            stream::iter(vec![4, 1]).cumul_first(|a, b| a + b).await,
            Some(5)
        );
        assert_eq!(stream::empty::<i32>().cumul_first(|a, b| a + b).await, None);
    }

    #[tokio::test]
    async fn build_string_brackets_and_separates() {
        let out = stream::iter(vec!["x", "y"])
            .build_string(Some("-"), Some("("), Some(")"))
            .await;
        assert_eq!(out, "(x-y)");
    }

    #[tokio::test]
    async fn is_null_or_empty_probes_one_element() {
        assert!(stream::empty::<i32>().is_null_or_empty().await);
        assert!(!stream::iter(vec![1]).is_null_or_empty().await);
    }

    #[tokio::test]
    async fn take_range_skips_then_takes() {
        let out: Vec<i32> = stream::iter(0..10).take_range(2, 3).collect().await;
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn until_count_is_an_inclusive_index_bound() {
        let out: Vec<i32> = stream::iter(0..10).until_count(2).collect().await;
        assert_eq!(out, vec![0, 1, 2]);
    }
}
