//! Synchronous operators: an extension trait over [`Iterator`] plus the
//! adapter types it returns. Every adapter pulls its upstream at most once per
//! yielded item and never buffers.

mod cases;
mod each;
mod flatten;
mod merge;
mod spy;
mod strings;
mod until;

pub use self::cases::{
    AllCases, AllCasesUnfiltered, Cases, CasesTagged, CasedSequenceExt, ForEachCase,
    ForEachCaseIndexed, ForEachCaseSignal, Reselect, SelectCase, SelectCaseIndexed,
    TransformedSequenceExt, UnCase, UnCaseTransformed,
};
pub use self::each::{ForEachIndexed, ForEachItem};
pub use self::flatten::FlattenSeparated;
pub use self::merge::{merge_ordered, MergeOrdered};
pub use self::spy::Spy;
pub use self::strings::Delimited;
pub use self::until::{Until, UntilIndexed};

use crate::observe::SpyOptions;
use crate::routing::CasePredicate;
use std::fmt;

/// Lazy operators over any [`Iterator`].
pub trait SequenceExt: Iterator + Sized {
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
    fn until_count(self, bound: usize) -> std::iter::Take<Self> {
        self.take(bound.saturating_add(1))
    }

    /// `skip(start).take(count)` as one operator.
    fn take_range(self, start: usize, count: usize) -> std::iter::Take<std::iter::Skip<Self>> {
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

    /// Terminal: pulls the sequence to its end, dropping every item.
    fn drain(self) {
        for item in self {
            drop(item);
        }
    }

    /// Terminal: pulls the sequence to its end, invoking `action` per item.
    fn drain_with<A>(self, mut action: A)
    where
        A: FnMut(Self::Item),
    {
        for item in self {
            action(item);
        }
    }

    /// Terminal left fold. An empty sequence returns `init` unchanged.
    fn cumul<B, F>(self, init: B, fold: F) -> B
    where
        F: FnMut(B, Self::Item) -> B,
    {
        self.fold(init, fold)
    }

    /// Terminal left fold seeded by the first element. Empty input folds to
    /// `None`.
    fn cumul_first<F>(self, fold: F) -> Option<Self::Item>
    where
        F: FnMut(Self::Item, Self::Item) -> Self::Item,
    {
        self.reduce(fold)
    }

    /// Terminal: concatenates string items into one buffer, with an optional
    /// separator between items and optional prefix/suffix brackets.
    fn build_string(
        self,
        separator: Option<&str>,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> String
    where
        Self::Item: AsRef<str>,
    {
        let mut out = String::new();
        if let Some(prefix) = prefix {
            out.push_str(prefix);
        }
        let mut first = true;
        for item in self {
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

    /// Merges this pre-sorted sequence with another pre-sorted sequence into
    /// one sorted sequence in O(1) extra state. Ties yield the left element
    /// first.
    fn merge_ordered<J, F>(self, other: J, less_eq: F) -> MergeOrdered<Self, J::IntoIter, F>
    where
        J: IntoIterator<Item = Self::Item>,
        F: FnMut(&Self::Item, &Self::Item) -> bool,
    {
        MergeOrdered::new(self, other.into_iter(), less_eq)
    }

    /// Concatenates nested sequences, inserting `separator` between groups.
    /// (A plain concatenation is [`Iterator::flatten`].)
    fn flatten_separated(
        self,
        separator: <Self::Item as IntoIterator>::Item,
    ) -> FlattenSeparated<Self, <Self::Item as IntoIterator>::IntoIter>
    where
        Self::Item: IntoIterator,
        <Self::Item as IntoIterator>::Item: Clone,
    {
        FlattenSeparated::new(self, separator)
    }

    /// Emptiness probe: O(1) when the size hint answers, otherwise consumes at
    /// most one element. The receiver is consumed either way, so do not use it
    /// on a sequence whose remaining state matters.
    fn is_null_or_empty(mut self) -> bool {
        match self.size_hint() {
            (lower, _) if lower > 0 => false,
            (_, Some(0)) => true,
            _ => self.next().is_none(),
        }
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
    /// `separator` is seen, then yields the buffer and resets. A trailing
    /// non-empty buffer is yielded at end of input.
    fn delimit(self, separator: impl Into<String>) -> Delimited<Self>
    where
        Self::Item: AsRef<str>,
    {
        Delimited::new(self, separator.into())
    }
}

impl<I: Iterator> SequenceExt for I {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_range_skips_then_takes() {
        let out: Vec<i32> = (0..10).take_range(2, 3).collect();
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[test]
    fn cumul_returns_init_on_empty_input() {
        let total = std::iter::empty::<i32>().cumul(7, |acc, x| acc + x);
        assert_eq!(total, 7);
        assert_eq!(vec![1, 2, 3].into_iter().cumul(0, |acc, x| acc + x), 6);
    }

    #[test]
    fn cumul_first_uses_the_first_element_as_seed() {
        assert_eq!(std::iter::empty::<i32>().cumul_first(|a, b| a + b), None);
        assert_eq!(vec![4, 1, 2].into_iter().cumul_first(|a, b| a + b), Some(7));
    }

    #[test]
    fn build_string_brackets_and_separates() {
        let s = vec!["a", "b", "c"]
            .into_iter()
            .build_string(Some(", "), Some("<"), Some(">"));
        assert_eq!(s, "<a, b, c>");

        let bare = std::iter::empty::<&str>().build_string(Some(","), None, None);
        assert_eq!(bare, "");
    }

    #[test]
    fn is_null_or_empty_answers_without_full_consumption() {
        assert!(std::iter::empty::<i32>().is_null_or_empty());
        assert!(!vec![1].into_iter().is_null_or_empty());

        // An iterator with an unknown size hint is probed by one pull only.
        let probed = (0..5).filter(|n| n % 2 == 0);
        assert!(!probed.is_null_or_empty());
    }

    #[test]
    fn drain_with_sees_every_item() {
        let mut seen = Vec::new();
        vec![1, 2, 3].into_iter().drain_with(|x| seen.push(x));
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
