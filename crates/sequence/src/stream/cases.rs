use crate::routing::{
    CaseAction, CaseActionIndexed, CasePredicate, CaseSelector, CaseSelectorIndexed, CaseSignal,
    Categorized, Tagged, Transformed,
};
use crate::stream::strings::Delimited;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// Routes each item to the index of its first matching predicate;
    /// unmatched items land in the supra category `predicates.len()`.
    pub struct Cases<S: Stream> {
        #[pin]
        stream: S,
        predicates: Vec<CasePredicate<S::Item>>,
    }
}

impl<S: Stream> Cases<S> {
    pub(crate) fn new(stream: S, predicates: Vec<CasePredicate<S::Item>>) -> Self {
        Cases { stream, predicates }
    }
}

impl<S: Stream> Stream for Cases<S> {
    type Item = Categorized<S::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                let category = this
                    .predicates
                    .iter_mut()
                    .position(|predicate| predicate(&item))
                    .unwrap_or(this.predicates.len()) as u32;
                Poll::Ready(Some(Categorized { category, item }))
            }
            None => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

pin_project_lite::pin_project! {
    /// The labeled overload of [`Cases`].
    pub struct CasesTagged<S: Stream, L> {
        #[pin]
        stream: S,
        arms: Vec<(L, CasePredicate<S::Item>)>,
        supra: L,
    }
}

impl<S: Stream, L> CasesTagged<S, L> {
    pub(crate) fn new(stream: S, arms: Vec<(L, CasePredicate<S::Item>)>, supra: L) -> Self {
        CasesTagged {
            stream,
            arms,
            supra,
        }
    }
}

impl<S: Stream, L: Clone> Stream for CasesTagged<S, L> {
    type Item = Tagged<L, S::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                let label = this
                    .arms
                    .iter_mut()
                    .find_map(|(label, predicate)| predicate(&item).then(|| label.clone()))
                    .unwrap_or_else(|| this.supra.clone());
                Poll::Ready(Some(Tagged { label, item }))
            }
            None => Poll::Ready(None),
        }
    }
}

/// Operators over a categorized stream.
pub trait CasedAsyncSequenceExt<T>: Stream<Item = Categorized<T>> + Sized {
    /// Applies the selector matching each item's category; missing slots
    /// yield `new_item = None`.
    fn select_case<R>(self, selectors: Vec<CaseSelector<T, R>>) -> SelectCase<Self, T, R> {
        SelectCase {
            stream: self,
            selectors,
        }
    }

    /// As [`select_case`](Self::select_case), with the running item index.
    fn select_case_indexed<R>(
        self,
        selectors: Vec<CaseSelectorIndexed<T, R>>,
    ) -> SelectCaseIndexed<Self, T, R> {
        SelectCaseIndexed {
            stream: self,
            selectors,
            index: 0,
        }
    }

    /// Pass-through side effects keyed by category; missing slots are no-ops.
    fn for_each_case(self, actions: Vec<CaseAction<T>>) -> ForEachCase<Self, T> {
        ForEachCase {
            stream: self,
            actions,
        }
    }

    /// As [`for_each_case`](Self::for_each_case), with the running item index.
    fn for_each_case_indexed(
        self,
        actions: Vec<CaseActionIndexed<T>>,
    ) -> ForEachCaseIndexed<Self, T> {
        ForEachCaseIndexed {
            stream: self,
            actions,
            index: 0,
        }
    }

    /// As [`for_each_case`](Self::for_each_case), for actions that ignore the
    /// item itself.
    fn for_each_case_signal(self, actions: Vec<CaseSignal>) -> ForEachCaseSignal<Self> {
        ForEachCaseSignal {
            stream: self,
            actions,
        }
    }

    /// Projects back to the plain item stream, order preserved.
    fn un_case(self) -> UnCase<Self> {
        UnCase { stream: self }
    }
}

impl<T, S: Stream<Item = Categorized<T>>> CasedAsyncSequenceExt<T> for S {}

pin_project_lite::pin_project! {
    pub struct SelectCase<S, T, R> {
        #[pin]
        stream: S,
        selectors: Vec<CaseSelector<T, R>>,
    }
}

impl<S, T, R> Stream for SelectCase<S, T, R>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = Transformed<T, R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(Categorized { category, item }) => {
                let new_item = this
                    .selectors
                    .get_mut(category as usize)
                    .map(|selector| selector(&item));
                Poll::Ready(Some(Transformed {
                    category,
                    item,
                    new_item,
                }))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct SelectCaseIndexed<S, T, R> {
        #[pin]
        stream: S,
        selectors: Vec<CaseSelectorIndexed<T, R>>,
        index: usize,
    }
}

impl<S, T, R> Stream for SelectCaseIndexed<S, T, R>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = Transformed<T, R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(Categorized { category, item }) => {
                let index = *this.index;
                *this.index += 1;
                let new_item = this
                    .selectors
                    .get_mut(category as usize)
                    .map(|selector| selector(&item, index));
                Poll::Ready(Some(Transformed {
                    category,
                    item,
                    new_item,
                }))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct ForEachCase<S, T> {
        #[pin]
        stream: S,
        actions: Vec<CaseAction<T>>,
    }
}

impl<S, T> Stream for ForEachCase<S, T>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(cased) => {
                if let Some(action) = this.actions.get_mut(cased.category as usize) {
                    action(&cased.item);
                }
                Poll::Ready(Some(cased))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct ForEachCaseIndexed<S, T> {
        #[pin]
        stream: S,
        actions: Vec<CaseActionIndexed<T>>,
        index: usize,
    }
}

impl<S, T> Stream for ForEachCaseIndexed<S, T>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(cased) => {
                let index = *this.index;
                *this.index += 1;
                if let Some(action) = this.actions.get_mut(cased.category as usize) {
                    action(&cased.item, index);
                }
                Poll::Ready(Some(cased))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct ForEachCaseSignal<S> {
        #[pin]
        stream: S,
        actions: Vec<CaseSignal>,
    }
}

impl<T, S> Stream for ForEachCaseSignal<S>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(cased) => {
                if let Some(action) = this.actions.get_mut(cased.category as usize) {
                    action();
                }
                Poll::Ready(Some(cased))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct UnCase<S> {
        #[pin]
        stream: S,
    }
}

impl<T, S> Stream for UnCase<S>
where
    S: Stream<Item = Categorized<T>>,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.project();
        Poll::Ready(ready!(this.stream.poll_next(cx)).map(|cased| cased.item))
    }
}

/// Operators over a transformed (post-`select_case`) stream.
pub trait TransformedAsyncSequenceExt<T, R>: Stream<Item = Transformed<T, R>> + Sized {
    /// A second selector wave over `new_item`, leaving the original item
    /// intact.
    fn select_case<R2>(self, selectors: Vec<CaseSelector<R, R2>>) -> Reselect<Self, R, R2> {
        Reselect {
            stream: self,
            selectors,
        }
    }

    /// Projects back to the original items, discarding transforms.
    fn un_case(self) -> UnCaseTransformed<Self> {
        UnCaseTransformed { stream: self }
    }

    /// Projects the transform outputs, dropping items with no `new_item`.
    fn all_cases(self) -> AllCases<Self> {
        AllCases { stream: self }
    }

    /// Projects the transform outputs verbatim, `None`s included.
    fn all_cases_unfiltered(self) -> AllCasesUnfiltered<Self> {
        AllCasesUnfiltered { stream: self }
    }

    /// The string-specialized projection over transform outputs.
    fn all_cases_delimited(self, separator: impl Into<String>) -> Delimited<AllCases<Self>>
    where
        R: AsRef<str>,
    {
        Delimited::new(self.all_cases(), separator.into())
    }
}

impl<T, R, S: Stream<Item = Transformed<T, R>>> TransformedAsyncSequenceExt<T, R> for S {}

pin_project_lite::pin_project! {
    pub struct Reselect<S, R, R2> {
        #[pin]
        stream: S,
        selectors: Vec<CaseSelector<R, R2>>,
    }
}

impl<T, R, R2, S> Stream for Reselect<S, R, R2>
where
    S: Stream<Item = Transformed<T, R>>,
{
    type Item = Transformed<T, R2>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.stream.poll_next(cx)) {
            Some(Transformed {
                category,
                item,
                new_item,
            }) => {
                let new_item = match (new_item, this.selectors.get_mut(category as usize)) {
                    (Some(previous), Some(selector)) => Some(selector(&previous)),
                    _ => None,
                };
                Poll::Ready(Some(Transformed {
                    category,
                    item,
                    new_item,
                }))
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project_lite::pin_project! {
    pub struct UnCaseTransformed<S> {
        #[pin]
        stream: S,
    }
}

impl<T, R, S> Stream for UnCaseTransformed<S>
where
    S: Stream<Item = Transformed<T, R>>,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.project();
        Poll::Ready(ready!(this.stream.poll_next(cx)).map(|transformed| transformed.item))
    }
}

pin_project_lite::pin_project! {
    pub struct AllCases<S> {
        #[pin]
        stream: S,
    }
}

impl<T, R, S> Stream for AllCases<S>
where
    S: Stream<Item = Transformed<T, R>>,
{
    type Item = R;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<R>> {
        let mut this = self.project();
        loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Transformed {
                    new_item: Some(new_item),
                    ..
                }) => return Poll::Ready(Some(new_item)),
                Some(_) => continue,
                None => return Poll::Ready(None),
            }
        }
    }
}

pin_project_lite::pin_project! {
    pub struct AllCasesUnfiltered<S> {
        #[pin]
        stream: S,
    }
}

impl<T, R, S> Stream for AllCasesUnfiltered<S>
where
    S: Stream<Item = Transformed<T, R>>,
{
    type Item = Option<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Option<R>>> {
        let this = self.project();
        Poll::Ready(ready!(this.stream.poll_next(cx)).map(|transformed| transformed.new_item))
    }
}
