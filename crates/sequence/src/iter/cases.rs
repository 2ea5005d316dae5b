use crate::iter::strings::Delimited;
use crate::routing::{
    CaseAction, CaseActionIndexed, CasePredicate, CaseSelector, CaseSelectorIndexed, CaseSignal,
    Categorized, Tagged, Transformed,
};

/// Routes each item to the index of its first matching predicate; unmatched
/// items land in the supra category `predicates.len()`.
pub struct Cases<I: Iterator> {
    iter: I,
    predicates: Vec<CasePredicate<I::Item>>,
}

impl<I: Iterator> Cases<I> {
    pub(crate) fn new(iter: I, predicates: Vec<CasePredicate<I::Item>>) -> Self {
        Cases { iter, predicates }
    }
}

fn categorize<T>(predicates: &mut [CasePredicate<T>], item: &T) -> u32 {
    predicates
        .iter_mut()
        .position(|predicate| predicate(item))
        .unwrap_or(predicates.len()) as u32
}

impl<I: Iterator> Iterator for Cases<I> {
    type Item = Categorized<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;
        let category = categorize(&mut self.predicates, &item);
        Some(Categorized { category, item })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// The labeled overload of [`Cases`]: arms carry a caller-chosen tag, and the
/// explicit `supra` tag labels unmatched items.
pub struct CasesTagged<I: Iterator, L> {
    iter: I,
    arms: Vec<(L, CasePredicate<I::Item>)>,
    supra: L,
}

impl<I: Iterator, L> CasesTagged<I, L> {
    pub(crate) fn new(iter: I, arms: Vec<(L, CasePredicate<I::Item>)>, supra: L) -> Self {
        CasesTagged { iter, arms, supra }
    }
}

impl<I: Iterator, L: Clone> Iterator for CasesTagged<I, L> {
    type Item = Tagged<L, I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.iter.next()?;
        let label = self
            .arms
            .iter_mut()
            .find_map(|(label, predicate)| predicate(&item).then(|| label.clone()))
            .unwrap_or_else(|| self.supra.clone());
        Some(Tagged { label, item })
    }
}

/// Operators over a categorized sequence.
pub trait CasedSequenceExt<T>: Iterator<Item = Categorized<T>> + Sized {
    /// Applies the selector matching each item's category. Items whose
    /// category has no selector (including the supra category when its
    /// selector is omitted) pass through with `new_item = None`.
    fn select_case<R>(self, selectors: Vec<CaseSelector<T, R>>) -> SelectCase<Self, T, R> {
        SelectCase {
            iter: self,
            selectors,
        }
    }

    /// As [`select_case`](Self::select_case), with the running item index
    /// passed to every selector.
    fn select_case_indexed<R>(
        self,
        selectors: Vec<CaseSelectorIndexed<T, R>>,
    ) -> SelectCaseIndexed<Self, T, R> {
        SelectCaseIndexed {
            iter: self,
            selectors,
            index: 0,
        }
    }

    /// Pass-through side effects keyed by category. Categories beyond the
    /// action vector fire nothing; the supra category must be covered
    /// explicitly by supplying an action at index `N`.
    fn for_each_case(self, actions: Vec<CaseAction<T>>) -> ForEachCase<Self, T> {
        ForEachCase {
            iter: self,
            actions,
        }
    }

    /// As [`for_each_case`](Self::for_each_case), with the running item index.
    fn for_each_case_indexed(
        self,
        actions: Vec<CaseActionIndexed<T>>,
    ) -> ForEachCaseIndexed<Self, T> {
        ForEachCaseIndexed {
            iter: self,
            actions,
            index: 0,
        }
    }

    /// As [`for_each_case`](Self::for_each_case), for actions that ignore the
    /// item itself.
    fn for_each_case_signal(self, actions: Vec<CaseSignal>) -> ForEachCaseSignal<Self> {
        ForEachCaseSignal {
            iter: self,
            actions,
        }
    }

    /// Projects back to the plain item sequence, order preserved.
    fn un_case(self) -> UnCase<Self> {
        UnCase { iter: self }
    }
}

impl<T, I: Iterator<Item = Categorized<T>>> CasedSequenceExt<T> for I {}

pub struct SelectCase<I, T, R> {
    iter: I,
    selectors: Vec<CaseSelector<T, R>>,
}

impl<I, T, R> Iterator for SelectCase<I, T, R>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = Transformed<T, R>;

    fn next(&mut self) -> Option<Self::Item> {
        let Categorized { category, item } = self.iter.next()?;
        let new_item = self
            .selectors
            .get_mut(category as usize)
            .map(|selector| selector(&item));
        Some(Transformed {
            category,
            item,
            new_item,
        })
    }
}

pub struct SelectCaseIndexed<I, T, R> {
    iter: I,
    selectors: Vec<CaseSelectorIndexed<T, R>>,
    index: usize,
}

impl<I, T, R> Iterator for SelectCaseIndexed<I, T, R>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = Transformed<T, R>;

    fn next(&mut self) -> Option<Self::Item> {
        let Categorized { category, item } = self.iter.next()?;
        let index = self.index;
        self.index += 1;
        let new_item = self
            .selectors
            .get_mut(category as usize)
            .map(|selector| selector(&item, index));
        Some(Transformed {
            category,
            item,
            new_item,
        })
    }
}

pub struct ForEachCase<I, T> {
    iter: I,
    actions: Vec<CaseAction<T>>,
}

impl<I, T> Iterator for ForEachCase<I, T>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let cased = self.iter.next()?;
        if let Some(action) = self.actions.get_mut(cased.category as usize) {
            action(&cased.item);
        }
        Some(cased)
    }
}

pub struct ForEachCaseIndexed<I, T> {
    iter: I,
    actions: Vec<CaseActionIndexed<T>>,
    index: usize,
}

impl<I, T> Iterator for ForEachCaseIndexed<I, T>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let cased = self.iter.next()?;
        let index = self.index;
        self.index += 1;
        if let Some(action) = self.actions.get_mut(cased.category as usize) {
            action(&cased.item, index);
        }
        Some(cased)
    }
}

pub struct ForEachCaseSignal<I> {
    iter: I,
    actions: Vec<CaseSignal>,
}

impl<T, I> Iterator for ForEachCaseSignal<I>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = Categorized<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let cased = self.iter.next()?;
        if let Some(action) = self.actions.get_mut(cased.category as usize) {
            action();
        }
        Some(cased)
    }
}

pub struct UnCase<I> {
    iter: I,
}

impl<T, I> Iterator for UnCase<I>
where
    I: Iterator<Item = Categorized<T>>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.iter.next().map(|cased| cased.item)
    }
}

/// Operators over a transformed (post-`select_case`) sequence.
pub trait TransformedSequenceExt<T, R>: Iterator<Item = Transformed<T, R>> + Sized {
    /// A second selector wave over `new_item`, leaving the original item
    /// intact. Items whose `new_item` is `None`, or whose category has no
    /// selector here, come out with `new_item = None`.
    fn select_case<R2>(self, selectors: Vec<CaseSelector<R, R2>>) -> Reselect<Self, R, R2> {
        Reselect {
            iter: self,
            selectors,
        }
    }

    /// Projects back to the original items, discarding transforms.
    fn un_case(self) -> UnCaseTransformed<Self> {
        UnCaseTransformed { iter: self }
    }

    /// Projects the transform outputs, dropping items with no `new_item`.
    fn all_cases(self) -> AllCases<Self> {
        AllCases { iter: self }
    }

    /// Projects the transform outputs verbatim, `None`s included.
    fn all_cases_unfiltered(self) -> AllCasesUnfiltered<Self> {
        AllCasesUnfiltered { iter: self }
    }

    /// The string-specialized projection: transform outputs accumulate until
    /// one equals `separator`, at which point the concatenated buffer is
    /// yielded.
    fn all_cases_delimited(self, separator: impl Into<String>) -> Delimited<AllCases<Self>>
    where
        R: AsRef<str>,
    {
        Delimited::new(self.all_cases(), separator.into())
    }
}

impl<T, R, I: Iterator<Item = Transformed<T, R>>> TransformedSequenceExt<T, R> for I {}

pub struct Reselect<I, R, R2> {
    iter: I,
    selectors: Vec<CaseSelector<R, R2>>,
}

impl<T, R, R2, I> Iterator for Reselect<I, R, R2>
where
    I: Iterator<Item = Transformed<T, R>>,
{
    type Item = Transformed<T, R2>;

    fn next(&mut self) -> Option<Self::Item> {
        let Transformed {
            category,
            item,
            new_item,
        } = self.iter.next()?;
        let new_item = match (new_item, self.selectors.get_mut(category as usize)) {
            (Some(previous), Some(selector)) => Some(selector(&previous)),
            _ => None,
        };
        Some(Transformed {
            category,
            item,
            new_item,
        })
    }
}

pub struct UnCaseTransformed<I> {
    iter: I,
}

impl<T, R, I> Iterator for UnCaseTransformed<I>
where
    I: Iterator<Item = Transformed<T, R>>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.iter.next().map(|transformed| transformed.item)
    }
}

pub struct AllCases<I> {
    iter: I,
}

impl<T, R, I> Iterator for AllCases<I>
where
    I: Iterator<Item = Transformed<T, R>>,
{
    type Item = R;

    fn next(&mut self) -> Option<R> {
        loop {
            match self.iter.next()? {
                Transformed {
                    new_item: Some(new_item),
                    ..
                } => return Some(new_item),
                _ => continue,
            }
        }
    }
}

pub struct AllCasesUnfiltered<I> {
    iter: I,
}

impl<T, R, I> Iterator for AllCasesUnfiltered<I>
where
    I: Iterator<Item = Transformed<T, R>>,
{
    type Item = Option<R>;

    fn next(&mut self) -> Option<Option<R>> {
        self.iter.next().map(|transformed| transformed.new_item)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SequenceExt;

    fn contains(needle: &'static str) -> CasePredicate<&'static str> {
        Box::new(move |s: &&str| s.contains(needle))
    }

    #[test]
    fn first_matching_predicate_wins() {
        let lines = vec!["ERROR x", "WARN y", "INFO z"];
        let cased: Vec<Categorized<&str>> = lines
            .into_iter()
            .cases(vec![contains("ERROR"), contains("E")])
            .collect();
        assert_eq!(cased[0].category, 0);
        assert_eq!(cased[1].category, 2); // supra
        assert_eq!(cased[2].category, 1);
    }

    #[test]
    fn every_item_yields_exactly_one_categorized() {
        let input: Vec<i32> = (0..100).collect();
        let mut counts = [0usize; 3];
        for cased in input
            .clone()
            .into_iter()
            .cases(vec![Box::new(|x: &i32| x % 3 == 0), Box::new(|x: &i32| x % 3 == 1)])
        {
            counts[cased.category as usize] += 1;
        }
        assert_eq!(counts.iter().sum::<usize>(), input.len());
    }

    #[test]
    fn empty_predicate_list_routes_everything_to_category_zero() {
        let cased: Vec<Categorized<i32>> = vec![1, 2].into_iter().cases(vec![]).collect();
        assert!(cased.iter().all(|c| c.category == 0));
    }

    #[test]
    fn un_case_is_the_identity_on_items() {
        let input = vec![5, 6, 7];
        let out: Vec<i32> = input
            .clone()
            .into_iter()
            .cases(vec![Box::new(|x: &i32| x % 2 == 0)])
            .un_case()
            .collect();
        assert_eq!(out, input);
    }

    #[test]
    fn missing_selector_slots_produce_none_not_drops() {
        let out: Vec<Transformed<i32, i32>> = vec![1, 2, 3]
            .into_iter()
            .cases(vec![Box::new(|x: &i32| x % 2 == 1)])
            .select_case(vec![Box::new(|x: &i32| x * 10)])
            .collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].new_item, Some(10));
        assert_eq!(out[1].new_item, None); // supra, no selector
        assert_eq!(out[2].new_item, Some(30));
    }

    #[test]
    fn identity_selectors_round_trip_through_all_cases() {
        let input = vec![1, 2, 3, 4];
        let out: Vec<i32> = input
            .clone()
            .into_iter()
            .cases(vec![Box::new(|x: &i32| x % 2 == 0)])
            .select_case(vec![Box::new(|x: &i32| *x), Box::new(|x: &i32| *x)])
            .all_cases()
            .collect();
        assert_eq!(out, input);
    }

    #[test]
    fn supra_category_with_no_selector_is_filtered_by_all_cases() {
        let lines = vec!["ERROR x", "WARN y", "INFO z"];
        let out: Vec<String> = lines
            .into_iter()
            .cases(vec![contains("ERROR"), contains("WARN")])
            .select_case(vec![
                Box::new(|s: &&str| format!("E:{}", s)),
                Box::new(|s: &&str| format!("W:{}", s)),
            ])
            .all_cases()
            .collect();
        assert_eq!(out, vec!["E:ERROR x", "W:WARN y"]);
    }

    #[test]
    fn for_each_case_fires_only_the_matching_action() {
        let hits = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let (h0, h1) = (hits.clone(), hits.clone());
        vec![1, 2, 3]
            .into_iter()
            .cases(vec![Box::new(|x: &i32| x % 2 == 1)])
            .for_each_case(vec![
                Box::new(move |x: &i32| h0.lock().unwrap().push(("odd", *x))),
                Box::new(move |x: &i32| h1.lock().unwrap().push(("supra", *x))),
            ])
            .un_case()
            .drain();
        assert_eq!(
            *hits.lock().unwrap(),
            vec![("odd", 1), ("supra", 2), ("odd", 3)]
        );
    }

    #[test]
    fn short_action_vectors_pass_unmatched_items_through_silently() {
        let out: Vec<i32> = vec![1, 2]
            .into_iter()
            .cases(vec![Box::new(|x: &i32| *x == 1)])
            .for_each_case(vec![])
            .un_case()
            .collect();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn chained_select_case_maps_new_item_and_keeps_the_original() {
        let out: Vec<Transformed<i32, String>> = vec![1, 2]
            .into_iter()
            .cases(vec![Box::new(|x: &i32| *x == 1)])
            .select_case(vec![Box::new(|x: &i32| x + 100), Box::new(|x: &i32| x + 200)])
            .select_case(vec![
                Box::new(|r: &i32| format!("a{}", r)),
                Box::new(|r: &i32| format!("b{}", r)),
            ])
            .collect();
        assert_eq!(out[0].item, 1);
        assert_eq!(out[0].new_item.as_deref(), Some("a101"));
        assert_eq!(out[1].item, 2);
        assert_eq!(out[1].new_item.as_deref(), Some("b202"));
    }

    #[test]
    fn tagged_cases_carry_labels_with_an_explicit_supra() {
        #[derive(Debug, Clone, PartialEq)]
        enum Level {
            Error,
            Other,
        }
        let out: Vec<Tagged<Level, &str>> = vec!["ERROR a", "ok"]
            .into_iter()
            .cases_tagged(
                vec![(Level::Error, contains("ERROR"))],
                Level::Other,
            )
            .collect();
        assert_eq!(out[0].label, Level::Error);
        assert_eq!(out[1].label, Level::Other);
    }

    #[test]
    fn select_case_indexed_passes_running_indices() {
        let out: Vec<Transformed<&str, String>> = vec!["a", "b"]
            .into_iter()
            .cases(vec![])
            .select_case_indexed(vec![Box::new(|s: &&str, i| format!("{}{}", s, i))])
            .collect();
        assert_eq!(out[0].new_item.as_deref(), Some("a0"));
        assert_eq!(out[1].new_item.as_deref(), Some("b1"));
    }

    #[test]
    fn all_cases_delimited_accumulates_between_separator_items() {
        let out: Vec<String> = vec!["a", "b", ";", "c"]
            .into_iter()
            .cases(vec![])
            .select_case(vec![Box::new(|s: &&str| s.to_string())])
            .all_cases_delimited(";")
            .collect();
        assert_eq!(out, vec!["ab", "c"]);
    }
}
