//! Shapes shared by the Cases routing family, in both the sync and async
//! flavors.

/// A routing predicate. Predicates are evaluated top to bottom and the first
/// match wins, so an item lands in exactly one category.
pub type CasePredicate<T> = Box<dyn FnMut(&T) -> bool + Send>;

/// A per-category transform applied by `select_case`.
pub type CaseSelector<T, R> = Box<dyn FnMut(&T) -> R + Send>;

/// A per-category transform that also observes the running item index.
pub type CaseSelectorIndexed<T, R> = Box<dyn FnMut(&T, usize) -> R + Send>;

/// A per-category side effect applied by `for_each_case`.
pub type CaseAction<T> = Box<dyn FnMut(&T) + Send>;

/// A per-category side effect that also observes the running item index.
pub type CaseActionIndexed<T> = Box<dyn FnMut(&T, usize) + Send>;

/// A per-category side effect that ignores the item.
pub type CaseSignal = Box<dyn FnMut() + Send>;

/// An item routed by `cases`: `category` is the index of the first matching
/// predicate, or the predicate count (the supra category) when none matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized<T> {
    pub category: u32,
    pub item: T,
}

impl<T> Categorized<T> {
    pub fn new(category: u32, item: T) -> Self {
        Categorized { category, item }
    }
}

/// An item routed by `cases_tagged`, carrying the caller's label instead of a
/// category index. Unmatched items carry the explicit supra label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<L, T> {
    pub label: L,
    pub item: T,
}

/// The result of `select_case`: the original item plus the transform output.
/// `new_item` is `None` exactly when no selector was supplied for the item's
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed<T, R> {
    pub category: u32,
    pub item: T,
    pub new_item: Option<R>,
}
