//! Lazy pipeline algebra over synchronous and asynchronous sequences.
//!
//! Every operator exists in two flavors with identical contracts: the [`iter`]
//! module extends [`Iterator`], the [`stream`] module extends
//! [`futures::Stream`]. Operators are cold, single-pass and buffer-free; the
//! routing family (`cases` / `select_case` / `for_each_case` / `all_cases`)
//! categorizes items with a distinguished supra category for anything no
//! predicate claims.

pub mod iter;
pub mod observe;
pub mod routing;
pub mod stream;

pub use self::iter::{merge_ordered, SequenceExt};
pub use self::observe::{FnObserver, Observer, SpyOptions, StderrObserver, VecObserver};
pub use self::routing::{
    CaseAction, CaseActionIndexed, CasePredicate, CaseSelector, CaseSelectorIndexed, CaseSignal,
    Categorized, Tagged, Transformed,
};
pub use self::stream::AsyncSequenceExt;
