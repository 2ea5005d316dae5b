//! Cross-operator pipeline properties: single-pass evaluation, routing
//! totality, and the round-trip laws.

use sequence::iter::{CasedSequenceExt, TransformedSequenceExt};
use sequence::{CasePredicate, SequenceExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps an iterator and counts upstream pulls, including the final
/// end-of-sequence pull.
struct CountingSource<I> {
    inner: I,
    pulls: Arc<AtomicUsize>,
}

impl<I: Iterator> Iterator for CountingSource<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        self.inner.next()
    }
}

fn counted<I: Iterator>(inner: I) -> (CountingSource<I>, Arc<AtomicUsize>) {
    let pulls = Arc::new(AtomicUsize::new(0));
    (
        CountingSource {
            inner,
            pulls: pulls.clone(),
        },
        pulls,
    )
}

#[test]
fn a_full_routing_pipeline_is_single_pass() {
    let input: Vec<i32> = (0..50).collect();
    let (source, pulls) = counted(input.iter().copied());

    let out: Vec<i32> = source
        .for_each_item(|_| {})
        .cases(vec![Box::new(|x: &i32| x % 2 == 0) as CasePredicate<i32>])
        .for_each_case(vec![Box::new(|_: &i32| {})])
        .select_case(vec![Box::new(|x: &i32| x * 2), Box::new(|x: &i32| *x)])
        .all_cases()
        .collect();

    assert_eq!(out.len(), 50);
    // n items plus exactly one end-of-sequence pull.
    assert_eq!(pulls.load(Ordering::Relaxed), 51);
}

#[test]
fn until_stops_pulling_at_the_cut() {
    let (source, pulls) = counted(0..1000);
    let out: Vec<i32> = source.until(|&x| x == 9).collect();
    assert_eq!(out.len(), 10);
    assert_eq!(pulls.load(Ordering::Relaxed), 10);
}

#[test]
fn category_frequencies_sum_to_the_input_length() {
    let input: Vec<i32> = (0..97).collect();
    let cased: Vec<_> = input
        .iter()
        .copied()
        .cases(vec![
            Box::new(|x: &i32| x % 3 == 0) as CasePredicate<i32>,
            Box::new(|x: &i32| x % 3 == 1) as CasePredicate<i32>,
        ])
        .collect();
    assert_eq!(cased.len(), input.len());

    let mut frequencies = [0usize; 3];
    for item in &cased {
        frequencies[item.category as usize] += 1;
    }
    assert_eq!(frequencies.iter().sum::<usize>(), input.len());
}

#[test]
fn un_case_after_cases_is_the_identity() {
    let input = vec!["a", "bb", "ccc", "dddd"];
    let out: Vec<&str> = input
        .clone()
        .into_iter()
        .cases(vec![
            Box::new(|s: &&str| s.len() == 1) as CasePredicate<&str>,
            Box::new(|s: &&str| s.len() == 2) as CasePredicate<&str>,
        ])
        .un_case()
        .collect();
    assert_eq!(out, input);
}

#[test]
fn identity_selectors_for_every_category_round_trip() {
    let input: Vec<i32> = (0..10).collect();
    let out: Vec<i32> = input
        .clone()
        .into_iter()
        .cases(vec![Box::new(|x: &i32| x % 2 == 0) as CasePredicate<i32>])
        .select_case(vec![Box::new(|x: &i32| *x), Box::new(|x: &i32| *x)])
        .all_cases()
        .collect();
    assert_eq!(out, input);
}

#[test]
fn empty_sources_flow_through_every_operator_without_error() {
    let empty: Vec<String> = Vec::new();

    assert_eq!(
        empty
            .clone()
            .into_iter()
            .cases(vec![Box::new(|_: &String| true) as CasePredicate<String>])
            .count(),
        0
    );
    assert_eq!(
        sequence::merge_ordered(empty.clone(), empty.clone(), |a, b| a <= b).count(),
        0
    );
    assert_eq!(
        empty
            .clone()
            .into_iter()
            .until(|_| true)
            .for_each_item(|_| {})
            .count(),
        0
    );
}
