use crate::observe::SpyOptions;
use std::fmt;

/// Lazy pass-through that renders each item to the configured observation
/// channel. The prefix is written before the first item, the suffix once the
/// upstream ends, and the separator between consecutive items.
pub struct Spy<I> {
    iter: I,
    options: SpyOptions,
    emitted: u64,
    finished: bool,
}

impl<I> Spy<I> {
    pub(crate) fn new(iter: I, options: SpyOptions) -> Self {
        Spy {
            iter,
            options,
            emitted: 0,
            finished: false,
        }
    }
}

impl<I> Iterator for Spy<I>
where
    I: Iterator,
    I::Item: fmt::Display,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.finished {
            return None;
        }
        if self.emitted == 0 {
            if let Some(prefix) = &self.options.prefix {
                self.options.observer.observe(prefix);
            }
        }
        match self.iter.next() {
            Some(item) => {
                if self.emitted > 0 {
                    if let Some(separator) = &self.options.separator {
                        self.options.observer.observe(separator);
                    }
                }
                self.options.observer.observe(&self.options.render(&item));
                self.emitted += 1;
                Some(item)
            }
            None => {
                self.finished = true;
                if let Some(suffix) = &self.options.suffix {
                    self.options.observer.observe(suffix);
                }
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

#[cfg(test)]
mod test {
    use crate::observe::{SpyOptions, VecObserver};
    use crate::SequenceExt;
    use std::sync::Arc;

    #[test]
    fn spy_passes_items_through_and_observes_them() {
        let observer = Arc::new(VecObserver::new());
        let options = SpyOptions::new("nums").with_observer(observer.clone());
        let out: Vec<i32> = vec![1, 2].into_iter().spy_with(options).collect();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(observer.lines(), vec!["[nums] 1", "[nums] 2"]);
    }

    #[test]
    fn brackets_and_separator_are_emitted_in_order() {
        let observer = Arc::new(VecObserver::new());
        let options = SpyOptions::new("")
            .with_prefix("begin")
            .with_suffix("end")
            .with_separator("--")
            .with_observer(observer.clone());
        vec!["a", "b"].into_iter().spy_with(options).drain();
        assert_eq!(observer.lines(), vec!["begin", "a", "--", "b", "end"]);
    }

    #[test]
    fn nothing_is_observed_until_the_sequence_is_pulled() {
        let observer = Arc::new(VecObserver::new());
        let options = SpyOptions::new("lazy").with_observer(observer.clone());
        let _spy = vec![1].into_iter().spy_with(options);
        assert!(observer.lines().is_empty());
    }
}
