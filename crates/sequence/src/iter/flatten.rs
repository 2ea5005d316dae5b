/// Concatenates nested sequences, inserting a separator item between
/// consecutive groups (never before the first or after the last).
pub struct FlattenSeparated<I, Inner: Iterator> {
    outer: I,
    inner: Option<Inner>,
    separator: Inner::Item,
    started: bool,
}

impl<I, Inner: Iterator> FlattenSeparated<I, Inner> {
    pub(crate) fn new(outer: I, separator: Inner::Item) -> Self {
        FlattenSeparated {
            outer,
            inner: None,
            separator,
            started: false,
        }
    }
}

impl<I, Inner> Iterator for FlattenSeparated<I, Inner>
where
    I: Iterator,
    I::Item: IntoIterator<IntoIter = Inner, Item = Inner::Item>,
    Inner: Iterator,
    Inner::Item: Clone,
{
    type Item = Inner::Item;

    fn next(&mut self) -> Option<Inner::Item> {
        loop {
            if let Some(inner) = self.inner.as_mut() {
                match inner.next() {
                    Some(item) => return Some(item),
                    None => self.inner = None,
                }
            }
            let group = self.outer.next()?;
            self.inner = Some(group.into_iter());
            if self.started {
                return Some(self.separator.clone());
            }
            self.started = true;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::SequenceExt;

    #[test]
    fn separator_appears_between_groups_only() {
        let groups = vec![vec![1, 2], vec![3], vec![4, 5]];
        let out: Vec<i32> = groups.into_iter().flatten_separated(0).collect();
        assert_eq!(out, vec![1, 2, 0, 3, 0, 4, 5]);
    }

    #[test]
    fn empty_groups_still_mark_a_boundary() {
        let groups: Vec<Vec<i32>> = vec![vec![1], vec![], vec![2]];
        let out: Vec<i32> = groups.into_iter().flatten_separated(0).collect();
        assert_eq!(out, vec![1, 0, 0, 2]);
    }

    #[test]
    fn no_groups_yield_nothing() {
        let groups: Vec<Vec<i32>> = Vec::new();
        assert_eq!(groups.into_iter().flatten_separated(0).count(), 0);
    }

    #[test]
    fn single_group_has_no_separator() {
        let groups = vec![vec!["a", "b"]];
        let out: Vec<&str> = groups.into_iter().flatten_separated("|").collect();
        assert_eq!(out, vec!["a", "b"]);
    }
}
