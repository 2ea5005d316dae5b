//! Two-phase schema/type inference: sample rows feed per-column candidate
//! sets with "systematic error learning" (one tolerated parse failure per
//! candidate per column; the second removes it), then the highest-precedence
//! surviving candidate wins.

use crate::csv::numbers::{digit_count, has_leading_zero, looks_numeric};
use crate::csv::options::CsvOptions;
use crate::csv::types::{TypeTag, PRECEDENCE};
use itertools::Itertools;

const STRIKE_LIMIT: u8 = 2;

struct Candidate {
    tag: TypeTag,
    strikes: u8,
    successes: u32,
}

pub(crate) struct InferenceState {
    columns: Vec<Vec<Candidate>>,
}

fn fresh_candidates() -> Vec<Candidate> {
    PRECEDENCE
        .iter()
        .map(|&tag| Candidate {
            tag,
            strikes: 0,
            successes: 0,
        })
        .collect()
}

impl InferenceState {
    pub fn new(column_count: usize) -> Self {
        InferenceState {
            columns: (0..column_count).map(|_| fresh_candidates()).collect(),
        }
    }

    pub fn observe(&mut self, fields: &[String], options: &CsvOptions) {
        if fields.len() > self.columns.len() {
            self.columns
                .resize_with(fields.len(), fresh_candidates);
        }
        for (column, raw) in self.columns.iter_mut().zip(fields) {
            let value = if options.trim_whitespace {
                raw.trim()
            } else {
                raw.as_str()
            };
            // Empty cells are no evidence either way.
            if value.trim().is_empty() {
                continue;
            }

            if options.preserve_numeric_strings_with_leading_zeros && has_leading_zero(value) {
                for candidate in column.iter_mut().filter(|c| c.tag.is_numeric()) {
                    candidate.strikes = STRIKE_LIMIT;
                }
            }
            if options.preserve_large_integer_strings
                && looks_numeric(value)
                && digit_count(value) > 18
            {
                for candidate in column.iter_mut().filter(|c| c.tag.is_numeric()) {
                    candidate.strikes = STRIKE_LIMIT;
                }
            }

            for candidate in column.iter_mut().filter(|c| c.strikes < STRIKE_LIMIT) {
                if candidate
                    .tag
                    .parse(value, options.number_format.as_ref())
                    .is_some()
                {
                    candidate.successes += 1;
                } else {
                    candidate.strikes += 1;
                }
            }
        }
    }

    /// Per column: the highest-precedence candidate that survived sampling
    /// and parsed at least one value; `String` otherwise.
    pub fn finish(&self) -> Vec<TypeTag> {
        let types: Vec<TypeTag> = self
            .columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .find(|c| c.strikes < STRIKE_LIMIT && c.successes > 0)
                    .map(|c| c.tag)
                    .unwrap_or(TypeTag::String)
            })
            .collect();
        tracing::debug!(types = %types.iter().map(|t| format!("{:?}", t)).join(","), "inferred column types");
        types
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn observe_rows(rows: &[&[&str]], options: &CsvOptions) -> Vec<TypeTag> {
        let mut state = InferenceState::new(rows.first().map_or(0, |r| r.len()));
        for row in rows {
            let fields: Vec<String> = row.iter().map(|s| s.to_string()).collect();
            state.observe(&fields, options);
        }
        state.finish()
    }

    #[test]
    fn clean_columns_infer_their_natural_types() {
        let options = CsvOptions::default();
        let types = observe_rows(
            &[
                &["true", "1", "9000000000", "1.5", "2024-01-01", "x"],
                &["false", "2", "9000000001", "2.5", "2024-01-02", "y"],
            ],
            &options,
        );
        assert_eq!(
            types,
            vec![
                TypeTag::Boolean,
                TypeTag::Integer,
                TypeTag::Long,
                TypeTag::Decimal,
                TypeTag::DateTime,
                TypeTag::String,
            ]
        );
    }

    #[test]
    fn one_failure_is_tolerated_the_second_removes_the_candidate() {
        let options = CsvOptions::default();
        // One stray value keeps Integer alive; two remove it.
        let tolerated = observe_rows(&[&["1"], &["oops"], &["3"]], &options);
        assert_eq!(tolerated, vec![TypeTag::Integer]);

        let removed = observe_rows(&[&["1"], &["oops"], &["nope"], &["3"]], &options);
        assert_eq!(removed, vec![TypeTag::String]);
    }

    #[test]
    fn leading_zeros_preserve_strings_when_asked() {
        let mut options = CsvOptions::default();
        options.preserve_numeric_strings_with_leading_zeros = true;
        let types = observe_rows(&[&["0042"], &["0100"]], &options);
        assert_eq!(types, vec![TypeTag::String]);

        options.preserve_numeric_strings_with_leading_zeros = false;
        let types = observe_rows(&[&["0042"], &["0100"]], &options);
        assert_eq!(types, vec![TypeTag::Integer]);
    }

    #[test]
    fn large_integers_preserve_strings_when_asked() {
        let mut options = CsvOptions::default();
        options.preserve_large_integer_strings = true;
        let types = observe_rows(&[&["12345678901234567890123"]], &options);
        assert_eq!(types, vec![TypeTag::String]);
    }

    #[test]
    fn empty_cells_are_not_evidence() {
        let options = CsvOptions::default();
        let types = observe_rows(&[&[""], &["7"], &[""]], &options);
        assert_eq!(types, vec![TypeTag::Integer]);
    }
}
