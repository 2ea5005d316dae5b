//! Numeric string normalization under a configured locale, with the smart
//! separator heuristic for unconfigured inputs:
//!
//! - both `.` and `,` present: the one occurring last is the decimal point;
//! - one separator, more than once: digit grouping;
//! - one separator, once, exactly three trailing digits: digit grouping;
//! - one separator, once, any other trailing width: decimal point.

use crate::csv::options::NumberFormat;

/// Rewrites `raw` into plain `[-]digits[.digits][e…]` form, or `None` when it
/// is not a numeric string under the (configured or inferred) locale.
pub(crate) fn normalize_number(raw: &str, format: Option<&NumberFormat>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Scientific notation never carries grouping; take the decimal separator
    // and pass the rest through for the float parser to judge.
    if trimmed.contains(['e', 'E']) && trimmed.contains(|c: char| c.is_ascii_digit()) {
        let decimal = format.map(|f| f.decimal_separator).unwrap_or('.');
        return check_shape(trimmed.replace(decimal, "."));
    }

    let (decimal, group) = match format {
        Some(format) => (format.decimal_separator, format.group_separator),
        None => infer_separators(trimmed)?,
    };

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c == decimal {
            out.push('.');
        } else if Some(c) == group {
            // grouping: dropped
        } else {
            out.push(c);
        }
    }
    check_shape(out)
}

/// Applies the heuristic, returning `(decimal, group)`.
fn infer_separators(value: &str) -> Option<(char, Option<char>)> {
    let last_dot = value.rfind('.');
    let last_comma = value.rfind(',');
    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                Some(('.', Some(',')))
            } else {
                Some((',', Some('.')))
            }
        }
        (Some(_), None) => Some(classify_single(value, '.')),
        (None, Some(_)) => Some(classify_single(value, ',')),
        (None, None) => Some(('.', None)),
    }
}

fn classify_single(value: &str, separator: char) -> (char, Option<char>) {
    let occurrences = value.matches(separator).count();
    let trailing = value
        .rsplit(separator)
        .next()
        .map(|tail| tail.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    if occurrences > 1 || trailing == 3 {
        // Grouping; the imagined decimal separator is the other one.
        let other = if separator == '.' { ',' } else { '.' };
        (other, Some(separator))
    } else {
        (separator, None)
    }
}

fn check_shape(candidate: String) -> Option<String> {
    let body = candidate.strip_prefix(['-', '+']).unwrap_or(&candidate);
    let mut digits = false;
    let mut dots = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits = true,
            '.' => dots += 1,
            'e' | 'E' | '-' | '+' => {}
            _ => return None,
        }
    }
    (digits && dots <= 1).then_some(candidate)
}

/// Count of ASCII digits, used by the large-integer preservation rule.
pub(crate) fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// A numeric-looking string with a leading zero, e.g. an account code
/// `0042`, which must survive as a string.
pub(crate) fn has_leading_zero(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() > 1
        && trimmed.starts_with('0')
        && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Loosely numeric: only digits, separators and signs.
pub(crate) fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn both_separators_take_the_last_as_decimal() {
        assert_eq!(normalize_number("1.234,56", None).as_deref(), Some("1234.56"));
        assert_eq!(normalize_number("1,234.56", None).as_deref(), Some("1234.56"));
    }

    #[test]
    fn one_separator_with_three_trailing_digits_is_grouping() {
        assert_eq!(normalize_number("1,234", None).as_deref(), Some("1234"));
        assert_eq!(normalize_number("1.234", None).as_deref(), Some("1234"));
    }

    #[test]
    fn one_separator_with_other_widths_is_decimal() {
        assert_eq!(normalize_number("12,5", None).as_deref(), Some("12.5"));
        assert_eq!(normalize_number("3.14159", None).as_deref(), Some("3.14159"));
    }

    #[test]
    fn repeated_single_separator_is_grouping() {
        assert_eq!(
            normalize_number("1,234,567", None).as_deref(),
            Some("1234567")
        );
    }

    #[test]
    fn an_explicit_format_overrides_the_heuristic() {
        let format = NumberFormat {
            decimal_separator: ',',
            group_separator: Some('.'),
        };
        assert_eq!(
            normalize_number("1.234,5", Some(&format)).as_deref(),
            Some("1234.5")
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(normalize_number("12abc", None), None);
        assert_eq!(normalize_number("", None), None);
        assert_eq!(normalize_number("--", None), None);
    }

    #[test]
    fn preservation_predicates() {
        assert!(has_leading_zero("0042"));
        assert!(!has_leading_zero("0"));
        assert!(!has_leading_zero("0.5"));
        assert_eq!(digit_count("12345678901234567890"), 20);
        assert!(looks_numeric("1,234.5"));
        assert!(!looks_numeric("n/a"));
    }
}
