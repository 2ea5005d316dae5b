//! Separator detection over a sampled prefix: each candidate is scored by how
//! consistently it splits the sample's lines, and the most consistent wins.

use itertools::Itertools;

const CANDIDATES: &[char] = &[',', ';', '\t', '|'];
const MAX_SAMPLE_LINES: usize = 20;

/// Picks a separator for `sample`. Falls back to a comma when nothing splits.
pub(crate) fn detect_separator(sample: &str) -> char {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|line| !line.is_empty())
        .take(MAX_SAMPLE_LINES)
        .collect();
    if lines.is_empty() {
        return ',';
    }

    let mut best = (',', f64::MIN);
    for &candidate in CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_outside_quotes(line, candidate))
            .collect();
        let score = consistency_score(&counts);
        tracing::debug!(candidate = ?candidate, counts = %counts.iter().join(","), score, "scored separator candidate");
        if score > best.1 {
            best = (candidate, score);
        }
    }
    tracing::debug!(separator = ?best.0, "detected separator");
    best.0
}

/// Occurrences of `sep` outside double-quoted regions.
fn count_outside_quotes(line: &str, sep: char) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c == sep && !quoted => count += 1,
            _ => {}
        }
    }
    count
}

/// Rows that split at all, minus a penalty for row-to-row variance. A
/// candidate splitting every line into the same number of fields scores
/// highest.
fn consistency_score(counts: &[usize]) -> f64 {
    let rows_split = counts.iter().filter(|&&c| c > 0).count() as f64;
    if rows_split == 0.0 {
        return f64::MIN;
    }
    let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    let variance = counts
        .iter()
        .map(|&c| (c as f64 - mean).powi(2))
        .sum::<f64>()
        / counts.len() as f64;
    rows_split - variance.sqrt() / (mean + 1.0)
}
