//! Header resolution and column-to-field name mapping.

use crate::csv::options::CsvOptions;

/// Resolves the column names for a file: the explicit schema wins, then a
/// consumed header row (possibly through the caller's namer), then synthetic
/// `Column1..N` names. Names are sanitized and de-duplicated.
pub(crate) fn resolve_column_names(
    header: Option<&[String]>,
    width_hint: usize,
    options: &CsvOptions,
    file: Option<&str>,
) -> Vec<String> {
    if let Some(schema) = &options.schema {
        return dedupe(schema.clone());
    }

    let width = header.map_or(width_hint, <[String]>::len).max(width_hint);
    let mut names = Vec::with_capacity(width);
    for index in 0..width {
        let raw = header
            .and_then(|fields| fields.get(index))
            .map(String::as_str)
            .unwrap_or("");
        let default = default_name(raw, index);
        let name = match &options.column_namer {
            Some(namer) => namer(raw, file, index, &default),
            None => default,
        };
        names.push(name);
    }
    dedupe(names)
}

fn default_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Column{}", index + 1)
    } else {
        trimmed.to_string()
    }
}

fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
            continue;
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}", name, counter);
            if !seen.contains(&candidate) {
                seen.push(candidate);
                break;
            }
            counter += 1;
        }
    }
    seen
}

/// Maps resolved column names onto the caller's target field names:
/// case-insensitive exact match first, then separator-insensitive
/// (snake/camel/Pascal all normalize alike), then fuzzy within edit
/// distance 2. Unmatched columns keep their own name (serde ignores unknown
/// keys); unmatched targets are absent from the output object, so
/// `#[serde(default)]` fields take their defaults.
pub(crate) fn map_column_names(columns: &[String], targets: Option<&[String]>) -> Vec<String> {
    let Some(targets) = targets else {
        return columns.to_vec();
    };
    let mut taken = vec![false; targets.len()];
    columns
        .iter()
        .map(|column| {
            match_target(column, targets, &mut taken)
                .map(str::to_string)
                .unwrap_or_else(|| column.clone())
        })
        .collect()
}

fn match_target<'t>(column: &str, targets: &'t [String], taken: &mut [bool]) -> Option<&'t str> {
    let exact = targets.iter().position(|target| {
        caseless::default_caseless_match_str(column, target)
    });
    let separator_insensitive = || {
        let normalized = normalize(column);
        targets
            .iter()
            .position(|target| normalize(target) == normalized)
    };
    let fuzzy = || {
        let lowered = column.to_lowercase();
        targets
            .iter()
            .enumerate()
            .map(|(index, target)| (strsim::levenshtein(&lowered, &target.to_lowercase()), index))
            .filter(|&(distance, index)| distance <= 2 && !taken[index])
            .min()
            .map(|(_, index)| index)
    };

    let index = exact.or_else(separator_insensitive).or_else(fuzzy)?;
    if taken[index] {
        return None;
    }
    taken[index] = true;
    Some(&targets[index])
}

/// Case-folded with separators removed: `user_id`, `userId`, `UserID` and
/// `user-id` all collapse to `userid`.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}
