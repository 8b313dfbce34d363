//! Per-column replacement.
//!
//! Each target column is handled either by whole-cell replacement (the cell
//! is one sensitive value) or by pattern substitution (sensitive values are
//! embedded in free text). The choice follows the column name first and the
//! shape of up to [`MAX_STRATEGY_SAMPLES`] values second.

use std::{
    collections::{BTreeMap, HashSet},
    sync::LazyLock,
};

use log::{debug, info, warn};
use regex::{NoExpand, Regex};
use serde::Serialize;

use crate::{
    data::{Cell, CellValue, Dataset},
    error::ReplacementError,
    vocabulary::{DEDICATED_COLUMN_KEYWORDS, MIXED_COLUMN_KEYWORDS, Tokens},
};

pub const MAX_STRATEGY_SAMPLES: usize = 10;

/// Digits needed before a value reads as a phone-like number.
const PHONE_MIN_DIGITS: usize = 7;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email shape regex compiles")
});

/// Column name to number of rows whose cell changed.
pub type ReplacementStats = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    WholeCell,
    PatternSubstitution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Email,
    Ip,
    PhoneLike,
    Generic,
}

#[derive(Debug, Clone)]
pub struct ReplacementResult {
    pub dataset: Dataset,
    pub stats: ReplacementStats,
    pub strategies: BTreeMap<String, Strategy>,
}

pub fn classify_sample(value: &str) -> SampleKind {
    let trimmed = value.trim();
    if EMAIL_SHAPE.is_match(trimmed) {
        return SampleKind::Email;
    }
    let octets = trimmed.split('.').collect::<Vec<_>>();
    if octets.len() == 4
        && octets
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    {
        return SampleKind::Ip;
    }
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    let only_separators = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+'));
    if digits >= PHONE_MIN_DIGITS && only_separators {
        return SampleKind::PhoneLike;
    }
    SampleKind::Generic
}

pub fn choose_strategy(dataset: &Dataset, column: &str) -> Strategy {
    let tokens = Tokens::identifier(column);
    if tokens.matches_any(DEDICATED_COLUMN_KEYWORDS) {
        return Strategy::WholeCell;
    }
    if tokens.matches_any(MIXED_COLUMN_KEYWORDS) {
        return Strategy::PatternSubstitution;
    }
    let Some(idx) = dataset.column_index(column) else {
        return Strategy::WholeCell;
    };
    let kinds = dataset
        .column_cells(idx)
        .flatten()
        .take(MAX_STRATEGY_SAMPLES)
        .map(|value| classify_sample(&value.as_display()))
        .collect::<HashSet<_>>();
    debug!("Column '{column}' sample kinds: {kinds:?}");
    if kinds.len() <= 1 {
        Strategy::WholeCell
    } else {
        Strategy::PatternSubstitution
    }
}

/// Applies the replacement to a copy of `source`. Missing columns are skipped;
/// a column that fails keeps its original values and reports zero changes.
pub fn apply_replacements(
    source: &Dataset,
    pattern: &Regex,
    replacement: &str,
    target_columns: &[String],
) -> ReplacementResult {
    let mut dataset = source.clone();
    let mut stats = ReplacementStats::new();
    let mut strategies = BTreeMap::new();

    for column in target_columns {
        let Some(idx) = dataset.column_index(column) else {
            debug!("Skipping column '{column}' not present in dataset");
            continue;
        };
        let strategy = choose_strategy(source, column);
        let outcome = match strategy {
            Strategy::WholeCell => Ok(replace_whole_cells(dataset.rows_mut(), idx, replacement)),
            Strategy::PatternSubstitution => {
                substitute_pattern(column, dataset.rows_mut(), idx, pattern, replacement)
            }
        };
        let changed = outcome.unwrap_or_else(|err| {
            warn!("{err}; leaving column '{column}' unchanged");
            0
        });
        info!("Column '{column}': {strategy:?}, {changed} cell(s) changed");
        stats.insert(column.clone(), changed);
        strategies.insert(column.clone(), strategy);
    }

    ReplacementResult {
        dataset,
        stats,
        strategies,
    }
}

/// Replaces every non-null, non-empty cell. Whitespace-only cells count as values.
fn replace_whole_cells(rows: &mut [Vec<Cell>], idx: usize, replacement: &str) -> usize {
    let mut changed = 0usize;
    for cell in rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
        let Some(value) = cell.as_ref() else {
            continue;
        };
        if value.as_display().is_empty() {
            continue;
        }
        if matches!(value, CellValue::Text(current) if current.as_str() == replacement) {
            continue;
        }
        *cell = Some(CellValue::Text(replacement.to_string()));
        changed += 1;
    }
    changed
}

fn substitute_pattern(
    column: &str,
    rows: &mut [Vec<Cell>],
    idx: usize,
    pattern: &Regex,
    replacement: &str,
) -> Result<usize, ReplacementError> {
    let mut updates = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let Some(value) = row.get(idx).and_then(Option::as_ref) else {
            continue;
        };
        if let CellValue::Error(code) = value {
            return Err(ReplacementError::UnsupportedValue {
                column: column.to_string(),
                row: row_idx,
                value: code.clone(),
            });
        }
        let text = value.as_display();
        let replaced = pattern.replace_all(&text, NoExpand(replacement));
        if replaced != text.as_str() {
            updates.push((row_idx, replaced.into_owned()));
        }
    }
    let changed = updates.len();
    for (row_idx, text) in updates {
        if let Some(cell) = rows.get_mut(row_idx).and_then(|row| row.get_mut(idx)) {
            *cell = Some(CellValue::Text(text));
        }
    }
    Ok(changed)
}
