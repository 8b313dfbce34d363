//! Textual column detection and per-column sampling.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    data::{CellValue, Dataset},
    loader::load_dataset,
    table,
};

pub const MAX_ORACLE_SAMPLES: usize = 3;

/// Column name to up to [`MAX_ORACLE_SAMPLES`] stringified non-null values.
pub type ColumnSamples = BTreeMap<String, Vec<String>>;

/// Columns holding at least one non-null value that are not uniformly
/// numeric, boolean or temporal, in dataset order.
pub fn textual_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            let mut non_null = dataset.column_cells(*idx).flatten().peekable();
            non_null.peek().is_some() && !non_null.all(CellValue::is_numeric_or_temporal)
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Up to `limit` stringified non-null values of `column`, in row order.
/// Absent columns yield an empty list.
pub fn column_samples(dataset: &Dataset, column: &str, limit: usize) -> Vec<String> {
    let Some(idx) = dataset.column_index(column) else {
        return Vec::new();
    };
    dataset
        .column_cells(idx)
        .flatten()
        .map(CellValue::as_display)
        .take(limit)
        .collect()
}

/// Sample map used to ground the oracle prompt. Columns missing from the
/// dataset are skipped.
pub fn sample_columns(dataset: &Dataset, columns: &[String]) -> ColumnSamples {
    columns
        .iter()
        .filter(|column| dataset.column_index(column).is_some())
        .map(|column| {
            (
                column.clone(),
                column_samples(dataset, column, MAX_ORACLE_SAMPLES),
            )
        })
        .collect()
}

/// Lists every column with its text classification and a few samples.
pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let source = crate::source_from_args(&args.input)?;
    let dataset =
        load_dataset(&source).with_context(|| format!("Loading {:?}", source.path))?;
    let text_columns = textual_columns(&dataset);

    let headers = vec![
        "#".to_string(),
        "name".to_string(),
        "text".to_string(),
        "samples".to_string(),
    ];
    let rows = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            vec![
                (idx + 1).to_string(),
                name.clone(),
                if text_columns.contains(name) { "yes" } else { "no" }.to_string(),
                column_samples(&dataset, name, MAX_ORACLE_SAMPLES).join(" | "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "{} column(s), {} of them text, in {:?}",
        dataset.columns().len(),
        text_columns.len(),
        source.path
    );
    Ok(())
}
