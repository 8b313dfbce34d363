use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::PreviewArgs,
    columns::textual_columns,
    data::Dataset,
    error::LoadError,
    loader::{TabularSource, load_dataset},
    table,
};

/// First rows of a file plus the column classification a caller needs to
/// choose what to redact.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub preview_data: Dataset,
    pub columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub total_rows: usize,
}

pub fn preview(source: &TabularSource, rows: usize) -> Result<Preview, LoadError> {
    let dataset = load_dataset(source)?;
    Ok(Preview {
        preview_data: dataset.head(rows),
        columns: dataset.columns().to_vec(),
        text_columns: textual_columns(&dataset),
        total_rows: dataset.row_count(),
    })
}

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let source = crate::source_from_args(&args.input)?;
    let preview =
        preview(&source, args.rows).with_context(|| format!("Previewing {:?}", source.path))?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&preview).context("Serializing preview")?;
        println!("{rendered}");
    } else {
        table::print_table(&preview.columns, &preview.preview_data.display_rows());
        println!();
        println!("Text columns: {}", preview.text_columns.join(", "));
    }
    info!(
        "Displayed {} of {} row(s) from {:?}",
        preview.preview_data.row_count(),
        preview.total_rows,
        source.path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::loader::SourceFormat;

    #[test]
    fn preview_reports_total_rows_and_text_columns() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        writeln!(file, "id,email\n1,a@x.com\n2,b@x.com\n3,c@x.com").expect("write csv");

        let source = TabularSource::new(file.path(), SourceFormat::Csv);
        let preview = preview(&source, 2).expect("preview");
        assert_eq!(preview.total_rows, 3);
        assert_eq!(preview.preview_data.row_count(), 2);
        assert_eq!(preview.columns, vec!["id", "email"]);
        assert_eq!(preview.text_columns, vec!["email"]);
    }
}
