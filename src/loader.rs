//! Reads an uploaded CSV or Excel file into a [`Dataset`].
//!
//! CSV columns are typed as a whole: a column becomes integer, float or
//! boolean only when every non-null value parses as such, otherwise all of
//! its values stay text. Workbook cells keep the type the workbook stored.
//! Failures never yield a partial dataset.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use calamine::{Data, DataType, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;

use crate::{
    data::{Cell, CellValue, Dataset, unique_column_names},
    error::LoadError,
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Excel,
}

impl SourceFormat {
    pub fn from_tag(tag: &str) -> Result<Self, LoadError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Ok(SourceFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "excel" => Ok(SourceFormat::Excel),
            _ => Err(LoadError::UnknownFormat(tag.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| LoadError::UndetectedFormat(path.to_path_buf()))
            .and_then(Self::from_tag)
    }
}

impl FromStr for SourceFormat {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => f.write_str("csv"),
            SourceFormat::Excel => f.write_str("excel"),
        }
    }
}

/// A stored file plus everything needed to parse it.
#[derive(Debug, Clone)]
pub struct TabularSource {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Worksheet name or 0-based index; first sheet when unset.
    pub sheet: Option<String>,
}

impl TabularSource {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
            delimiter: None,
            encoding: UTF_8,
            sheet: None,
        }
    }

    /// Builds a source whose format is taken from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let format = SourceFormat::from_path(&path)?;
        Ok(Self::new(path, format))
    }

    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }
}

pub fn load_dataset(source: &TabularSource) -> Result<Dataset, LoadError> {
    let dataset = match source.format {
        SourceFormat::Csv => load_csv(source)?,
        SourceFormat::Excel => load_excel(source)?,
    };
    info!(
        "Loaded {} row(s) x {} column(s) from {:?} ({})",
        dataset.row_count(),
        dataset.columns().len(),
        source.path,
        source.format
    );
    Ok(dataset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn load_csv(source: &TabularSource) -> Result<Dataset, LoadError> {
    let path = &source.path;
    let csv_error = |err: csv::Error| LoadError::Csv {
        path: path.clone(),
        source: err,
    };
    let delimiter = io_utils::resolve_input_delimiter(path, source.delimiter);
    let mut reader =
        io_utils::open_csv_reader_from_path(path, delimiter).map_err(|err| LoadError::Io {
            path: path.clone(),
            source: err,
        })?;
    let header_record = reader.byte_headers().map_err(csv_error)?.clone();
    let headers = io_utils::decode_headers(&header_record, source.encoding).ok_or(
        LoadError::Encoding {
            path: path.clone(),
            encoding: source.encoding.name(),
            row: 1,
        },
    )?;
    let columns = unique_column_names(&headers);

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for (ordinal, record) in reader.byte_records().enumerate() {
        let record = record.map_err(csv_error)?;
        let decoded =
            io_utils::decode_record(&record, source.encoding).ok_or(LoadError::Encoding {
                path: path.clone(),
                encoding: source.encoding.name(),
                row: ordinal + 2,
            })?;
        raw_rows.push(
            decoded
                .into_iter()
                .map(|value| (!is_null_token(&value)).then_some(value))
                .collect(),
        );
    }

    let kinds = (0..columns.len())
        .map(|idx| {
            infer_column_kind(
                raw_rows
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(|v| v.as_deref())),
            )
        })
        .collect_vec();
    debug!(
        "CSV column kinds: {}",
        columns
            .iter()
            .zip(&kinds)
            .map(|(name, kind)| format!("{name}={kind:?}"))
            .join(", ")
    );

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(idx, value)| {
                    let kind = kinds.get(idx).copied().unwrap_or(ColumnKind::Text);
                    value.map(|text| typed_cell(text, kind))
                })
                .collect::<Vec<Cell>>()
        })
        .collect();
    Ok(Dataset::new(columns, rows))
}

fn load_excel(source: &TabularSource) -> Result<Dataset, LoadError> {
    let path = &source.path;
    let workbook_error = |err: calamine::Error| LoadError::Workbook {
        path: path.clone(),
        message: err.to_string(),
    };
    let missing_sheet = |sheet: &str| LoadError::MissingSheet {
        path: path.clone(),
        sheet: sheet.to_string(),
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match source.sheet.as_deref() {
        Some(selector) => match selector.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| missing_sheet(selector))?
                .map_err(workbook_error)?,
            Err(_) => workbook
                .worksheet_range(selector)
                .map_err(|_| missing_sheet(selector))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| missing_sheet("0"))?
            .map_err(workbook_error)?,
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Dataset::default());
    };
    let columns = unique_column_names(header_row.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }));
    let body = rows
        .map(|row| row.iter().map(excel_cell).collect::<Vec<Cell>>())
        .collect();
    Ok(Dataset::new(columns, body))
}

fn excel_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => None,
        Data::String(s) if is_null_token(s) => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Int(i) => Some(CellValue::Integer(*i)),
        Data::Float(f) => Some(CellValue::Float(*f)),
        Data::Bool(b) => Some(CellValue::Boolean(*b)),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(
            data.as_datetime()
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(data.to_string())),
        ),
        Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(err) => Some(CellValue::Error(err.to_string())),
    }
}

/// Tokens read as missing values, compared case-insensitively after trimming.
fn is_null_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    value.is_empty() || matches!(lowered.as_str(), "na" | "n/a" | "#n/a" | "null" | "nan" | "none")
}

fn infer_column_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut integer = true;
    let mut float = true;
    let mut boolean = true;
    let mut any = false;
    for value in values {
        any = true;
        let trimmed = value.trim();
        integer &= trimmed.parse::<i64>().is_ok();
        float &= trimmed.parse::<f64>().is_ok();
        boolean &= parse_boolean(trimmed).is_some();
        if !integer && !float && !boolean {
            return ColumnKind::Text;
        }
    }
    if !any {
        ColumnKind::Text
    } else if integer {
        ColumnKind::Integer
    } else if float {
        ColumnKind::Float
    } else if boolean {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

fn parse_boolean(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn typed_cell(text: String, kind: ColumnKind) -> CellValue {
    let trimmed = text.trim();
    let parsed = match kind {
        ColumnKind::Integer => trimmed.parse().ok().map(CellValue::Integer),
        ColumnKind::Float => trimmed.parse().ok().map(CellValue::Float),
        ColumnKind::Boolean => parse_boolean(trimmed).map(CellValue::Boolean),
        ColumnKind::Text => None,
    };
    parsed.unwrap_or(CellValue::Text(text))
}
