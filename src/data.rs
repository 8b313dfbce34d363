use std::{collections::HashSet, fmt};

use chrono::NaiveDateTime;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

/// A single non-null cell. Nulls are represented by `None` in [`Cell`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// Workbook error cell such as `#DIV/0!`.
    Error(String),
}

pub type Cell = Option<CellValue>;

impl CellValue {
    pub fn as_display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Boolean(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Error(code) => code.clone(),
        }
    }

    /// Numeric, boolean and temporal cells do not count towards a textual column.
    pub fn is_numeric_or_temporal(&self) -> bool {
        matches!(
            self,
            CellValue::Integer(_)
                | CellValue::Float(_)
                | CellValue::Boolean(_)
                | CellValue::DateTime(_)
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Text(s) | CellValue::Error(s) => serde_json::Value::String(s.clone()),
            CellValue::Integer(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Boolean(b) => serde_json::Value::Bool(*b),
            CellValue::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Ordered columns by ordered rows. Every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    /// First `n` rows as a new dataset.
    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Row cells rendered as strings, nulls as empty strings.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(CellValue::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// Serialises as a list of records (`[{column: value, ...}, ...]`) in column order.
impl Serialize for Dataset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                columns: &self.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            let value = cell
                .as_ref()
                .map(CellValue::to_json)
                .unwrap_or(serde_json::Value::Null);
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Makes raw header names usable as keys: blank names become `Unnamed: {idx}`
/// and repeated names get `.1`, `.2`, ... suffixes.
pub fn unique_column_names<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();
    for (idx, name) in raw.into_iter().enumerate() {
        let trimmed = name.as_ref().trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            trimmed.to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 0usize;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{base}.{suffix}");
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_column_names_suffixes_duplicates_and_fills_blanks() {
        let names = unique_column_names(["email", "", "email", "email", " name "]);
        assert_eq!(names, vec!["email", "Unnamed: 1", "email.1", "email.2", "name"]);
    }

    #[test]
    fn float_display_drops_integral_fraction() {
        assert_eq!(CellValue::Float(3.0).as_display(), "3");
        assert_eq!(CellValue::Float(2.5).as_display(), "2.5");
    }

    #[test]
    fn dataset_pads_short_rows() {
        let dataset = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![Some(CellValue::Integer(1))]],
        );
        assert_eq!(dataset.rows()[0].len(), 2);
        assert!(dataset.rows()[0][1].is_none());
    }

    #[test]
    fn dataset_serializes_as_records_in_column_order() {
        let dataset = Dataset::new(
            vec!["b".into(), "a".into()],
            vec![vec![Some(CellValue::Text("x".into())), None]],
        );
        let json = serde_json::to_string(&dataset).unwrap();
        assert_eq!(json, r#"[{"b":"x","a":null}]"#);
    }
}
