use std::borrow::Cow;
use std::fmt::Write as _;

/// Cells wider than this are cut and end with `…`.
pub const DEFAULT_MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>], max_cell_width: usize) -> String {
    let column_count = headers.len();
    let fit = |value: &str| clip(&sanitize_cell(value), max_cell_width).into_owned();
    let headers = headers.iter().map(|h| fit(h.as_str())).collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| row.iter().take(column_count).map(|c| fit(c.as_str())).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows, DEFAULT_MAX_CELL_WIDTH));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let padding = width.saturating_sub(display_width(value));
            format!("{value}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn clip(value: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 || display_width(value) <= max_width {
        return Cow::Borrowed(value);
    }
    let mut clipped = value.chars().take(max_width.saturating_sub(1)).collect::<String>();
    clipped.push('…');
    Cow::Owned(clipped)
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
