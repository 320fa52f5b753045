//! Plain-text table rendering.
//!
//! Produces an aligned table without an index column: every column is as
//! wide as its widest value, values are right-aligned and columns are
//! separated by a single space.

use crate::models::query::{Cell, ResultSet};

/// Renders a result set as an aligned plain-text table.
pub fn render(result: &ResultSet) -> String {
    let header: Vec<String> = result.columns.iter().map(|c| escape(c)).collect();
    let body: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            (0..header.len())
                .map(|index| row.get(index).map(render_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(index, name)| {
            body.iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    std::iter::once(&header)
        .chain(body.iter())
        .map(|line| format_line(line, &widths))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_cell(cell: &Cell) -> String {
    escape(&cell.to_string())
}

fn escape(value: &str) -> String {
    value
        .replace('\r', "\\r")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let padding = width - value.chars().count();
            format!("{}{}", " ".repeat(padding), value)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
