use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

/// Cells wider than this are cut and suffixed with `...` in rendered tables.
pub const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| display_cell(header).chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_cell(cell).chars().count());
        }
    }

    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, &width)| {
            let cell = values.get(idx).map(|v| display_cell(v)).unwrap_or_default();
            format!("{cell:<width$}")
        })
        .join("  ");
    line.trim_end().to_string()
}

/// Flattens control whitespace and truncates long values for display.
fn display_cell(value: &str) -> Cow<'_, str> {
    let needs_flatten = value.contains(['\n', '\r', '\t']);
    let too_wide = value.chars().count() > MAX_CELL_WIDTH;
    if !needs_flatten && !too_wide {
        return Cow::Borrowed(value);
    }
    let mut cell: String = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect();
    if too_wide {
        cell = cell.chars().take(MAX_CELL_WIDTH - 3).collect();
        cell.push_str("...");
    }
    Cow::Owned(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn pads_columns_to_widest_cell() {
        let rendered = render_table(
            &strings(&["#", "source column"]),
            &[strings(&["1", "ID"]), strings(&["2", "Email"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "#    source column");
        assert_eq!(lines[1], "---  -------------");
        assert_eq!(lines[2], "1    ID");
        assert_eq!(lines[3], "2    Email");
    }

    #[test]
    fn flattens_newlines_and_truncates_long_values() {
        let long = "x".repeat(60);
        let rendered = render_table(&strings(&["note"]), &[strings(&["a\nb"]), vec![long]]);
        assert!(rendered.contains("a b"));
        let truncated = format!("{}...", "x".repeat(MAX_CELL_WIDTH - 3));
        assert!(rendered.lines().any(|line| line == truncated));
    }

    #[test]
    fn short_rows_render_blank_cells() {
        let rendered = render_table(&strings(&["a", "b"]), &[strings(&["1"])]);
        assert_eq!(rendered.lines().nth(2), Some("1"));
    }
}
