use std::borrow::Cow;
use std::fmt::Write as _;

use crate::engine::QueryResult;

const ROW_NUMBER_HEADER: &str = "#";
const NULL_DISPLAY: &str = "NULL";

/// Renders a query result as an aligned text table with 1-based row numbers.
pub fn render_result(result: &QueryResult) -> String {
    let mut headers = Vec::with_capacity(result.columns.len() + 1);
    headers.push(ROW_NUMBER_HEADER.to_string());
    headers.extend(result.columns.iter().cloned());

    let rows = result
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut cells = Vec::with_capacity(row.len() + 1);
            cells.push((idx + 1).to_string());
            cells.extend(
                row.iter()
                    .map(|cell| cell.as_deref().unwrap_or(NULL_DISPLAY).to_string()),
            );
            cells
        })
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
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

pub fn print_result(result: &QueryResult) {
    print!("{}", render_result(result));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>();
    cells.join(" | ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_numbered_rows_and_nulls() {
        let result = QueryResult {
            columns: vec!["c1".into(), "name".into()],
            rows: vec![
                vec![Some("1".into()), Some("apple".into())],
                vec![Some("22".into()), None],
            ],
        };
        let rendered = render_result(&result);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "# | c1 | name");
        assert_eq!(lines[1], "- | -- | -----");
        assert_eq!(lines[2], "1 | 1  | apple");
        assert_eq!(lines[3], "2 | 22 | NULL");
    }

    #[test]
    fn flattens_control_characters() {
        assert_eq!(sanitize_cell("a\nb\tc"), "a b c");
    }
}
