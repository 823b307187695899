use std::fmt::Write as _;

use crate::record::Loaner;

const LISTING_HEADERS: [&str; 7] = [
    "identifier",
    "full_name",
    "mobile_number",
    "national_id",
    "total_amount",
    "land_description",
    "description",
];

pub fn render_loaners(records: &[Loaner]) -> String {
    let headers: Vec<String> = LISTING_HEADERS.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = records.iter().map(loaner_cells).collect();
    render_table(&headers, &rows)
}

pub fn print_loaners(records: &[Loaner]) {
    print!("{}", render_loaners(records));
}

fn loaner_cells(record: &Loaner) -> Vec<String> {
    vec![
        record.identifier.clone(),
        record.full_name.clone().unwrap_or_default(),
        record.mobile_number.clone().unwrap_or_default(),
        record.national_id.clone().unwrap_or_default(),
        record.total_amount.map(format_amount).unwrap_or_default(),
        record.land_description.clone().unwrap_or_default(),
        record.description.clone().unwrap_or_default(),
    ]
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        amount.to_string()
    }
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator_cells = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let mut cell = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(cell.chars().count());
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect()
}
