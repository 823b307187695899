//! Raw spreadsheet loading: uploaded bytes to an untyped string grid.
//!
//! XLSX workbooks are read through `calamine` from an in-memory cursor;
//! anything else is treated as delimited text, decoded as UTF-8 with a
//! Windows-1252 fallback. Only the first worksheet of a workbook is used.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use encoding_rs::{UTF_8, WINDOWS_1252};
use log::debug;

use crate::ingest::IngestError;

const XLSX_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

#[derive(Debug, Clone)]
pub struct Sheet {
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn from_bytes(bytes: &[u8], name_hint: Option<&str>) -> Result<Self, IngestError> {
        if bytes.is_empty() {
            return Err(IngestError::EmptyInput);
        }
        let raw_rows = if bytes.starts_with(&XLSX_MAGIC) {
            read_workbook(bytes)?
        } else {
            read_delimited(bytes, name_hint)?
        };
        let rows: Vec<Vec<String>> = raw_rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        if rows.is_empty() {
            return Err(IngestError::UnreadableFormat(
                "no tabular content".to_string(),
            ));
        }
        debug!("Loaded sheet with {} non-empty row(s)", rows.len());
        Ok(Sheet { rows })
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, IngestError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|err| IngestError::UnreadableFormat(format!("not a readable workbook: {err}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::UnreadableFormat("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| IngestError::UnreadableFormat(format!("unreadable sheet: {err}")))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Integral floats render without the trailing `.0` so that identifier and
/// phone columns exported as numerics survive the round trip as digit
/// strings.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn read_delimited(bytes: &[u8], name_hint: Option<&str>) -> Result<Vec<Vec<String>>, IngestError> {
    if bytes.contains(&0) {
        return Err(IngestError::UnreadableFormat(
            "binary content is not tabular data".to_string(),
        ));
    }
    let (text, _, had_errors) = UTF_8.decode(bytes);
    let text = if had_errors {
        let (fallback, _, fallback_errors) = WINDOWS_1252.decode(bytes);
        if fallback_errors {
            return Err(IngestError::UnreadableFormat(
                "undecodable text encoding".to_string(),
            ));
        }
        fallback
    } else {
        text
    };

    let delimiter = resolve_delimiter(&text, name_hint);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|err| IngestError::UnreadableFormat(format!("malformed delimited row: {err}")))?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

fn resolve_delimiter(text: &str, name_hint: Option<&str>) -> u8 {
    if let Some(name) = name_hint
        && name.to_ascii_lowercase().ends_with(".tsv")
    {
        return b'\t';
    }
    let first_line = text.lines().next().unwrap_or("");
    if first_line.matches('\t').count() > first_line.matches(',').count() {
        b'\t'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_is_empty_input() {
        assert!(matches!(
            Sheet::from_bytes(b"", None),
            Err(IngestError::EmptyInput)
        ));
    }

    #[test]
    fn csv_bytes_parse_into_rows() {
        let sheet = Sheet::from_bytes(b"id,name\n1,Asha\n2,Ravi\n", Some("loans.csv"))
            .expect("csv parses");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1], vec!["1", "Asha"]);
    }

    #[test]
    fn tsv_extension_forces_tab_delimiter() {
        let sheet =
            Sheet::from_bytes(b"id\tname\n1\tAsha\n", Some("loans.tsv")).expect("tsv parses");
        assert_eq!(sheet.rows[0], vec!["id", "name"]);
    }

    #[test]
    fn tab_heavy_first_line_is_sniffed_without_hint() {
        let sheet = Sheet::from_bytes(b"id\tname\tamount\n1\tAsha\t5000\n", None)
            .expect("sniffed tsv parses");
        assert_eq!(sheet.rows[0].len(), 3);
    }

    #[test]
    fn all_empty_rows_are_dropped() {
        let sheet = Sheet::from_bytes(b",,\n,,\nid,name,amount\n", None).expect("parses");
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn truncated_zip_is_unreadable() {
        let mut bytes = XLSX_MAGIC.to_vec();
        bytes.extend_from_slice(b"garbage");
        assert!(matches!(
            Sheet::from_bytes(&bytes, Some("broken.xlsx")),
            Err(IngestError::UnreadableFormat(_))
        ));
    }

    #[test]
    fn nul_bytes_are_unreadable() {
        assert!(matches!(
            Sheet::from_bytes(b"a,b\x00c\n", None),
            Err(IngestError::UnreadableFormat(_))
        ));
    }

    #[test]
    fn windows_1252_bytes_decode_via_fallback() {
        // 0xE9 is "é" in Windows-1252 and invalid as a lone UTF-8 byte.
        let sheet = Sheet::from_bytes(b"name\ncaf\xe9\n", None).expect("fallback decodes");
        assert_eq!(sheet.rows[1][0], "caf\u{e9}");
    }

    #[test]
    fn integral_floats_lose_the_trailing_zero() {
        assert_eq!(cell_to_string(&Data::Float(123.0)), "123");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
    }
}
