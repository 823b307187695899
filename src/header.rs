//! Header row detection.
//!
//! Messy exports bury the real header under title banners, blank spacer rows,
//! or disclaimers. The detector scores each of the first few physical rows by
//! how many distinct canonical fields its cells resolve to through the alias
//! table and picks the best one.

use crate::fields::{AliasTable, Field};

/// A row must resolve at least this many distinct fields before it is
/// trusted as the header; below that the sheet defaults to row 0.
const MIN_HEADER_MATCHES: usize = 2;
/// Rows with fewer populated cells than this are spacer/banner rows.
const MIN_POPULATED_CELLS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct HeaderScan {
    pub index: usize,
    pub matches: usize,
    /// False when no row cleared the match threshold and the index is only
    /// the row-0 default. The pipeline widens the content heuristic to every
    /// row in that case.
    pub confident: bool,
}

pub fn detect_header_row(rows: &[Vec<String>], aliases: &AliasTable, max_scan: usize) -> HeaderScan {
    let mut best_index = 0usize;
    let mut best_matches = 0usize;

    for (index, row) in rows.iter().take(max_scan).enumerate() {
        let populated = row.iter().filter(|cell| !cell.trim().is_empty()).count();
        if populated < MIN_POPULATED_CELLS {
            continue;
        }
        let matches = count_field_matches(row, aliases);
        if matches > best_matches {
            best_matches = matches;
            best_index = index;
        }
    }

    let confident = best_matches >= MIN_HEADER_MATCHES;
    HeaderScan {
        index: if confident { best_index } else { 0 },
        matches: best_matches,
        confident,
    }
}

/// Distinct canonical fields matched anywhere in the row. Counting fields
/// rather than cells keeps a row of repeated "id" cells from outscoring a
/// genuine header.
fn count_field_matches(row: &[String], aliases: &AliasTable) -> usize {
    Field::ALL
        .into_iter()
        .filter(|field| row.iter().any(|cell| aliases.accepts(*field, cell)))
        .count()
}
