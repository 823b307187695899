//! Column mapping: alias-driven header matching with a content-based
//! fallback.
//!
//! The direct path resolves header cells through the [`AliasTable`]. When too
//! few fields resolve that way, the content heuristic samples cell values
//! column by column and scores them against field-specific predicates, then
//! assigns greedily from the highest score down so no column serves two
//! fields.

use std::{collections::BTreeMap, sync::OnceLock};

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::{
    fields::{AliasTable, Field},
    validate::{digits_only, parse_amount},
};

/// Minimum fraction of sampled cells that must satisfy a field's predicate
/// before a column is eligible for that field.
const CONTENT_SCORE_THRESHOLD: f64 = 0.5;
/// Free text shorter than this never counts as a description.
const DESCRIPTION_MIN_LENGTH: usize = 15;
const NAME_MAX_WORDS: usize = 4;
const NAME_MAX_LENGTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    DirectHeader,
    ContentHeuristic,
}

impl MappingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingSource::DirectHeader => "direct_header",
            MappingSource::ContentHeuristic => "content_heuristic",
        }
    }
}

/// Assignment of canonical fields to source column indices. Each field and
/// each column appears at most once.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    assignments: BTreeMap<Field, usize>,
}

impl ColumnMap {
    /// Claim a (field, column) pair; returns false when either side is
    /// already taken.
    pub fn assign(&mut self, field: Field, column: usize) -> bool {
        if self.assignments.contains_key(&field) || self.assignments.values().any(|c| *c == column)
        {
            return false;
        }
        self.assignments.insert(field, column);
        true
    }

    pub fn from_pairs<I>(pairs: I) -> ColumnMap
    where
        I: IntoIterator<Item = (Field, usize)>,
    {
        let mut map = ColumnMap::default();
        for (field, column) in pairs {
            map.assign(field, column);
        }
        map
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        self.assignments.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Mapped fields other than the identifier; the identifier alone cannot
    /// produce usable rows since it is auto-generated anyway.
    pub fn content_fields(&self) -> usize {
        self.assignments
            .keys()
            .filter(|field| **field != Field::Identifier)
            .count()
    }

    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.assignments.contains_key(field))
            .collect()
    }

    /// Reduce a source row to the canonical field set. Cells outside the
    /// assignments are dropped, so downstream stages only ever see the seven
    /// canonical fields.
    pub fn extract(&self, row: &[String]) -> RawRow {
        let mut raw = RawRow::default();
        for (field, column) in &self.assignments {
            if let Some(cell) = row.get(*column) {
                raw.insert(*field, cell.clone());
            }
        }
        raw
    }
}

/// An untyped row already reduced to canonical fields. Empty cells are
/// treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    values: BTreeMap<Field, String>,
}

impl RawRow {
    pub fn insert(&mut self, field: Field, value: String) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.values.insert(field, trimmed.to_string());
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Direct mapping: each header cell resolves to at most one field through the
/// alias table (first matching field in declaration order); the first column
/// to claim a field keeps it.
pub fn map_by_header(headers: &[String], aliases: &AliasTable) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (index, header) in headers.iter().enumerate() {
        if let Some(field) = aliases.field_for(header) {
            map.assign(field, index);
        }
    }
    map
}

/// Content fallback: sample up to `sample_rows` non-empty cells per column,
/// score every (field, column) pair by predicate match fraction, and assign
/// greedily in descending score order (ties: field declaration order, then
/// column index).
pub fn map_by_content(rows: &[Vec<String>], column_count: usize, sample_rows: usize) -> ColumnMap {
    let mut scores: Vec<(Field, usize, f64)> = Vec::new();
    for column in 0..column_count {
        let sample: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(String::as_str)
            .filter(|cell| !cell.trim().is_empty())
            .take(sample_rows.max(1))
            .collect();
        if sample.is_empty() {
            continue;
        }
        for field in Field::ALL {
            let matching = sample
                .iter()
                .filter(|cell| matches_predicate(field, cell))
                .count();
            let score = matching as f64 / sample.len() as f64;
            if score >= CONTENT_SCORE_THRESHOLD {
                scores.push((field, column, score));
            }
        }
    }

    scores.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.rank().cmp(&b.0.rank()))
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut map = ColumnMap::default();
    for (field, column, score) in scores {
        if map.assign(field, column) {
            debug!("Content heuristic assigned {field} to column {column} (score {score:.2})");
        }
    }
    map
}

fn matches_predicate(field: Field, cell: &str) -> bool {
    match field {
        Field::Identifier => identifier_like(cell),
        Field::FullName => name_like(cell),
        Field::MobileNumber => {
            let digits = digits_only(cell);
            digits.len() == 10 && matches!(digits.as_bytes()[0], b'6'..=b'9')
        }
        Field::NationalId => digits_only(cell).len() == 12,
        Field::TotalAmount => amount_like(cell),
        Field::LandDescription => land_pattern().is_match(cell),
        Field::Description => description_like(cell),
    }
}

fn land_pattern() -> &'static Regex {
    static LAND: OnceLock<Regex> = OnceLock::new();
    LAND.get_or_init(|| Regex::new(r"(?i)\b(acres?|hectares?|ha)\b").expect("land unit pattern"))
}

fn code_pattern() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^[A-Za-z]{1,5}[-_ ]?[0-9]+$").expect("identifier pattern"))
}

/// Short application codes ("LN-42") or small serial integers.
fn identifier_like(cell: &str) -> bool {
    let trimmed = cell.trim();
    if code_pattern().is_match(trimmed) {
        return true;
    }
    trimmed.parse::<u64>().is_ok_and(|n| n > 0 && n < 10_000)
}

/// Amounts carry a fractional part or sit at loan-sized magnitudes; this
/// keeps serial-number columns from scoring as amounts.
fn amount_like(cell: &str) -> bool {
    parse_amount(cell).is_some_and(|n| n.fract() != 0.0 || n.abs() >= 1000.0)
}

fn name_like(cell: &str) -> bool {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.len() >= NAME_MAX_LENGTH {
        return false;
    }
    let words = trimmed.split_whitespace().count();
    (1..=NAME_MAX_WORDS).contains(&words)
        && trimmed
            .chars()
            .all(|ch| ch.is_alphabetic() || ch == ' ' || ch == '.')
}

fn description_like(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.len() >= DESCRIPTION_MIN_LENGTH
        && !land_pattern().is_match(trimmed)
        && digits_only(trimmed).len() != 12
        && parse_amount(trimmed).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn direct_mapping_resolves_aliased_headers() {
        let map = map_by_header(
            &headers(&["Loaner ID", "Customer Name", "Phone No", "Aadhaar", "Loan Amount"]),
            &AliasTable::default(),
        );
        assert_eq!(map.column(Field::Identifier), Some(0));
        assert_eq!(map.column(Field::FullName), Some(1));
        assert_eq!(map.column(Field::MobileNumber), Some(2));
        assert_eq!(map.column(Field::NationalId), Some(3));
        assert_eq!(map.column(Field::TotalAmount), Some(4));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn first_column_keeps_a_twice_claimed_field() {
        let map = map_by_header(&headers(&["id", "loaner_id"]), &AliasTable::default());
        assert_eq!(map.column(Field::Identifier), Some(0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unmatched_headers_stay_unresolved() {
        let map = map_by_header(&headers(&["loaner_id", "zodiac sign"]), &AliasTable::default());
        assert!(map.unresolved().contains(&Field::FullName));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn twelve_digit_columns_map_to_national_id() {
        let rows = grid(&[
            &["123456789012", "Asha Devi"],
            &["987654321098", "Ravi Kumar"],
        ]);
        let map = map_by_content(&rows, 2, 50);
        assert_eq!(map.column(Field::NationalId), Some(0));
        assert_eq!(map.column(Field::FullName), Some(1));
    }

    #[test]
    fn acreage_columns_map_to_land_description() {
        let rows = grid(&[&["5 acres"], &["2 hectare"], &["3 ha"]]);
        let map = map_by_content(&rows, 1, 50);
        assert_eq!(map.column(Field::LandDescription), Some(0));
    }

    #[test]
    fn mobile_columns_require_a_valid_prefix() {
        let rows = grid(&[&["9876543210", "1234567890"], &["8765432109", "0123456789"]]);
        let map = map_by_content(&rows, 2, 50);
        assert_eq!(map.column(Field::MobileNumber), Some(0));
        assert_eq!(map.column(Field::NationalId), None);
    }

    #[test]
    fn serial_integers_map_to_identifier_not_amount() {
        let rows = grid(&[
            &["1", "12000", "Crop loan for the kharif season"],
            &["2", "8500.50", "Drip irrigation equipment purchase"],
        ]);
        let map = map_by_content(&rows, 3, 50);
        assert_eq!(map.column(Field::Identifier), Some(0));
        assert_eq!(map.column(Field::TotalAmount), Some(1));
        assert_eq!(map.column(Field::Description), Some(2));
    }

    #[test]
    fn application_codes_score_as_identifiers() {
        let rows = grid(&[&["LN-101"], &["LN-102"], &["LN 103"]]);
        let map = map_by_content(&rows, 1, 50);
        assert_eq!(map.column(Field::Identifier), Some(0));
    }

    #[test]
    fn one_column_never_serves_two_fields() {
        // A lone 12-digit column is both the best national-id and the only
        // candidate column; nothing else may claim it afterwards.
        let rows = grid(&[&["123456789012"], &["234567890123"]]);
        let map = map_by_content(&rows, 1, 50);
        assert_eq!(map.column(Field::NationalId), Some(0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn gibberish_columns_stay_unmapped() {
        let rows = grid(&[&["###", "@@"], &["%%%", "!!"]]);
        let map = map_by_content(&rows, 2, 50);
        assert!(map.is_empty());
    }

    #[test]
    fn sampling_cap_is_honored() {
        let mut rows = vec![vec!["123456789012".to_string()]; 5];
        rows.extend(vec![vec!["not an id".to_string()]; 100]);
        // Sampling only the first few rows sees a clean national-id column.
        let map = map_by_content(&rows, 1, 5);
        assert_eq!(map.column(Field::NationalId), Some(0));
    }

    #[test]
    fn extract_reduces_rows_to_assigned_fields() {
        let map = ColumnMap::from_pairs([(Field::Identifier, 0), (Field::FullName, 2)]);
        let row = headers(&["7", "ignored", "Asha", "also ignored"]);
        let raw = map.extract(&row);
        assert_eq!(raw.get(Field::Identifier), Some("7"));
        assert_eq!(raw.get(Field::FullName), Some("Asha"));
        assert_eq!(raw.get(Field::Description), None);
    }

    #[test]
    fn from_pairs_drops_conflicting_claims() {
        let map = ColumnMap::from_pairs([
            (Field::Identifier, 0),
            (Field::FullName, 0),
            (Field::Description, 3),
        ]);
        assert_eq!(map.column(Field::Identifier), Some(0));
        assert_eq!(map.column(Field::FullName), None);
        assert_eq!(map.column(Field::Description), Some(3));
    }
}
