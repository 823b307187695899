//! Per-row validation and cleaning.
//!
//! Rules are applied independently per field: a value that fails its
//! constraint is nulled, never bounced back to the caller. A row only dies
//! here when nothing usable is left after cleaning.

use anyhow::{Context, Result};
use regex::Regex;

use crate::{fields::Field, mapping::RawRow, record::Loaner};

/// Compiled validation patterns, built once at startup and shared read-only
/// by the pipeline.
#[derive(Debug)]
pub struct RowValidator {
    mobile: Regex,
    national_id: Regex,
}

impl RowValidator {
    pub fn new() -> Result<Self> {
        Ok(RowValidator {
            mobile: Regex::new(r"^[6-9][0-9]{9}$").context("Compiling mobile number pattern")?,
            national_id: Regex::new(r"^[0-9]{12}$")
                .context("Compiling national id pattern")?,
        })
    }

    pub fn clean(&self, raw: &RawRow) -> CleanedRow {
        CleanedRow {
            identifier: raw
                .get(Field::Identifier)
                .map(normalize_identifier)
                .filter(|id| !id.is_empty()),
            full_name: raw.get(Field::FullName).map(str::to_string),
            mobile_number: raw
                .get(Field::MobileNumber)
                .map(digits_only)
                .filter(|digits| self.mobile.is_match(digits)),
            national_id: raw
                .get(Field::NationalId)
                .map(digits_only)
                .filter(|digits| self.national_id.is_match(digits)),
            total_amount: raw.get(Field::TotalAmount).and_then(parse_amount),
            land_description: raw.get(Field::LandDescription).map(str::to_string),
            description: raw.get(Field::Description).map(str::to_string),
        }
    }
}

/// A validated row awaiting an identifier. Conversion to [`Loaner`] happens
/// once the pipeline has settled the identifier (source value or
/// auto-generated).
#[derive(Debug, Clone, Default)]
pub struct CleanedRow {
    pub identifier: Option<String>,
    pub full_name: Option<String>,
    pub mobile_number: Option<String>,
    pub national_id: Option<String>,
    pub total_amount: Option<f64>,
    pub land_description: Option<String>,
    pub description: Option<String>,
}

impl CleanedRow {
    /// True when at least one content field survived cleaning. The
    /// identifier does not count: it is recoverable by auto-generation,
    /// content is not.
    pub fn has_content(&self) -> bool {
        self.full_name.is_some()
            || self.mobile_number.is_some()
            || self.national_id.is_some()
            || self.total_amount.is_some()
            || self.land_description.is_some()
            || self.description.is_some()
    }

    pub fn into_loaner(self, identifier: String) -> Loaner {
        Loaner {
            identifier,
            full_name: self.full_name,
            mobile_number: self.mobile_number,
            national_id: self.national_id,
            total_amount: self.total_amount,
            land_description: self.land_description,
            description: self.description,
        }
    }
}

pub(crate) fn digits_only(value: &str) -> String {
    value.chars().filter(|ch| ch.is_ascii_digit()).collect()
}

/// Numeric conversion for amounts: thousands separators are tolerated,
/// anything else nulls the field.
pub(crate) fn parse_amount(value: &str) -> Option<f64> {
    let stripped: String = value
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Spreadsheet exports often round-trip integer identifiers through floats,
/// leaving a trailing ".0"; strip it so "42.0" and "42" collide as intended.
fn normalize_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if let Some((integral, fraction)) = trimmed.split_once('.')
        && !integral.is_empty()
        && integral.chars().all(|ch| ch.is_ascii_digit())
        && !fraction.is_empty()
        && fraction.chars().all(|ch| ch == '0')
    {
        return integral.to_string();
    }
    trimmed.to_string()
}
