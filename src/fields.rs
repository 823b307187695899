//! Canonical field set and the header alias table.
//!
//! The seven [`Field`]s are the only columns the pipeline ever persists.
//! [`AliasTable`] maps each field to the set of header spellings accepted as
//! that field; it is built once at startup (built-in defaults, optionally
//! overridden from a YAML file) and never mutated afterwards.

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Identifier,
    FullName,
    MobileNumber,
    NationalId,
    TotalAmount,
    LandDescription,
    Description,
}

impl Field {
    /// Declaration order doubles as the tie-break order everywhere a header
    /// or column could match more than one field.
    pub const ALL: [Field; 7] = [
        Field::Identifier,
        Field::FullName,
        Field::MobileNumber,
        Field::NationalId,
        Field::TotalAmount,
        Field::LandDescription,
        Field::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Identifier => "identifier",
            Field::FullName => "full_name",
            Field::MobileNumber => "mobile_number",
            Field::NationalId => "national_id",
            Field::TotalAmount => "total_amount",
            Field::LandDescription => "land_description",
            Field::Description => "description",
        }
    }

    pub fn rank(&self) -> usize {
        Field::ALL.iter().position(|f| f == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_header(value);
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown canonical field '{value}'"))
    }
}

/// Normalize a header cell for alias lookup: trim, lowercase, collapse every
/// run of non-alphanumeric characters into a single underscore.
pub fn normalize_header(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    normalized
}

#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: BTreeMap<Field, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let spellings: [(Field, &[&str]); 7] = [
            (
                Field::Identifier,
                &["loaner_id", "loanerid", "id", "app_id", "application_id"],
            ),
            (
                Field::FullName,
                &["fullname", "name", "customer_name", "applicant_name"],
            ),
            (
                Field::MobileNumber,
                &["mobile_no", "mobile", "phone", "phone_no", "contact_no"],
            ),
            (
                Field::NationalId,
                &["aadhar", "aadhaar", "adhar_no", "aadhar_no", "loaner_aadhar"],
            ),
            (
                Field::TotalAmount,
                &["amount", "loan_amount", "total_loan_amount", "sanctioned_amount"],
            ),
            (
                Field::LandDescription,
                &["total_land", "land", "land_size", "land_area", "land_holding"],
            ),
            (
                Field::Description,
                &["purpose", "remarks", "loan_purpose", "notes"],
            ),
        ];
        let aliases = spellings
            .into_iter()
            .map(|(field, accepted)| {
                let mut entries = vec![field.as_str().to_string()];
                entries.extend(accepted.iter().map(|s| s.to_string()));
                (field, entries)
            })
            .collect();
        AliasTable { aliases }
    }
}

impl AliasTable {
    /// Load an alias override file: a YAML map from canonical field name to a
    /// list of accepted header spellings. Fields absent from the file keep
    /// their built-in spellings.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading alias file {path:?}"))?;
        let parsed: BTreeMap<String, Vec<String>> =
            serde_yaml::from_str(&raw).context("Parsing alias YAML")?;
        let mut table = AliasTable::default();
        for (name, spellings) in parsed {
            let field = Field::from_str(&name)
                .with_context(|| format!("Alias file {path:?} names an unknown field"))?;
            let mut entries = vec![field.as_str().to_string()];
            entries.extend(spellings.iter().map(|s| normalize_header(s)));
            table.aliases.insert(field, entries);
        }
        Ok(table)
    }

    pub fn accepts(&self, field: Field, header: &str) -> bool {
        let normalized = normalize_header(header);
        if normalized.is_empty() || normalized.starts_with("unnamed") {
            return false;
        }
        self.aliases
            .get(&field)
            .is_some_and(|entries| entries.iter().any(|alias| *alias == normalized))
    }

    /// Resolve a header cell to a canonical field. Alias sets are designed
    /// disjoint; on overlap the first field in declaration order wins.
    pub fn field_for(&self, header: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|field| self.accepts(*field, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_header_collapses_separators() {
        assert_eq!(normalize_header("  Loaner ID  "), "loaner_id");
        assert_eq!(normalize_header("Mobile-No."), "mobile_no");
        assert_eq!(normalize_header("TOTAL__AMOUNT"), "total_amount");
        assert_eq!(normalize_header("$$$"), "");
    }

    #[test]
    fn default_table_accepts_known_spellings() {
        let table = AliasTable::default();
        assert_eq!(table.field_for("Loaner ID"), Some(Field::Identifier));
        assert_eq!(table.field_for("AADHAAR"), Some(Field::NationalId));
        assert_eq!(table.field_for("Phone No"), Some(Field::MobileNumber));
        assert_eq!(table.field_for("land size"), Some(Field::LandDescription));
        assert_eq!(table.field_for("unrelated"), None);
    }

    #[test]
    fn canonical_names_always_accepted() {
        let table = AliasTable::default();
        for field in Field::ALL {
            assert_eq!(table.field_for(field.as_str()), Some(field));
        }
    }

    #[test]
    fn unnamed_pandas_columns_are_ignored() {
        let table = AliasTable::default();
        assert_eq!(table.field_for("Unnamed: 3"), None);
    }

    #[test]
    fn overlapping_aliases_resolve_by_declaration_order() {
        let table = AliasTable::default();
        // "id" belongs to the identifier set; identifier is declared first.
        assert_eq!(table.field_for("ID"), Some(Field::Identifier));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("aliases.yml");
        std::fs::write(&path, "not_a_field:\n  - whatever\n").expect("write aliases");
        assert!(AliasTable::load(&path).is_err());
    }

    #[test]
    fn load_overrides_single_field() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("aliases.yml");
        std::fs::write(&path, "national_id:\n  - UID Number\n").expect("write aliases");
        let table = AliasTable::load(&path).expect("load aliases");
        assert_eq!(table.field_for("uid number"), Some(Field::NationalId));
        // Built-in spellings for untouched fields survive.
        assert_eq!(table.field_for("loaner_id"), Some(Field::Identifier));
        // Overridden field drops its previous extra spellings.
        assert_eq!(table.field_for("aadhar"), None);
    }
}
