use serde::{Deserialize, Serialize};

/// A row of the `loaners` table, the only persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loaner {
    pub identifier: String,
    pub full_name: Option<String>,
    pub mobile_number: Option<String>,
    pub national_id: Option<String>,
    pub total_amount: Option<f64>,
    pub land_description: Option<String>,
    pub description: Option<String>,
}

/// Sort key for natural identifier order: identifiers that parse entirely as
/// a non-negative integer come first in numeric order (raw string breaks
/// ties between forms like "7" and "007"), everything else follows
/// lexicographically. Avoids the lexicographic trap of "10" before "2".
fn natural_key(identifier: &str) -> (u8, u128, String) {
    let trimmed = identifier.trim();
    match trimmed.parse::<u128>() {
        Ok(numeric) => (0, numeric, trimmed.to_string()),
        Err(_) => (1, 0, trimmed.to_string()),
    }
}

pub fn sort_natural(records: &mut [Loaner]) {
    records.sort_by(|a, b| natural_key(&a.identifier).cmp(&natural_key(&b.identifier)));
}
