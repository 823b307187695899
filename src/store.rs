//! SQLite persistence for loaner records.
//!
//! Repository-style access over a `sqlx` pool. The insert path runs each row
//! inside its own savepoint nested in one batch transaction: a duplicate
//! identifier or a constraint failure rolls back that row alone and the rest
//! of the batch continues.

use std::str::FromStr;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use sqlx::{
    Acquire, Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::record::{self, Loaner};

/// The identifier length cap matches the legacy ledger's VARCHAR(50) key and
/// gives over-long identifiers a deterministic per-row failure.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS loaners (
    identifier TEXT PRIMARY KEY CHECK (length(identifier) <= 50),
    full_name TEXT,
    mobile_number TEXT,
    national_id TEXT,
    total_amount REAL,
    land_description TEXT,
    description TEXT
)";

pub struct Store {
    pool: SqlitePool,
}

#[derive(Debug, Default)]
pub struct InsertSummary {
    pub inserted: usize,
    pub duplicates_skipped: usize,
    pub failures: Vec<RowFailure>,
    /// First few successfully inserted rows, for the report preview.
    pub preview: Vec<Loaner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub identifier: String,
    pub reason: String,
}

impl Store {
    /// Accepts either a `sqlite:` connection URL or a bare filesystem path.
    pub async fn connect(database: &str) -> Result<Self> {
        let options = if database.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database)
                .with_context(|| format!("Parsing database URL '{database}'"))?
        } else {
            SqliteConnectOptions::new().filename(database)
        }
        .create_if_missing(true);
        // One connection: pooled `sqlite::memory:` connections would each
        // see their own empty database, and inserts are sequential anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Connecting to database '{database}'"))?;
        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Bootstrapping loaners table")?;
        Ok(Store { pool })
    }

    /// Insert rows in input order, one savepoint per row. Duplicates and
    /// per-row persistence errors are tallied, never propagated.
    pub async fn insert_all(
        &self,
        records: &[Loaner],
        preview_limit: usize,
    ) -> Result<InsertSummary> {
        let mut summary = InsertSummary::default();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Opening batch transaction")?;

        for record in records {
            let mut savepoint = tx.begin().await.context("Opening row savepoint")?;
            match insert_row(&mut savepoint, record).await {
                Ok(()) => {
                    savepoint.commit().await.context("Committing row savepoint")?;
                    summary.inserted += 1;
                    if summary.preview.len() < preview_limit {
                        summary.preview.push(record.clone());
                    }
                }
                Err(err) if is_unique_violation(&err) => {
                    savepoint
                        .rollback()
                        .await
                        .context("Rolling back duplicate row")?;
                    debug!("Skipping duplicate identifier '{}'", record.identifier);
                    summary.duplicates_skipped += 1;
                }
                Err(err) => {
                    savepoint
                        .rollback()
                        .await
                        .context("Rolling back failed row")?;
                    warn!("Row '{}' failed to insert: {err}", record.identifier);
                    summary.failures.push(RowFailure {
                        identifier: record.identifier.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tx.commit().await.context("Committing batch transaction")?;
        Ok(summary)
    }

    /// Every persisted record in natural identifier order: numeric
    /// identifiers ascending, then everything else lexicographically.
    pub async fn select_all(&self) -> Result<Vec<Loaner>> {
        let mut records: Vec<Loaner> = sqlx::query_as(
            "SELECT identifier, full_name, mobile_number, national_id,
                    total_amount, land_description, description
             FROM loaners",
        )
        .fetch_all(&self.pool)
        .await
        .context("Fetching loaner records")?;
        record::sort_natural(&mut records);
        Ok(records)
    }
}

async fn insert_row(
    tx: &mut Transaction<'_, Sqlite>,
    record: &Loaner,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO loaners (identifier, full_name, mobile_number, national_id,
                              total_amount, land_description, description)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.identifier)
    .bind(&record.full_name)
    .bind(&record.mobile_number)
    .bind(&record.national_id)
    .bind(record.total_amount)
    .bind(&record.land_description)
    .bind(&record.description)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
