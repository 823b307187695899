//! The ingest pipeline: uploaded bytes to persisted, reported rows.
//!
//! Stages run in order: sheet load, header detection, direct column mapping,
//! fallback inference (remote suggestion when configured, content heuristic
//! otherwise), per-row cleaning, duplicate-safe insertion, natural-order
//! readback. File-level and mapping-level problems abort before any row is
//! attempted; row-level problems only ever cost that row.

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    advisor::MappingAdvisor,
    fields::{AliasTable, Field},
    header,
    mapping::{self, ColumnMap, MappingSource},
    record::Loaner,
    sheet::Sheet,
    store::{RowFailure, Store},
    validate::RowValidator,
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("uploaded file is empty")]
    EmptyInput,
    #[error("input is not readable tabular data: {0}")]
    UnreadableFormat(String),
    #[error(
        "columns could not be mapped to the loaner schema; unresolved: {}",
        .unresolved.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
    )]
    MappingFailure { unresolved: Vec<Field> },
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Fields a direct header mapping (or a remote suggestion) must resolve
    /// before it is trusted without falling back to the content heuristic.
    pub minimum_required_fields: usize,
    /// Non-empty cells sampled per column by the content heuristic.
    pub sample_rows: usize,
    /// Physical rows scanned for the header.
    pub header_scan_rows: usize,
    pub preview_rows: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            minimum_required_fields: 4,
            sample_rows: 50,
            header_scan_rows: 10,
            preview_rows: 3,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub status: &'static str,
    pub mapping_source: MappingSource,
    pub rows_inserted: usize,
    pub duplicates_skipped: usize,
    pub failed_rows: usize,
    pub total_processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RowFailure>,
    pub preview: Vec<Loaner>,
    pub data: Vec<Loaner>,
}

pub async fn ingest_bytes(
    bytes: &[u8],
    name_hint: Option<&str>,
    store: &Store,
    aliases: &AliasTable,
    advisor: &MappingAdvisor,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let sheet = Sheet::from_bytes(bytes, name_hint)?;
    let scan = header::detect_header_row(&sheet.rows, aliases, options.header_scan_rows);
    let headers = &sheet.rows[scan.index];
    let body = &sheet.rows[scan.index + 1..];

    let direct = mapping::map_by_header(headers, aliases);
    let (column_map, mapping_source, data_rows) = if direct.len()
        >= options.minimum_required_fields
    {
        debug!(
            "Direct header mapping matched {} field(s) on row {}",
            direct.len(),
            scan.index
        );
        (direct, MappingSource::DirectHeader, body)
    } else {
        // Without a confident header row there is no reason to sacrifice
        // row 0 to a header that probably is not one.
        let data_rows: &[Vec<String>] = if scan.confident { body } else { &sheet.rows };
        let map = match suggest_remote(advisor, headers, data_rows, sheet.column_count(), options)
            .await
        {
            Some(map) => map,
            None => mapping::map_by_content(data_rows, sheet.column_count(), options.sample_rows),
        };
        if map.content_fields() == 0 {
            return Err(IngestError::MappingFailure {
                unresolved: map.unresolved(),
            }
            .into());
        }
        (map, MappingSource::ContentHeuristic, data_rows)
    };

    let validator = RowValidator::new()?;
    let batch_tag = batch_tag();
    let mut records: Vec<Loaner> = Vec::new();
    let mut failures: Vec<RowFailure> = Vec::new();

    for (position, row) in data_rows.iter().enumerate() {
        let raw = column_map.extract(row);
        if raw.is_empty() {
            continue;
        }
        let cleaned = validator.clean(&raw);
        if !cleaned.has_content() {
            failures.push(RowFailure {
                identifier: cleaned
                    .identifier
                    .clone()
                    .unwrap_or_else(|| format!("row {}", position + 1)),
                reason: "no usable content fields after cleaning".to_string(),
            });
            continue;
        }
        let identifier = cleaned
            .identifier
            .clone()
            .unwrap_or_else(|| format!("AUTO{batch_tag}{:04}", records.len() + 1));
        records.push(cleaned.into_loaner(identifier));
    }

    let summary = store.insert_all(&records, options.preview_rows).await?;
    let data = store.select_all().await?;

    failures.extend(summary.failures);
    let failed_rows = failures.len();
    let total_processed = summary.inserted + summary.duplicates_skipped + failed_rows;
    info!(
        "Ingest complete via {}: {} inserted, {} duplicate(s) skipped, {} failed",
        mapping_source.as_str(),
        summary.inserted,
        summary.duplicates_skipped,
        failed_rows
    );

    Ok(IngestReport {
        status: "success",
        mapping_source,
        rows_inserted: summary.inserted,
        duplicates_skipped: summary.duplicates_skipped,
        failed_rows,
        total_processed,
        failures,
        preview: summary.preview,
        data,
    })
}

async fn suggest_remote(
    advisor: &MappingAdvisor,
    headers: &[String],
    rows: &[Vec<String>],
    column_count: usize,
    options: &IngestOptions,
) -> Option<ColumnMap> {
    let MappingAdvisor::Available(classifier) = advisor else {
        return None;
    };
    match classifier.suggest_mapping(headers, rows, column_count).await {
        Ok(map) if map.len() >= options.minimum_required_fields => {
            debug!("Remote classifier resolved {} field(s)", map.len());
            Some(map)
        }
        Ok(map) => {
            debug!(
                "Remote suggestion resolved only {} field(s); using the content heuristic",
                map.len()
            );
            None
        }
        Err(err) => {
            warn!("Mapping classifier unavailable: {err:#}");
            None
        }
    }
}

/// Per-upload tag keeping auto-generated identifiers unique across batches.
fn batch_tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
