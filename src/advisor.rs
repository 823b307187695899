//! Optional remote mapping classifier.
//!
//! Modeled as a capability: [`MappingAdvisor::Available`] wraps a configured
//! HTTP client, [`MappingAdvisor::Unavailable`] short-circuits. Failures are
//! returned as errors for the pipeline to log and absorb; the classifier can
//! never abort an ingest.

use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;

use crate::{fields::Field, mapping::ColumnMap};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Rows shipped to the classifier as context; more adds latency, not signal.
const SAMPLE_LIMIT: usize = 5;

pub enum MappingAdvisor {
    Available(RemoteClassifier),
    Unavailable,
}

impl MappingAdvisor {
    pub fn from_config(url: Option<String>, token: Option<String>) -> Self {
        match url {
            Some(url) if !url.trim().is_empty() => MappingAdvisor::Available(RemoteClassifier {
                client: reqwest::Client::new(),
                url,
                token,
            }),
            _ => MappingAdvisor::Unavailable,
        }
    }
}

pub struct RemoteClassifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct SuggestionRequest<'a> {
    fields: Vec<&'static str>,
    headers: &'a [String],
    sample_rows: &'a [Vec<String>],
}

impl RemoteClassifier {
    /// Ask the remote service for a field-to-column assignment. The service
    /// answers `{"mapping": {"<field>": <column-index>}}`; a JSON body
    /// wrapped in a string or markdown code fences is tolerated.
    pub async fn suggest_mapping(
        &self,
        headers: &[String],
        rows: &[Vec<String>],
        column_count: usize,
    ) -> Result<ColumnMap> {
        let sample: Vec<Vec<String>> = rows.iter().take(SAMPLE_LIMIT).cloned().collect();
        let payload = SuggestionRequest {
            fields: Field::ALL.iter().map(Field::as_str).collect(),
            headers,
            sample_rows: &sample,
        };
        let mut request = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.context("Calling mapping classifier")?;
        let response = response
            .error_for_status()
            .context("Mapping classifier returned an error status")?;
        let body: Value = response
            .json()
            .await
            .context("Decoding classifier response")?;
        parse_suggestion(&body, column_count)
    }
}

fn parse_suggestion(body: &Value, column_count: usize) -> Result<ColumnMap> {
    let body: Value = match body {
        Value::String(text) => serde_json::from_str(strip_code_fences(text))
            .context("Classifier returned a non-JSON string")?,
        other => other.clone(),
    };
    let mapping = body
        .get("mapping")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("Classifier response lacks a mapping object"))?;

    let mut pairs = Vec::new();
    for (name, value) in mapping {
        let field = Field::from_str(name)?;
        let column = value
            .as_u64()
            .ok_or_else(|| anyhow!("Column index for '{name}' is not an integer"))?
            as usize;
        if column >= column_count {
            return Err(anyhow!("Column index {column} for '{name}' is out of range"));
        }
        pairs.push((field, column));
    }
    pairs.sort_by_key(|(field, _)| field.rank());
    Ok(ColumnMap::from_pairs(pairs))
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```")
        .map(|rest| rest.strip_prefix("json").unwrap_or(rest))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
