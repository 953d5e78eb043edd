// 📦 Batch scoring - CSV of applicants in, CSV of predictions out

use crate::features::FeatureDeriver;
use crate::model::Classifier;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{Read, Write};

#[derive(Debug, Serialize)]
struct BatchRow {
    row: usize,
    prediction: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub scored: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn summary(&self) -> String {
        format!("{} scored, {} failed", self.scored, self.failed)
    }
}

/// Turn one CSV record into the JSON object the deriver expects.
///
/// Empty cells are left out so they surface as missing fields; cells that
/// are not numbers stay strings and surface as type errors.
fn record_to_json(headers: &csv::StringRecord, record: &csv::StringRecord) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, cell) in headers.iter().zip(record.iter()) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        // "inf" and "NaN" parse as f64 but have no JSON number form
        let value = match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::from(n),
            _ => Value::String(cell.to_string()),
        };
        map.insert(name.trim().to_string(), value);
    }
    map
}

/// Score every row; a bad row is reported in the output and does not stop the batch
pub fn score_csv<R: Read, W: Write>(
    input: R,
    output: W,
    deriver: &FeatureDeriver,
    model: &dyn Classifier,
) -> Result<BatchSummary> {
    let mut reader = csv::Reader::from_reader(input);
    let mut writer = csv::Writer::from_writer(output);
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    let mut summary = BatchSummary::default();

    for (i, record) in reader.records().enumerate() {
        let outcome = match record {
            Ok(record) => {
                let body = Value::Object(record_to_json(&headers, &record));
                deriver
                    .derive_json(&body)
                    .and_then(|row| model.predict(&row))
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("unreadable row: {}", e)),
        };

        let row = match outcome {
            Ok(prediction) => {
                summary.scored += 1;
                BatchRow { row: i + 1, prediction: Some(prediction), error: None }
            }
            Err(error) => {
                summary.failed += 1;
                BatchRow { row: i + 1, prediction: None, error: Some(error) }
            }
        };
        writer.serialize(row).context("Failed to write CSV output")?;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
