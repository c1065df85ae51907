//! Rent roll ingestion
//!
//! Parses the property-management CSV export (or pre-cleaned JSONL) into
//! `NewUnitRecord`s and bulk-loads them into a store.
//!
//! CSV export quirks handled here:
//! - an optional leading empty column
//! - a repeated `Unit,Name,...` header row anywhere in the file
//! - monetary cells like `"$1,664.36"`

use crate::error::QueryServiceError;
use crate::models::NewUnitRecord;
use crate::store::RentRollStore;
use crate::Result;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Columns in export order, after the optional leading empty column
const CSV_COLUMNS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Csv,
    Jsonl,
}

impl InputFormat {
    /// Guess from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "jsonl" | "ndjson" => Some(InputFormat::Jsonl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub failed: usize,
}

//
// ================= Parsing =================
//

pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<NewUnitRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let line = index + 1;

        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let offset = match row.len() {
            n if n > CSV_COLUMNS => 1,
            CSV_COLUMNS => 0,
            n => {
                return Err(QueryServiceError::IngestError(format!(
                    "line {}: expected {} columns, found {}",
                    line, CSV_COLUMNS, n
                )))
            }
        };

        let cell = |column: usize| row.get(column + offset).unwrap_or("");

        if cell(0).eq_ignore_ascii_case("unit") {
            continue;
        }

        records.push(csv_record(&row, offset, line)?);
    }

    Ok(records)
}

fn csv_record(row: &StringRecord, offset: usize, line: usize) -> Result<NewUnitRecord> {
    let cell = |column: usize| row.get(column + offset).unwrap_or("");
    let optional = |column: usize| {
        let value = cell(column);
        (!value.is_empty()).then(|| value.to_string())
    };

    let square_feet = match cell(3).replace(',', "") {
        raw if raw.is_empty() => 0,
        raw => raw.parse().map_err(|_| {
            QueryServiceError::IngestError(format!("line {}: invalid sq_ft {:?}", line, raw))
        })?,
    };

    Ok(NewUnitRecord {
        unit: cell(0).to_string(),
        name: optional(1),
        unit_type: optional(2),
        square_feet,
        billed_amount: parse_money(cell(4), "autobill", line)?,
        deposit: parse_money(cell(5), "deposit", line)?,
        moved_in_date: optional(6),
        lease_end_date: optional(7),
        status: cell(8).to_string(),
    })
}

/// Keep only digits and `.`; an empty cell is zero.
fn parse_money(raw: &str, field: &str, line: usize) -> Result<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Ok(0.0);
    }

    cleaned.parse().map_err(|_| {
        QueryServiceError::IngestError(format!("line {}: invalid {} {:?}", line, field, raw))
    })
}

pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<Vec<NewUnitRecord>> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).map_err(|e| {
            QueryServiceError::IngestError(format!("line {}: {}", index + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

pub fn read_file(path: &Path, format: InputFormat) -> Result<Vec<NewUnitRecord>> {
    let file = File::open(path)?;
    match format {
        InputFormat::Csv => parse_csv(file),
        InputFormat::Jsonl => parse_jsonl(BufReader::new(file)),
    }
}

//
// ================= Loading =================
//

/// Insert every record, counting failures instead of aborting on them.
pub async fn load_records(
    store: &dyn RentRollStore,
    records: &[NewUnitRecord],
) -> Result<IngestReport> {
    store.ready().await?;

    let mut report = IngestReport::default();
    for record in records {
        match store.insert(record).await {
            Ok(_) => report.inserted += 1,
            Err(e) => {
                warn!(unit = %record.unit, error = %e, "Failed to insert rent roll row");
                report.failed += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        failed = report.failed,
        "Rent roll load complete"
    );

    log_summary(store).await;

    Ok(report)
}

async fn log_summary(store: &dyn RentRollStore) {
    match store.summary_statistics().await {
        Ok(stats) => info!(
            total_units = stats.total_units,
            occupied_units = stats.occupied_units,
            vacant_units = stats.vacant_units,
            occupancy_rate = %stats
                .occupancy_rate()
                .map(|rate| format!("{:.2}%", rate))
                .unwrap_or_else(|| "n/a".to_string()),
            total_potential_rent = %format!("{:.2}", stats.total_potential_rent),
            total_actual_rent = %format!("{:.2}", stats.total_actual_rent),
            avg_occupied_rent = %stats
                .avg_occupied_rent
                .map(|avg| format!("{:.2}", avg))
                .unwrap_or_else(|| "n/a".to_string()),
            "Summary statistics"
        ),
        Err(e) => warn!(error = %e, "Could not compute summary statistics"),
    }
}
