//! Reads vendor CSV exports whose real header row may sit below a few banner rows.

use crate::domain::model::{Cell, Table};
use crate::utils::error::{DashboardError, Result};
use std::collections::HashSet;
use thiserror::Error;

/// Header offsets tried are `0..MAX_HEADER_OFFSETS`. More banner rows than
/// that is unrecoverable.
pub const MAX_HEADER_OFFSETS: usize = 5;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Why a single header offset was rejected.
#[derive(Debug, Error)]
pub enum OffsetRejection {
    #[error("structural parse error: {0}")]
    Malformed(#[from] csv::Error),

    #[error("record {record} has {found} fields but the header has {expected}")]
    TooManyFields {
        record: usize,
        found: usize,
        expected: usize,
    },

    #[error("no data rows below the header")]
    Empty,
}

/// Tries header offsets `0..MAX_HEADER_OFFSETS` in order and returns the first
/// table that parses cleanly and has at least one data row.
pub fn read_csv_with_offset_detection(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    for offset in 0..MAX_HEADER_OFFSETS {
        match read_at_offset(bytes, offset) {
            Ok(table) => {
                tracing::debug!(
                    offset,
                    rows = table.len(),
                    columns = table.columns().len(),
                    "Header row detected"
                );
                return Ok(table);
            }
            Err(reason) => {
                tracing::debug!(offset, %reason, "Rejected header offset");
            }
        }
    }

    Err(DashboardError::UnreadableTableError {
        attempts: MAX_HEADER_OFFSETS,
    })
}

/// Parses `bytes` treating line `offset` (0-based) as the header row.
///
/// Short records are padded with nulls; a record longer than the header
/// rejects the offset.
pub fn read_at_offset(bytes: &[u8], offset: usize) -> std::result::Result<Table, OffsetRejection> {
    let input = skip_lines(bytes, offset);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > width {
            return Err(OffsetRejection::TooManyFields {
                record: i + 1,
                found: record.len(),
                expected: width,
            });
        }
        let mut row: Vec<Cell> = record.iter().map(infer_cell).collect();
        row.resize(width, Cell::Null);
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(OffsetRejection::Empty);
    }

    Ok(Table::new(dedupe_headers(headers), rows))
}

fn skip_lines(bytes: &[u8], count: usize) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..count {
        match rest.iter().position(|&b| b == b'\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return &[],
        }
    }
    rest
}

/// Repeated names become `name.1`, `name.2`, ... in order of appearance.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let mut candidate = header.clone();
        let mut suffix = 1;
        while used.contains(&candidate) {
            candidate = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        used.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

fn infer_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Cell::from(n);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Cell::Number(n);
        }
    }
    Cell::String(raw.to_string())
}
