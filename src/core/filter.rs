use crate::domain::model::{CanonicalColumn, Cell, DateRange, NormalizedTable};
use crate::utils::error::{DashboardError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a date cell, dropping any time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Every row's date, in row order; `None` for a blank cell. Fails on the
/// first value that is present but unparseable.
fn row_dates(table: &NormalizedTable) -> Result<Vec<Option<NaiveDate>>> {
    if !table.is_resolved(CanonicalColumn::Date) {
        return Err(DashboardError::MissingColumnError {
            column: CanonicalColumn::Date.to_string(),
        });
    }
    let index = table
        .table()
        .column_index(CanonicalColumn::Date.as_str())
        .ok_or_else(|| DashboardError::MissingColumnError {
            column: CanonicalColumn::Date.to_string(),
        })?;

    table
        .table()
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let text = match &cells[index] {
                Cell::Null => return Ok(None),
                Cell::String(s) => s.clone(),
                other => other.to_string(),
            };
            parse_date(&text)
                .map(Some)
                .ok_or(DashboardError::InvalidDateError {
                    row: row + 1,
                    value: text,
                })
        })
        .collect()
}

/// Keeps rows whose date lies in `range`, both ends inclusive. Rows with a
/// blank date are never in range.
pub fn filter_by_date(table: &NormalizedTable, range: DateRange) -> Result<NormalizedTable> {
    let dates = row_dates(table)?;
    let mut dates = dates.into_iter();
    let filtered = table
        .table()
        .retain_rows(|_| dates.next().flatten().is_some_and(|d| range.contains(d)));

    tracing::debug!(
        %range,
        kept = filtered.len(),
        total = table.table().len(),
        "Filtered rows by date"
    );
    Ok(table.with_table(filtered))
}

/// Earliest and latest date in the table, `None` when no row has a date.
pub fn date_bounds(table: &NormalizedTable) -> Result<Option<DateRange>> {
    let dates: Vec<NaiveDate> = row_dates(table)?.into_iter().flatten().collect();
    Ok(dates
        .iter()
        .min()
        .zip(dates.iter().max())
        .map(|(start, end)| DateRange {
            start: *start,
            end: *end,
        }))
}
