use crate::domain::model::{NormalizedTable, ProcessedTable, Table};
use crate::utils::error::{DashboardError, Result};

/// Reduces a normalized table to `campaign, impression, reach, clicks,
/// conversion`, in that order.
///
/// The check runs against the columns the normalizer reports as resolved; the
/// first missing one is named in the error.
pub fn project(table: &NormalizedTable) -> Result<ProcessedTable> {
    if let Some(missing) = ProcessedTable::COLUMNS
        .iter()
        .find(|c| !table.is_resolved(**c))
    {
        return Err(DashboardError::MissingColumnError {
            column: missing.to_string(),
        });
    }

    let indices = ProcessedTable::COLUMNS
        .iter()
        .map(|c| {
            table
                .table()
                .column_index(c.as_str())
                .ok_or_else(|| DashboardError::PipelineError {
                    message: format!("column '{}' resolved but not present in table", c),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<Vec<_>> = table
        .table()
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    let columns: Vec<String> = ProcessedTable::COLUMNS
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();

    Ok(ProcessedTable::new(Table::new(columns, rows)))
}
