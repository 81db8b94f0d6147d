use crate::utils::error::{DashboardError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single cell: text, number, or null for an empty field.
pub type Cell = serde_json::Value;

/// Ordered columns plus ordered rows; every row has one cell per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub(crate) fn rename_column(&mut self, index: usize, name: &str) {
        self.columns[index] = name.to_string();
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub(crate) fn retain_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Each row as a JSON object keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, Cell>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_to_string))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DashboardError::PipelineError {
                message: format!("CSV writer flush failed: {}", e),
            })?;
        String::from_utf8(bytes).map_err(|e| DashboardError::PipelineError {
            message: format!("CSV output is not UTF-8: {}", e),
        })
    }
}

pub fn cell_to_string(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    Campaign,
    Impression,
    Reach,
    Clicks,
    Conversion,
    Spend,
    Sent,
    Opened,
    OpenRate,
    ClickRate,
    Date,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 11] = [
        Self::Campaign,
        Self::Impression,
        Self::Reach,
        Self::Clicks,
        Self::Conversion,
        Self::Spend,
        Self::Sent,
        Self::Opened,
        Self::OpenRate,
        Self::ClickRate,
        Self::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Impression => "impression",
            Self::Reach => "reach",
            Self::Clicks => "clicks",
            Self::Conversion => "conversion",
            Self::Spend => "spend",
            Self::Sent => "sent",
            Self::Opened => "opened",
            Self::OpenRate => "open_rate",
            Self::ClickRate => "click_rate",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalColumn {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DashboardError::ConfigError {
                message: format!("Unknown canonical column: {}", s),
            })
    }
}

/// A table after header normalization, with the canonical columns it resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    table: Table,
    /// canonical column -> source header it was renamed from
    resolved: BTreeMap<CanonicalColumn, String>,
}

impl NormalizedTable {
    pub(crate) fn new(table: Table, resolved: BTreeMap<CanonicalColumn, String>) -> Self {
        Self { table, resolved }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn resolved(&self) -> &BTreeMap<CanonicalColumn, String> {
        &self.resolved
    }

    pub fn is_resolved(&self, column: CanonicalColumn) -> bool {
        self.resolved.contains_key(&column)
    }

    /// Source header that was mapped onto `column`, if any.
    pub fn source_header(&self, column: CanonicalColumn) -> Option<&str> {
        self.resolved.get(&column).map(String::as_str)
    }

    pub(crate) fn with_table(&self, table: Table) -> Self {
        Self {
            table,
            resolved: self.resolved.clone(),
        }
    }
}

/// Inclusive calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Checked constructor for callers; the range filter itself does not
    /// re-check ordering.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidConfigValueError {
                field: "date_range".to_string(),
                value: format!("{}..{}", start, end),
                reason: "start date must not be after end date".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// One grouped bar: a campaign and its four metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignBar {
    pub campaign: String,
    pub impression: Option<f64>,
    pub reach: Option<f64>,
    pub clicks: Option<f64>,
    pub conversion: Option<f64>,
}

/// The five-column table handed to the chart and table displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedTable {
    table: Table,
}

impl ProcessedTable {
    pub const COLUMNS: [CanonicalColumn; 5] = [
        CanonicalColumn::Campaign,
        CanonicalColumn::Impression,
        CanonicalColumn::Reach,
        CanonicalColumn::Clicks,
        CanonicalColumn::Conversion,
    ];

    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Chart input: one bar group per row, metrics that are not numeric are `None`.
    pub fn chart_series(&self) -> Vec<CampaignBar> {
        self.table
            .rows()
            .iter()
            .map(|row| CampaignBar {
                campaign: cell_to_string(&row[0]),
                impression: row[1].as_f64(),
                reach: row[2].as_f64(),
                clicks: row[3].as_f64(),
                conversion: row[4].as_f64(),
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        self.table.to_csv()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.table.to_records())?)
    }
}
